//! Scanning Markdown text for backtick spans and tags, and splicing in replacements.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;
use crate::resolver::LINK_TAG;

/// `` `ident(.ident)*` ``. Word boundaries are checked separately because the
/// regex crate has no look-around.
static BACKTICK: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"`([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)`")
        .expect("backtick pattern is valid");
});

/// Opening line of a fenced code block.
static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"^[ ]{0,3}(`{3,}|~{3,})").expect("fence pattern is valid");
});

/// A region of text to replace. Spans of one scan never overlap and are
/// ordered left to right.
pub trait Span {
    /// Byte range of the whole match in the scanned text.
    fn range(&self) -> Range<usize>;
}

/// A backtick-quoted dotted name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacktickSpan {
    /// The dotted name between the ticks.
    pub name: String,
    /// Byte range including both ticks.
    pub range: Range<usize>,
}

impl Span for BacktickSpan {
    fn range(&self) -> Range<usize> {
        return self.range.clone();
    }
}

/// An inline `{@tag args}` or block `@tag args` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Argument text, trimmed.
    pub args: String,
    /// Tag name without the `@`.
    pub name: String,
    /// `key: value` option lines directly below a block tag.
    pub options: BTreeMap<String, String>,
    /// Byte range of the tag. For block tags this ends before the final newline.
    pub range: Range<usize>,
}

impl Span for Tag {
    fn range(&self) -> Range<usize> {
        return self.range.clone();
    }
}

/// Byte ranges covered by fenced code blocks, fences included. An unclosed
/// fence runs to the end of the text.
pub fn fenced_regions(text: &str) -> Vec<Range<usize>> {
    let mut regions = Vec::new();
    let mut open: Option<(usize, String)> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let line_end = offset + line.len();
        match &open {
            None => {
                if let Some(caps) = FENCE.captures(line) {
                    open = Some((offset, caps[1].to_string()));
                }
            },
            Some((start, fence)) => {
                let trimmed = line.trim();
                let closes = trimmed.starts_with(fence.as_str())
                    && trimmed.chars().all(|c| return c == fence.chars().next().unwrap_or('`'));
                if closes {
                    regions.push(*start..line_end);
                    open = None;
                }
            },
        }
        offset = line_end;
    }

    if let Some((start, _)) = open {
        regions.push(start..text.len());
    }
    regions
}

/// Whether `pos` falls inside any of `regions`.
fn in_regions(regions: &[Range<usize>], pos: usize) -> bool {
    return regions.iter().any(|r| return r.contains(&pos));
}

/// Whether `c` counts as a word character for span boundaries.
fn is_word_char(c: char) -> bool {
    return c.is_alphanumeric() || c == '_';
}

/// Find backtick spans that stand alone: no word character touches either
/// tick, not inside fenced code, and not already the label of a Markdown link.
pub fn find_backtick_spans(text: &str) -> Vec<BacktickSpan> {
    let fenced = fenced_regions(text);
    let mut spans = Vec::new();

    for caps in BACKTICK.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let before = text[..whole.start()].chars().next_back();
        let after = text[whole.end()..].chars().next();

        if before.is_some_and(is_word_char) || after.is_some_and(is_word_char) {
            continue;
        }
        if before == Some('[') && text[whole.end()..].starts_with("](") {
            continue;
        }
        if in_regions(&fenced, whole.start()) {
            continue;
        }

        spans.push(BacktickSpan {
            name: name.as_str().to_string(),
            range: whole.range(),
        });
    }
    spans
}

/// Build the pattern for inline tags named `name`, validating the name.
///
/// # Errors
///
/// Returns `Error::InvalidPattern` if `name` is not an identifier, or is the
/// tag of resolved links, which a second pass would otherwise rewrite.
pub fn inline_tag_pattern(name: &str) -> Result<Regex, Error> {
    validate_tag_name(name)?;
    if name == LINK_TAG {
        return Err(Error::InvalidPattern {
            pattern: name.to_string(),
            reason: format!("`{LINK_TAG}` is reserved for resolved links"),
        });
    }
    let source = format!(r"\{{@{}(?:[ \t]+([^}}\n]*))?\}}", regex::escape(name));
    return compile(&source);
}

/// Build the pattern for block tags named `name`, validating the name.
///
/// # Errors
///
/// Returns `Error::InvalidPattern` if `name` is not an identifier.
pub fn block_tag_pattern(name: &str) -> Result<Regex, Error> {
    validate_tag_name(name)?;
    let source = format!(r"(?m)^[ \t]*@{}(?:[ \t]+([^\n]*?))?[ \t]*\r?$", regex::escape(name));
    return compile(&source);
}

/// Compile a regex, mapping failure to `Error::InvalidPattern`.
///
/// # Errors
///
/// Returns `Error::InvalidPattern` when the regex does not compile.
fn compile(source: &str) -> Result<Regex, Error> {
    return Regex::new(source).map_err(|e| {
        return Error::InvalidPattern {
            pattern: source.to_string(),
            reason: e.to_string(),
        };
    });
}

/// Tag names must be identifiers so they can appear after `@` unescaped.
///
/// # Errors
///
/// Returns `Error::InvalidPattern` naming the rejected tag.
fn validate_tag_name(name: &str) -> Result<(), Error> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| return c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| return c.is_ascii_alphanumeric() || c == '_');
    if valid {
        return Ok(());
    }
    return Err(Error::InvalidPattern {
        pattern: name.to_string(),
        reason: "tag name must be an identifier".to_string(),
    });
}

/// Find inline tags matching `pattern` (from [`inline_tag_pattern`]) outside fenced code.
pub fn find_inline_tags(text: &str, name: &str, pattern: &Regex) -> Vec<Tag> {
    let fenced = fenced_regions(text);
    return pattern
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if in_regions(&fenced, whole.start()) {
                return None;
            }
            return Some(Tag {
                args: caps.get(1).map_or("", |m| return m.as_str()).trim().to_string(),
                name: name.to_string(),
                options: BTreeMap::new(),
                range: whole.range(),
            });
        })
        .collect();
}

/// Find block tags matching `pattern` (from [`block_tag_pattern`]) outside
/// fenced code. Indented `key: value` lines right below a tag become its
/// options and extend its range, but only for keys listed in `option_keys`.
/// Any other line, indented or not, is left as text.
pub fn find_block_tags(text: &str, name: &str, pattern: &Regex, option_keys: &[&str]) -> Vec<Tag> {
    let fenced = fenced_regions(text);
    let mut tags = Vec::new();

    for caps in pattern.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if in_regions(&fenced, whole.start()) {
            continue;
        }

        let (options, end) = read_block_options(text, whole.end(), option_keys);
        tags.push(Tag {
            args: caps.get(1).map_or("", |m| return m.as_str()).trim().to_string(),
            name: name.to_string(),
            options,
            range: whole.start()..end,
        });
    }
    tags
}

/// Consume indented `key: value` lines with a key from `keys` following a block
/// tag ending at `tag_end`. Returns the options and the byte offset where the
/// tag now ends.
fn read_block_options(text: &str, tag_end: usize, keys: &[&str]) -> (BTreeMap<String, String>, usize) {
    let mut options = BTreeMap::new();
    let mut end = tag_end;

    while text[end..].starts_with('\n') || text[end..].starts_with("\r\n") {
        let line_start = end + if text[end..].starts_with('\n') { 1 } else { 2 };
        let rest = &text[line_start..];
        let line = rest.split('\n').next().unwrap_or("");
        let line_end = line_start + line.len();

        let indented = line.starts_with(' ') || line.starts_with('\t');
        let Some((key, value)) = line.trim().split_once(':') else {
            break;
        };
        let key = key.trim();
        if !indented || !keys.contains(&key) {
            break;
        }

        options.insert(key.to_string(), value.trim().to_string());
        end = line_end;
    }
    (options, end)
}

/// Replace each span with what `replace` returns for it, leaving the span's
/// original text when it returns `None`. Spans must be ordered and disjoint;
/// one that starts before the previous one ended is skipped.
pub fn splice<S: Span>(text: &str, spans: &[S], mut replace: impl FnMut(&S) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    for span in spans {
        let range = span.range();
        if range.start < cursor || range.end > text.len() {
            continue;
        }
        out.push_str(&text[cursor..range.start]);
        match replace(span) {
            Some(replacement) => out.push_str(&replacement),
            None => out.push_str(&text[range.clone()]),
        }
        cursor = range.end;
    }

    out.push_str(&text[cursor..]);
    out
}
