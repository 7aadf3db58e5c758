use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Error;
use crate::types::Document;

/// Collect all markdown files under the configured docs directory.
/// Applies the config's include/exclude filters to control which files are
/// processed. Each document's output path mirrors its path relative to the
/// docs directory under the output directory. Documents come back sorted by
/// path so every build processes them in the same order.
///
/// # Errors
///
/// Returns `Error::Io` if any markdown file cannot be read.
pub fn scan(root: &Path, config: &Config) -> Result<Vec<Document>, Error> {
    let docs_dir = root.join(&config.docs);
    let output_dir = root.join(&config.output);
    let mut documents = Vec::new();

    for entry in WalkDir::new(&docs_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "md"))
    {
        let md_path = entry.path();
        let relative = md_path.strip_prefix(&docs_dir).unwrap_or(md_path).to_path_buf();

        let relative_str = relative_slash_path(&relative);
        if !config.should_scan(&relative_str) {
            continue;
        }

        let content = std::fs::read_to_string(md_path)?;
        documents.push(Document {
            content,
            output_path: output_dir.join(&relative),
            path: md_path.to_path_buf(),
        });
    }

    Ok(documents)
}

/// Relative path with `/` separators, for prefix matching on any platform.
fn relative_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Write each document's content to its output path, creating directories.
///
/// # Errors
///
/// Returns `Error::Io` if a directory or file cannot be written.
pub fn write_outputs(documents: &[Document]) -> Result<Vec<PathBuf>, Error> {
    let mut written = Vec::with_capacity(documents.len());
    for document in documents {
        if let Some(parent) = document.output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&document.output_path, &document.content)?;
        written.push(document.output_path.clone());
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_markdown_and_maps_output_paths() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir_all(docs.join("api")).unwrap();
        std::fs::write(docs.join("index.md"), "# Home").unwrap();
        std::fs::write(docs.join("api/widget.md"), "# Widget").unwrap();
        std::fs::write(docs.join("notes.txt"), "skip").unwrap();

        let documents = scan(dir.path(), &Config::default()).unwrap();
        let outputs: Vec<PathBuf> = documents.iter().map(|d| d.output_path.clone()).collect();
        assert_eq!(
            outputs,
            [dir.path().join("site/api/widget.md"), dir.path().join("site/index.md")]
        );
        assert_eq!(documents[1].content, "# Home");
    }

    #[test]
    fn honors_exclude_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir_all(docs.join("drafts")).unwrap();
        std::fs::write(docs.join("drafts/wip.md"), "x").unwrap();
        std::fs::write(docs.join("keep.md"), "y").unwrap();

        let config = Config::parse("exclude = [\"drafts/\"]").unwrap();
        let documents = scan(dir.path(), &config).unwrap();
        assert_eq!(documents.len(), 1);
        assert!(documents[0].path.ends_with("keep.md"));
    }

    #[test]
    fn writes_outputs_with_parents() {
        let dir = tempfile::tempdir().unwrap();
        let document = Document {
            content: "rewritten".to_string(),
            output_path: dir.path().join("site/a/b.md"),
            path: dir.path().join("docs/a/b.md"),
        };
        write_outputs(std::slice::from_ref(&document)).unwrap();
        assert_eq!(std::fs::read_to_string(&document.output_path).unwrap(), "rewritten");
    }
}
