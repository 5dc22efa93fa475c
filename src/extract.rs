//! Source extractor: pulls documentation out of a source file and turns it
//! into the lightweight markup consumed by both translators.
//!
//! Brace languages contribute `/** ... */` blocks, Python contributes
//! docstrings. When nothing is found the file is summarised instead, with
//! the full source in a fenced block.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info};

static DOC_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*\*.*?\*/").expect("doc comment pattern"));
static DOC_COMMENT_DELIMITERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\*\*|\*/").expect("doc delimiter pattern"));
static CONTINUATION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*\*[ \t]?").expect("continuation pattern"));
static DOCSTRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)""".*?"""|'''.*?'''"#).expect("docstring pattern"));
static DOCSTRING_DELIMITERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""""|'''"#).expect("docstring delimiter pattern"));

const BRACE_LANGUAGES: &[&str] = &["javascript", "typescript", "java", "c", "cpp"];
const SCRIPT_LANGUAGE: &str = "python";

/// Extensions picked up when syncing a whole project.
const PROJECT_EXTENSIONS: &[&str] = &["ts", "js", "py", "java", "cpp", "c", "h"];
const SKIPPED_DIRS: &[&str] = &["node_modules", ".git", "target"];

/// A source file reduced to a syncable document. Built fresh for every sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// File name, used as the remote page title.
    pub title: String,
    /// Lightweight markup, or the summary when no documentation was found.
    pub content: String,
    pub file_path: PathBuf,
    pub language: String,
    pub tags: Vec<String>,
}

/// Extracts documentation markup and tags from `content`.
///
/// `file_name` only feeds the summary heading used when extraction finds
/// nothing (or the language has no extractor).
pub fn extract(file_name: &str, content: &str, language: &str) -> (String, Vec<String>) {
    let documentation = extract_documentation(content, language);

    let markup = if !documentation.is_empty() && documentation != content {
        documentation
    } else {
        debug!(file_name, language, "No documentation extracted, summarising file");
        format!("## {file_name}\n\nLanguage: {language}\n\n```{language}\n{content}\n```")
    };

    (markup, extract_tags(content, language))
}

/// Builds a [`SourceDocument`] for the file at `path`.
pub fn parse_document(path: &Path, content: &str, language: &str) -> SourceDocument {
    let title = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let (content, tags) = extract(&title, content, language);
    info!(
        title = %title,
        language,
        tags = ?tags,
        "Parsed source document"
    );
    SourceDocument {
        title,
        content,
        file_path: path.to_path_buf(),
        language: language.to_string(),
        tags,
    }
}

/// Language-dispatched documentation. Unknown languages pass through unchanged.
pub fn extract_documentation(content: &str, language: &str) -> String {
    if BRACE_LANGUAGES.contains(&language) {
        let spans: Vec<String> = DOC_COMMENT
            .find_iter(content)
            .map(|m| {
                let stripped = DOC_COMMENT_DELIMITERS.replace_all(m.as_str(), "");
                CONTINUATION_MARKER
                    .replace_all(&stripped, "")
                    .trim()
                    .to_string()
            })
            .collect();
        with_full_code(spans, content, "")
    } else if language == SCRIPT_LANGUAGE {
        let spans: Vec<String> = DOCSTRING
            .find_iter(content)
            .map(|m| {
                DOCSTRING_DELIMITERS
                    .replace_all(m.as_str(), "")
                    .trim()
                    .to_string()
            })
            .collect();
        with_full_code(spans, content, SCRIPT_LANGUAGE)
    } else {
        content.to_string()
    }
}

fn with_full_code(spans: Vec<String>, content: &str, fence_language: &str) -> String {
    if spans.is_empty() {
        return content.to_string();
    }
    debug!(spans = spans.len(), "Extracted documentation spans");
    format!(
        "{}\n\n---\n## Full Code\n```{fence_language}\n{content}\n```",
        spans.join("\n\n")
    )
}

/// Coarse, case-sensitive substring tagging. Not a parser.
pub fn extract_tags(content: &str, language: &str) -> Vec<String> {
    let mut tags = vec![language.to_string()];
    let mut tag = |name: &str, present: bool| {
        if present && !tags.iter().any(|t| t == name) {
            tags.push(name.to_string());
        }
    };
    tag("class", content.contains("class "));
    tag(
        "function",
        content.contains("function ") || content.contains("def "),
    );
    tag("interface", content.contains("interface "));
    tag(
        "needs-review",
        content.contains("TODO") || content.contains("FIXME"),
    );
    tags
}

/// Maps a file extension to the language identifier used for extraction.
pub fn language_for_path(path: &Path) -> &'static str {
    match lowercase_extension(path).as_deref() {
        Some("ts") | Some("tsx") => "typescript",
        Some("js") | Some("jsx") | Some("mjs") => "javascript",
        Some("py") => "python",
        Some("java") => "java",
        Some("c") | Some("h") => "c",
        Some("cpp") | Some("cc") | Some("cxx") | Some("hpp") => "cpp",
        Some("rs") => "rust",
        Some("go") => "go",
        Some("md") => "markdown",
        _ => "plaintext",
    }
}

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Recursively collects project source files under `root`, sorted by path.
pub fn collect_workspace_files(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    fn visit_dir(dir: &Path, results: &mut Vec<PathBuf>) -> std::io::Result<()> {
        for entry_res in std::fs::read_dir(dir)? {
            let path = entry_res?.path();
            if path.is_dir() {
                let dir_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                if SKIPPED_DIRS.contains(&dir_name) {
                    debug!(path = %path.display(), "Skipping directory");
                    continue;
                }
                visit_dir(&path, results)?;
            } else if path.is_file() {
                let wanted = lowercase_extension(&path)
                    .is_some_and(|e| PROJECT_EXTENSIONS.contains(&e.as_str()));
                if wanted {
                    results.push(path);
                }
            }
        }
        Ok(())
    }

    let mut files = Vec::new();
    visit_dir(root, &mut files)?;
    files.sort();
    info!(root = %root.display(), count = files.len(), "Collected project files");
    Ok(files)
}
