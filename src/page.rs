//! Defines the [`Page`] type, the read-only view of a site page that the
//! feed helpers work from, along with the logic for loading pages from a
//! docs directory.
//!
//! A page source file is markdown with an optional YAML frontmatter block:
//!
//! ```md
//! ---
//! title: Hello, world!
//! description: A short greeting.
//! image: /img/hello.png
//! ---
//! # Hello
//!
//! World
//! ```

use crate::markdown;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Page metadata, i.e., the parsed frontmatter.
pub type Meta = BTreeMap<String, Value>;

const MARKDOWN_EXTENSION: &str = "md";

/// A page as produced by a site build.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// The page title: the `title` meta field, or the source file stem.
    pub title: String,

    /// The site-relative URL of the page (e.g., `blog/hello/`). Directory
    /// style URLs are used, so `blog/index.md` maps to `blog/`.
    pub url: String,

    /// The path to the page's source file. History lookups are made against
    /// this path.
    pub src_path: PathBuf,

    /// The raw markdown body (frontmatter excluded).
    pub markdown: String,

    /// The rendered HTML body.
    pub content: String,

    /// The frontmatter fields.
    pub meta: Meta,
}

impl Page {
    /// Returns the string value for the meta field `key`. Missing, empty and
    /// non-string values are all treated as absent.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        match self.meta.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// Parses the page at `docs_dir/relative_path`.
    pub fn parse(docs_dir: &Path, relative_path: &Path) -> Result<Page> {
        Self::_parse(docs_dir, relative_path).map_err(|e| {
            Error::Annotated(
                format!("parsing page `{}`", relative_path.display()),
                Box::new(e),
            )
        })
    }

    fn _parse(docs_dir: &Path, relative_path: &Path) -> Result<Page> {
        use std::io::Read;
        let src_path = docs_dir.join(relative_path);
        let mut contents = String::new();
        File::open(&src_path)?.read_to_string(&mut contents)?;
        Self::from_source(src_path, relative_path, &contents)
    }

    /// Builds a page from its source text. `relative_path` is the path of
    /// the source file relative to the docs directory and determines the
    /// page URL.
    pub fn from_source(
        src_path: PathBuf,
        relative_path: &Path,
        input: &str,
    ) -> Result<Page> {
        let (meta, body) = split_frontmatter(input)?;
        let title = match meta.get("title") {
            Some(Value::String(title)) => title.clone(),
            _ => relative_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };

        Ok(Page {
            title,
            url: page_url(relative_path),
            src_path,
            content: markdown::to_html(body),
            markdown: body.to_owned(),
            meta,
        })
    }
}

/// Walks `docs_dir` and parses every markdown file into a [`Page`]. Pages
/// are returned in path order.
pub fn parse_pages(docs_dir: &Path) -> Result<Vec<Page>> {
    let mut pages = Vec::new();
    for result in WalkDir::new(docs_dir).sort_by(|a, b| a.file_name().cmp(b.file_name())) {
        let entry = result?;
        let is_markdown = entry.path().extension().map_or(false, |ext| ext == MARKDOWN_EXTENSION);
        if entry.file_type().is_file() && is_markdown {
            // strip_prefix() should never fail; walkdir yields paths under
            // `docs_dir`
            let relative = entry
                .path()
                .strip_prefix(docs_dir)
                .map_err(|_| Error::OutsideDocsDir(entry.path().to_owned()))?;
            pages.push(Page::parse(docs_dir, relative)?);
        }
    }
    Ok(pages)
}

// Splits the optional frontmatter from the body. Input without an opening
// fence is all body.
fn split_frontmatter(input: &str) -> Result<(Meta, &str)> {
    const FENCE: &str = "---";
    if !input.starts_with(FENCE) {
        return Ok((Meta::new(), input));
    }

    let yaml_start = FENCE.len();
    let yaml_stop = match input[yaml_start..].find("\n---") {
        None => return Err(Error::FrontmatterMissingEndFence),
        Some(offset) => yaml_start + offset + 1,
    };
    let body_start = match input[yaml_stop..].find('\n') {
        Some(offset) => yaml_stop + offset + 1,
        None => input.len(),
    };

    let yaml = &input[yaml_start..yaml_stop];
    let meta = if yaml.trim().is_empty() {
        Meta::new()
    } else {
        serde_yaml::from_str(yaml)?
    };
    Ok((meta, &input[body_start..]))
}

fn page_url(relative_path: &Path) -> String {
    let without_ext = relative_path.with_extension("");
    let mut parts: Vec<String> = without_ext
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.last().map_or(false, |last| last == "index" || last == "README") {
        parts.pop();
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!("{}/", parts.join("/"))
    }
}

/// Represents the result of a [`Page`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading a [`Page`].
#[derive(Debug)]
pub enum Error {
    /// Returned when a frontmatter block is opened (`---`) but never
    /// closed.
    FrontmatterMissingEndFence,

    /// Returned when there was an error parsing the frontmatter as YAML.
    DeserializeYaml(serde_yaml::Error),

    /// Returned for other I/O errors.
    Io(std::io::Error),

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),

    /// Returned when a walked file isn't under the docs directory.
    OutsideDocsDir(PathBuf),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontmatterMissingEndFence => {
                write!(f, "Missing closing `---`")
            }
            Error::DeserializeYaml(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
            Error::WalkDir(err) => err.fmt(f),
            Error::OutsideDocsDir(path) => {
                write!(f, "{:?} is outside of the docs directory", path)
            }
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", &annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FrontmatterMissingEndFence => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::OutsideDocsDir(_) => None,
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`].
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
