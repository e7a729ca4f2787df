//! Site configuration as read from the project's `mkdocs.yml`. Only the keys
//! the feed helpers care about are modeled; everything else is ignored.

use crate::feed::DateAttribute;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

const PROJECT_FILE: &str = "mkdocs.yml";

/// The project configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// The canonical site URL. Page links and site-relative image paths are
    /// resolved against it.
    #[serde(default)]
    pub site_url: Option<String>,

    /// The docs directory. Relative paths are resolved against the
    /// directory holding the project file.
    #[serde(default = "default_docs_dir")]
    pub docs_dir: PathBuf,

    /// An explicit locale, e.g., `fr` or `en-US`.
    #[serde(default)]
    pub locale: Option<String>,

    #[serde(default)]
    pub theme: Option<Theme>,

    /// Feed-specific options.
    #[serde(default)]
    pub rss: FeedOptions,
}

/// The theme section. Apart from its name, a theme's settings are free-form
/// variables. A bare string (`theme: readthedocs`) is accepted as the name.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(from = "RawTheme")]
pub struct Theme {
    pub name: Option<String>,
    pub vars: BTreeMap<String, Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTheme {
    Name(String),
    Table {
        #[serde(default)]
        name: Option<String>,

        #[serde(flatten)]
        vars: BTreeMap<String, Value>,
    },
}

impl From<RawTheme> for Theme {
    fn from(raw: RawTheme) -> Theme {
        match raw {
            RawTheme::Name(name) => Theme {
                name: Some(name),
                vars: BTreeMap::new(),
            },
            RawTheme::Table { name, vars } => Theme { name, vars },
        }
    }
}

impl Theme {
    fn var(&self, key: &str) -> Option<&str> {
        match self.vars.get(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FeedOptions {
    /// The length of the abstract cut from a page's content when it has no
    /// `description`.
    pub abstract_chars_count: usize,

    /// The maximum number of entries in a feed.
    pub length: usize,

    /// The page timestamp feeds are sorted by.
    pub date_attribute: DateAttribute,

    pub git_timeout_secs: u64,
    pub http_timeout_secs: u64,
}

impl Default for FeedOptions {
    fn default() -> Self {
        FeedOptions {
            abstract_chars_count: 150,
            length: 20,
            date_attribute: DateAttribute::Updated,
            git_timeout_secs: 30,
            http_timeout_secs: 10,
        }
    }
}

impl FeedOptions {
    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn default_docs_dir() -> PathBuf {
    PathBuf::from("docs")
}

impl Config {
    /// Searches `dir` and its ancestors for `mkdocs.yml` and loads the first
    /// one found.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path)
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent),
                None => Err(Error::ProjectFileNotFound),
            }
        }
    }

    /// Loads the configuration from `path`, resolving `docs_dir` against the
    /// directory containing the file.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let file = File::open(path).map_err(|err| Error::OpenProjectFile {
            path: path.to_owned(),
            err,
        })?;
        let mut config: Config = serde_yaml::from_reader(file)?;
        if let Some(project_root) = path.parent() {
            config.docs_dir = project_root.join(&config.docs_dir);
        }
        Ok(config)
    }

    /// Guesses the site language: the top-level `locale` wins, then the
    /// theme's `locale` variable, then the theme's `language` variable. A
    /// theme that sets `locale` at all decides, even when the value isn't a
    /// usable string.
    pub fn guess_locale(&self) -> Option<&str> {
        if let Some(locale) = self.locale.as_deref().filter(|l| !l.is_empty()) {
            return Some(locale);
        }
        let theme = self.theme.as_ref()?;
        if theme.vars.contains_key("locale") {
            theme.var("locale")
        } else {
            theme.var("language")
        }
    }
}

/// Represents the result of loading a [`Config`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading the project configuration.
#[derive(Debug)]
pub enum Error {
    /// Returned when no `mkdocs.yml` exists in the directory or any of its
    /// ancestors.
    ProjectFileNotFound,

    /// Returned when the project file exists but can't be opened.
    OpenProjectFile { path: PathBuf, err: std::io::Error },

    /// Returned when the project file isn't valid YAML for [`Config`].
    DeserializeYaml(serde_yaml::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ProjectFileNotFound => write!(
                f,
                "Could not find `{}` in any parent directory",
                PROJECT_FILE
            ),
            Error::OpenProjectFile { path, err } => {
                write!(f, "Opening project file '{}': {}", path.display(), err)
            }
            Error::DeserializeYaml(err) => {
                write!(f, "Loading configuration: {}", err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ProjectFileNotFound => None,
            Error::OpenProjectFile { path: _, err } => Some(err),
            Error::DeserializeYaml(err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts [`serde_yaml::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}
