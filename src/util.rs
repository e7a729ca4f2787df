//! The per-build state shared by the feed helpers, and the helpers that need
//! it.

use crate::ci;
use crate::config::Config;
use crate::feed::{Image, PageInfo};
use crate::git::{Error as GitError, GitCommand, Repository};
use crate::mime;
use crate::page::Page;
use crate::remote::{self, HttpTransport, Transport};
use crate::url::{build_local_path, build_url};
use chrono::Utc;
use log::{error, warn};
use std::path::Path;
use std::time::Duration;
use url::ParseError;

/// Where a page's [`FileDates`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateSource {
    History,
    BuildTime,
}

/// A page's creation and last-update times, as Unix timestamps. Both fields
/// are always set: either both come from history, or both are the build
/// time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileDates {
    pub created: i64,
    pub updated: i64,
    pub source: DateSource,
}

/// Returns the build timestamp: `SOURCE_DATE_EPOCH` when it is set to an
/// integer (reproducible builds), the current time otherwise.
pub fn build_timestamp() -> i64 {
    std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|epoch| epoch.trim().parse().ok())
        .unwrap_or_else(|| Utc::now().timestamp())
}

/// Returns the page description: the `description` meta field verbatim, or
/// else the first `chars_count` characters of the rendered content, or else
/// of the markdown, or else an empty string.
pub fn get_description_or_abstract(page: &Page, chars_count: usize) -> String {
    if let Some(description) = page.meta_str("description") {
        description.to_owned()
    } else if !page.content.is_empty() {
        page.content.chars().take(chars_count).collect()
    } else {
        page.markdown.chars().take(chars_count).collect()
    }
}

/// Returns the page image, from the `image` meta field or else the
/// `illustration` one, as an `(url, mime type)` pair. Paths that don't start
/// with `http` are site-relative and resolved against `base_url`.
pub fn get_image(
    page: &Page,
    base_url: &str,
) -> Result<Option<(String, Option<&'static str>)>, ParseError> {
    let image = match page
        .meta_str("image")
        .or_else(|| page.meta_str("illustration"))
    {
        Some(image) => image,
        None => return Ok(None),
    };

    let mime_type = mime::guess_type(image);
    let url = if image.starts_with("http") {
        image.to_owned()
    } else {
        build_url(base_url, image, &[])?
    };
    Ok(Some((url, mime_type)))
}

/// Owns the repository state and the build timestamp for a site build.
pub struct Util {
    repository: Repository,
    build_time: i64,
    transport: Box<dyn Transport>,
}

impl Util {
    /// Probes for a git repository at `path` (or above it), runs the CI
    /// checks, and snapshots the build time. A missing repository is not an
    /// error (every page falls back to the build time); only building the
    /// HTTP client can fail.
    pub fn new(path: &Path) -> Result<Util, remote::Error> {
        Self::with_timeouts(path, crate::git::DEFAULT_TIMEOUT, remote::DEFAULT_TIMEOUT)
    }

    /// Same as [`Util::new`] with explicit timeouts for `git` invocations
    /// and image probes.
    pub fn with_timeouts(
        path: &Path,
        git_timeout: Duration,
        http_timeout: Duration,
    ) -> Result<Util, remote::Error> {
        let repository = match Repository::probe(path) {
            Repository::Valid(git) => Repository::Valid(git.with_timeout(git_timeout)),
            Repository::Unavailable => Repository::Unavailable,
        };
        ci::raise_ci_warnings(repository.git());
        Ok(Util::from_parts(
            repository,
            build_timestamp(),
            Box::new(HttpTransport::new(http_timeout)?),
        ))
    }

    /// Same as [`Util::with_timeouts`], probing from the configured docs
    /// directory with the configured timeouts.
    pub fn from_config(config: &Config) -> Result<Util, remote::Error> {
        Self::with_timeouts(
            &config.docs_dir,
            config.rss.git_timeout(),
            config.rss.http_timeout(),
        )
    }

    /// Assembles a [`Util`] from already-built parts.
    pub fn from_parts(
        repository: Repository,
        build_time: i64,
        transport: Box<dyn Transport>,
    ) -> Util {
        Util {
            repository,
            build_time,
            transport,
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn build_time(&self) -> i64 {
        self.build_time
    }

    /// Returns the creation and last-update times of `path` from git
    /// history. Falls back to the build time for both when history can't
    /// provide them. A missing `git` executable disables history lookups
    /// for the rest of the build.
    pub fn get_file_dates(&mut self, path: &Path) -> FileDates {
        let mut dates = None;
        if let Repository::Valid(git) = &self.repository {
            match query_dates(git, path) {
                Ok(found) => dates = found,
                Err(GitError::NotFound(err)) => {
                    error!(
                        "Unable to perform command 'git log'. Is git installed? \
                         Falling back to build date. Trace: {}",
                        err
                    );
                    self.repository = Repository::Unavailable;
                }
                Err(err) => warn!(
                    "Unable to read git logs of '{}'. Is git log readable? \
                     Falling back to build date. Trace: {}",
                    path.display(),
                    err
                ),
            }
        }

        match dates {
            Some((created, updated)) => FileDates {
                created,
                updated,
                source: DateSource::History,
            },
            None => {
                warn!("Dates could not be retrieved for page: {}.", path.display());
                FileDates {
                    created: self.build_time,
                    updated: self.build_time,
                    source: DateSource::BuildTime,
                }
            }
        }
    }

    /// Returns the size in bytes of a remote image. See
    /// [`remote::get_remote_image_length`].
    pub fn get_remote_image_length(&self, image_url: &str) -> Option<u64> {
        remote::get_remote_image_length(self.transport.as_ref(), image_url)
    }

    /// Collects everything the feed needs about `page`.
    pub fn page_info(&mut self, page: &Page, config: &Config) -> PageInfo {
        let dates = self.get_file_dates(&page.src_path);
        let url_full = match &config.site_url {
            Some(site_url) => build_url(site_url, &page.url, &[]).unwrap_or_else(|err| {
                warn!("Invalid site_url {:?}: {}", site_url, err);
                page.url.clone()
            }),
            None => page.url.clone(),
        };

        PageInfo {
            title: page.title.clone(),
            url_full,
            created: dates.created,
            updated: dates.updated,
            description: get_description_or_abstract(page, config.rss.abstract_chars_count),
            image: self.page_image(page, config),
        }
    }

    fn page_image(&self, page: &Page, config: &Config) -> Option<Image> {
        let raw = page
            .meta_str("image")
            .or_else(|| page.meta_str("illustration"))?;
        let base_url = config.site_url.as_deref().unwrap_or_default();
        let (url, mime_type) = match get_image(page, base_url) {
            Ok(found) => found?,
            Err(err) => {
                warn!("Could not resolve image {:?} of page {}: {}", raw, page.url, err);
                return None;
            }
        };

        let length = if raw.starts_with("http") {
            self.get_remote_image_length(&url)
        } else {
            local_image_length(page, config, raw)
        };
        Some(Image {
            url,
            mime_type: mime_type.map(str::to_owned),
            length,
        })
    }
}

// Paths that exist are made absolute so they resolve the same way whatever
// the working tree is; others are left for git to resolve from the tree root.
fn query_dates(git: &GitCommand, path: &Path) -> Result<Option<(i64, i64)>, GitError> {
    let path = path.canonicalize().unwrap_or_else(|_| path.to_owned());
    let created = git.log_one(&path, "%at", Some("AR"))?;
    let updated = git.log_one(&path, "%at", None)?;
    Ok(match (created.parse(), updated.parse()) {
        (Ok(created), Ok(updated)) => Some((created, updated)),
        _ => None,
    })
}

// Site-absolute paths live under the docs directory; anything else is
// relative to the page's source file.
fn local_image_length(page: &Page, config: &Config, image: &str) -> Option<u64> {
    let path = match image.strip_prefix('/') {
        Some(site_path) => config.docs_dir.join(site_path),
        None => build_local_path(&page.src_path, Path::new(image)),
    };
    match std::fs::metadata(&path) {
        Ok(metadata) => Some(metadata.len()),
        Err(err) => {
            warn!("Could not read local image {}: {}", path.display(), err);
            None
        }
    }
}
