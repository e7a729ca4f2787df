//! Exports the [`build_feed`] function which stitches together the
//! high-level steps of preparing a feed: loading the pages
//! ([`crate::page`]), collecting per-page dates, abstracts and images
//! ([`crate::util::Util`]), and ordering the result ([`crate::feed`]).

use crate::config::Config;
use crate::feed::{filter_pages, FeedEntry, PageInfo};
use crate::page::{parse_pages, Error as PageError};
use crate::remote::Error as RemoteError;
use crate::util::Util;
use log::debug;
use std::fmt;

/// Builds the feed entries for the site described by `config`: every page
/// under `docs_dir`, newest first by the configured date attribute, limited
/// to the configured length.
pub fn build_feed(config: &Config) -> Result<Vec<FeedEntry>> {
    let mut util = Util::from_config(config)?;
    feed_entries(&mut util, config)
}

/// Same as [`build_feed`] with a caller-provided [`Util`].
pub fn feed_entries(util: &mut Util, config: &Config) -> Result<Vec<FeedEntry>> {
    let pages = parse_pages(&config.docs_dir)?;
    debug!("Loaded {} pages from {}", pages.len(), config.docs_dir.display());

    let infos: Vec<PageInfo> = pages
        .iter()
        .map(|page| util.page_info(page, config))
        .collect();
    Ok(filter_pages(
        &infos,
        config.rss.date_attribute,
        config.rss.length,
    ))
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a feed. Errors can be during page loading or
/// while setting up the HTTP client.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors loading pages.
    Page(PageError),

    /// Returned when the HTTP client for image probes can't be built.
    Remote(RemoteError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Page(err) => err.fmt(f),
            Error::Remote(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Page(err) => Some(err),
            Error::Remote(err) => Some(err),
        }
    }
}

impl From<PageError> for Error {
    /// Converts [`PageError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: PageError) -> Error {
        Error::Page(err)
    }
}

impl From<RemoteError> for Error {
    /// Converts [`RemoteError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: RemoteError) -> Error {
        Error::Remote(err)
    }
}
