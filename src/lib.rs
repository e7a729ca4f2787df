//! The library code for `sitefeed`, which prepares the data a static site's
//! RSS feed is built from. The work breaks down into three steps:
//!
//! 1. Loading the site configuration and pages ([`crate::config`],
//!    [`crate::page`])
//! 2. Collecting what the feed needs about each page ([`crate::util`])
//! 3. Ordering and trimming the pages into feed entries ([`crate::feed`])
//!
//! The second step is the interesting one. Page dates come from git history
//! ([`crate::git`]); when history is missing (no repository, no `git`
//! executable, a shallow CI checkout) every page falls back to the build
//! time instead of failing the build. Image sizes for enclosures come from
//! the filesystem for local images and from a bounded `HEAD`-then-`GET`
//! probe for remote ones ([`crate::remote`]). Every degraded path is logged
//! through the `log` facade; [`crate::logger`] provides a backend.
//!
//! [`crate::build::build_feed`] runs all three steps. Serializing the
//! resulting [`crate::feed::FeedEntry`] list into RSS or Atom is left to the
//! caller.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod ci;
pub mod config;
pub mod feed;
pub mod git;
pub mod logger;
pub mod markdown;
pub mod mime;
pub mod page;
pub mod remote;
pub mod url;
pub mod util;
