//! URL and path composition for feed links and image locations.

use std::path::{Path, PathBuf};
use url::{ParseError, Url};

/// Builds a URL from `base_url` by appending `path` to the base's existing
/// path and, when `args` is non-empty, replacing the query string with the
/// form-encoded `args`.
///
/// `path` is appended verbatim; callers are responsible for the slashes
/// between the two. A `?query` or `#fragment` carried by `path` replaces the
/// base's. Any existing query string is overwritten by `args`, never merged.
/// An empty `args` leaves the query untouched.
///
/// ```
/// use sitefeed::url::build_url;
///
/// assert_eq!(
///     build_url("https://x.io/site", "/page/", &[("a", "1")]).unwrap(),
///     "https://x.io/site/page/?a=1",
/// );
/// ```
pub fn build_url(
    base_url: &str,
    path: &str,
    args: &[(&str, &str)],
) -> Result<String, ParseError> {
    let mut url = Url::parse(base_url)?;

    // `Url` reports `/` for a base without any path (`https://x.io`), but the
    // suffix has to land directly after the authority in that case.
    let existing = if url.path() == "/" && has_empty_path(base_url) {
        ""
    } else {
        url.path()
    };
    let (path, query, fragment) = split_suffix(path);
    let joined = format!("{}{}", existing, path);
    url.set_path(&joined);
    if query.is_some() {
        url.set_query(query);
    }
    if fragment.is_some() {
        url.set_fragment(fragment);
    }

    if !args.is_empty() {
        url.set_query(None);
        url.query_pairs_mut().extend_pairs(args);
    }
    Ok(url.into())
}

/// Resolves `path_to_append` relative to the directory containing
/// `page_path`.
pub fn build_local_path(page_path: &Path, path_to_append: &Path) -> PathBuf {
    page_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(path_to_append)
}

// Splits a raw suffix into its path, query and fragment parts.
fn split_suffix(suffix: &str) -> (&str, Option<&str>, Option<&str>) {
    let (rest, fragment) = match suffix.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (suffix, None),
    };
    match rest.split_once('?') {
        Some((path, query)) => (path, Some(query), fragment),
        None => (rest, None, fragment),
    }
}

// True when the raw URL has nothing between its authority and its query or
// fragment.
fn has_empty_path(raw: &str) -> bool {
    let after_scheme = match raw.split_once("://") {
        Some((_, rest)) => rest,
        None => return false,
    };
    let before_query = after_scheme
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or("");
    !before_query.contains('/')
}

#[cfg(test)]
mod test {
    use super::*;

    struct TestCase {
        base_url: &'static str,
        path: &'static str,
        args: &'static [(&'static str, &'static str)],
        wanted: &'static str,
    }

    fn build_url_test(test_case: &TestCase) -> Result<(), ParseError> {
        let result =
            build_url(test_case.base_url, test_case.path, test_case.args)?;
        assert_eq!(
            test_case.wanted, result,
            "wanted \"{}\"; found \"{}\"",
            test_case.wanted, result
        );
        Ok(())
    }

    #[test]
    fn test_build_url_appends_path_and_args() -> Result<(), ParseError> {
        build_url_test(&TestCase {
            base_url: "https://x.io/site",
            path: "/page/",
            args: &[("a", "1")],
            wanted: "https://x.io/site/page/?a=1",
        })
    }

    #[test]
    fn test_build_url_replaces_query() -> Result<(), ParseError> {
        build_url_test(&TestCase {
            base_url: "https://x.io/site?a=1",
            path: "/page/",
            args: &[("b", "2")],
            wanted: "https://x.io/site/page/?b=2",
        })
    }

    #[test]
    fn test_build_url_repeated_args_do_not_merge() -> Result<(), ParseError> {
        let first = build_url("https://x.io/site", "/page/", &[("a", "1")])?;
        let second = build_url("https://x.io/site", "/page/", &[("b", "2")])?;
        assert_eq!("https://x.io/site/page/?a=1", first);
        assert_eq!("https://x.io/site/page/?b=2", second);
        Ok(())
    }

    #[test]
    fn test_build_url_keeps_query_without_args() -> Result<(), ParseError> {
        build_url_test(&TestCase {
            base_url: "https://x.io/site?keep=1",
            path: "/page/",
            args: &[],
            wanted: "https://x.io/site/page/?keep=1",
        })
    }

    #[test]
    fn test_build_url_bare_host() -> Result<(), ParseError> {
        build_url_test(&TestCase {
            base_url: "https://x.io",
            path: "/img/a.png",
            args: &[],
            wanted: "https://x.io/img/a.png",
        })
    }

    #[test]
    fn test_build_url_suffix_with_query() -> Result<(), ParseError> {
        build_url_test(&TestCase {
            base_url: "https://x.io",
            path: "/img/a.png?v=2",
            args: &[],
            wanted: "https://x.io/img/a.png?v=2",
        })
    }

    #[test]
    fn test_build_url_suffix_with_fragment() -> Result<(), ParseError> {
        build_url_test(&TestCase {
            base_url: "https://x.io/site",
            path: "/page/#top",
            args: &[],
            wanted: "https://x.io/site/page/#top",
        })
    }

    #[test]
    fn test_build_url_args_replace_suffix_query() -> Result<(), ParseError> {
        build_url_test(&TestCase {
            base_url: "https://x.io/site",
            path: "/page/?v=2#top",
            args: &[("a", "1")],
            wanted: "https://x.io/site/page/?a=1#top",
        })
    }

    #[test]
    fn test_build_url_trailing_slash_is_not_normalized(
    ) -> Result<(), ParseError> {
        build_url_test(&TestCase {
            base_url: "https://x.io/site/",
            path: "/page/",
            args: &[],
            wanted: "https://x.io/site//page/",
        })
    }

    #[test]
    fn test_build_url_encodes_args() -> Result<(), ParseError> {
        build_url_test(&TestCase {
            base_url: "https://x.io/",
            path: "feed.xml",
            args: &[("utm_source", "rss feed"), ("q", "a&b")],
            wanted: "https://x.io/feed.xml?utm_source=rss+feed&q=a%26b",
        })
    }

    #[test]
    fn test_build_url_rejects_relative_base() {
        assert_eq!(
            Err(ParseError::RelativeUrlWithoutBase),
            build_url("/site", "/page/", &[]),
        );
    }

    #[test]
    fn test_build_local_path() {
        assert_eq!(
            PathBuf::from("docs/blog/img/a.png"),
            build_local_path(
                Path::new("docs/blog/post.md"),
                Path::new("img/a.png")
            ),
        );
    }
}
