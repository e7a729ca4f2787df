//! Support for turning per-page records into feed-ready entries. Assembling
//! the actual RSS/Atom document from those entries is up to the caller.

use chrono::{TimeZone, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// An image attached to a page.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Image {
    /// The absolute image URL.
    pub url: String,

    /// The guessed MIME type, when the extension is known.
    pub mime_type: Option<String>,

    /// The size of the image in bytes, when it could be determined.
    pub length: Option<u64>,
}

/// Everything the feed needs to know about a single page.
#[derive(Clone, Debug, PartialEq)]
pub struct PageInfo {
    pub title: String,

    /// The absolute URL of the page.
    pub url_full: String,

    /// Creation time as a Unix timestamp.
    pub created: i64,

    /// Last update time as a Unix timestamp.
    pub updated: i64,

    pub description: String,
    pub image: Option<Image>,
}

/// The [`PageInfo`] timestamp that feeds are ordered by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateAttribute {
    Created,
    Updated,
}

impl DateAttribute {
    /// Returns the timestamp this attribute names on `page`.
    pub fn of(self, page: &PageInfo) -> i64 {
        match self {
            DateAttribute::Created => page.created,
            DateAttribute::Updated => page.updated,
        }
    }
}

/// A single feed item, ready for serialization.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeedEntry {
    pub description: String,
    pub link: String,

    /// The RFC 2822 publication date.
    #[serde(rename = "pubDate")]
    pub pub_date: String,

    pub title: String,
    pub image: Option<Image>,
}

/// Orders `pages` by `attribute`, most recent first, and projects the first
/// `length` of them into [`FeedEntry`]s.
///
/// The sort is stable: pages with equal timestamps keep their relative input
/// order.
pub fn filter_pages(
    pages: &[PageInfo],
    attribute: DateAttribute,
    length: usize,
) -> Vec<FeedEntry> {
    let mut sorted: Vec<&PageInfo> = pages.iter().collect();
    sorted.sort_by_key(|page| Reverse(attribute.of(page)));
    sorted
        .into_iter()
        .take(length)
        .map(|page| FeedEntry {
            description: page.description.clone(),
            link: page.url_full.clone(),
            pub_date: format_date(attribute.of(page)),
            title: page.title.clone(),
            image: page.image.clone(),
        })
        .collect()
}

const RFC2822_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Formats a Unix timestamp as an RFC 2822 date in UTC, with a zero-padded
/// day and a `+0000` zone (e.g., `Sun, 09 Sep 2001 01:46:40 +0000`).
/// Timestamps chrono can't represent produce an empty string.
pub fn format_date(timestamp: i64) -> String {
    match Utc.timestamp_opt(timestamp, 0).single() {
        Some(date) => date.format(RFC2822_FORMAT).to_string(),
        None => {
            warn!("Timestamp {} is out of range for a feed date", timestamp);
            String::new()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn page(title: &str, created: i64, updated: i64) -> PageInfo {
        PageInfo {
            title: title.to_owned(),
            url_full: format!("https://example.org/{}/", title),
            created,
            updated,
            description: format!("About {}", title),
            image: None,
        }
    }

    fn titles(entries: &[FeedEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.title.as_str()).collect()
    }

    #[test]
    fn test_filter_pages_orders_and_truncates() {
        let pages = vec![
            page("a", 0, 300),
            page("b", 0, 500),
            page("c", 0, 100),
            page("d", 0, 400),
            page("e", 0, 200),
        ];
        let entries = filter_pages(&pages, DateAttribute::Updated, 3);
        assert_eq!(vec!["b", "d", "a"], titles(&entries));
    }

    #[test]
    fn test_filter_pages_ties_keep_input_order() {
        let pages = vec![page("first", 10, 10), page("second", 10, 10), page("newer", 20, 20)];
        let entries = filter_pages(&pages, DateAttribute::Created, 10);
        assert_eq!(vec!["newer", "first", "second"], titles(&entries));
    }

    #[test]
    fn test_filter_pages_uses_chosen_attribute() {
        let pages = vec![page("old-but-updated", 1, 900), page("new", 800, 800)];
        assert_eq!(
            vec!["new", "old-but-updated"],
            titles(&filter_pages(&pages, DateAttribute::Created, 2)),
        );
        assert_eq!(
            vec!["old-but-updated", "new"],
            titles(&filter_pages(&pages, DateAttribute::Updated, 2)),
        );
    }

    #[test]
    fn test_filter_pages_projects_fields() {
        let mut source = page("post", 1_000_000_000, 1_000_000_000);
        source.image = Some(Image {
            url: "https://example.org/a.png".to_owned(),
            mime_type: Some("image/png".to_owned()),
            length: Some(42),
        });
        let entries = filter_pages(&[source.clone()], DateAttribute::Updated, 1);
        assert_eq!(
            vec![FeedEntry {
                description: "About post".to_owned(),
                link: "https://example.org/post/".to_owned(),
                pub_date: "Sun, 09 Sep 2001 01:46:40 +0000".to_owned(),
                title: "post".to_owned(),
                image: source.image,
            }],
            entries
        );
    }

    #[test]
    fn test_filter_pages_empty() {
        assert!(filter_pages(&[], DateAttribute::Updated, 5).is_empty());
        assert!(filter_pages(&[page("a", 1, 1)], DateAttribute::Updated, 0).is_empty());
    }

    #[test]
    fn test_format_date_pads_day() {
        assert_eq!("Thu, 01 Jan 1970 00:00:00 +0000", format_date(0));
        assert_eq!("Tue, 05 Mar 2024 09:04:05 +0000", format_date(1_709_629_445));
    }

    #[test]
    fn test_format_date_out_of_range() {
        assert_eq!("", format_date(i64::MAX));
    }
}
