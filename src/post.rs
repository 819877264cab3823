//! Defines the [`Post`] type, the in-memory form of one source file after
//! parsing, and the derived values templates show for it.

use crate::tag::Tag;
use chrono::{DateTime, Utc};
use url::Url;

/// The number of characters of body text used as a description when a post
/// has no summary.
pub const DESCRIPTION_LENGTH: usize = 240;

/// The date format shown on pages.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Represents a parsed post.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    /// The post's timestamp in whole seconds since the epoch. This doubles as
    /// its identifier: the post page is `c/{id}.html`.
    pub id: i64,

    /// The post's date; `id` is its timestamp.
    pub date: DateTime<Utc>,

    pub title: String,

    /// The post's tags, in the order they were first written.
    pub tags: Vec<Tag>,

    /// The post body as HTML (rendered, unless the post opted out of
    /// rendering).
    pub body: String,

    /// The HTML before the `#MORE` fold, if the post has one.
    pub excerpt: Option<String>,

    /// An author-written summary. Used as the description when present.
    pub summary: Option<String>,

    /// The file name of the post's icon under `img/icons/`.
    pub icon: Option<String>,

    /// The URL of the post page.
    pub url: Url,

    /// The newer neighbour's URL.
    pub prev: Option<Url>,

    /// The older neighbour's URL.
    pub next: Option<Url>,

    /// When the source file was last modified, if it came from one.
    pub modified: Option<DateTime<Utc>>,
}

impl Post {
    /// The post page's path relative to the output directory.
    pub fn file_name(&self) -> String {
        post_file_name(self.id)
    }

    /// The post date as shown on pages, e.g. `2021-04-16 09:30:00` (UTC).
    pub fn legible_date(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    /// Returns the text shown on index pages and whether it was cut short at
    /// the fold.
    pub fn summarize(&self) -> (&str, bool) {
        match &self.excerpt {
            Some(excerpt) => (excerpt, true),
            None => (&self.body, false),
        }
    }

    /// The meta description: the summary if there is one, otherwise the first
    /// [`DESCRIPTION_LENGTH`] characters of the body's text.
    pub fn description(&self) -> String {
        match self.summary.as_deref().map(str::trim) {
            Some(summary) if !summary.is_empty() => summary.to_owned(),
            _ => strip_html_tags(&self.body)
                .trim()
                .chars()
                .take(DESCRIPTION_LENGTH)
                .collect(),
        }
    }
}

/// The path of a post page relative to the output directory.
pub fn post_file_name(id: i64) -> String {
    format!("c/{}.html", id)
}

/// Removes HTML tags and decodes the entities the renderer or authors are
/// likely to produce (`&lt;`, `&gt;`, `&amp;`, `&quot;`).
pub fn strip_html_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}
