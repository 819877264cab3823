//! Support for creating Atom feeds from a list of posts.

use crate::config::SiteConfig;
use crate::post::Post;
use atom_syndication::{Category, Entry, Error as AtomError, Feed, Link, Text};
use chrono::{DateTime, FixedOffset, Utc};
use std::fmt;

/// The feed's path relative to the output directory.
pub const FEED_FILE: &str = "feed.xml";

/// Renders a feed of the newest [`SiteConfig::feed_size`] posts. `posts` must
/// be sorted newest first.
pub fn render_feed(site: &SiteConfig, posts: &[Post]) -> Result<String> {
    let bytes = feed(site, posts).write_to(Vec::new())?;
    String::from_utf8(bytes).map_err(Error::Utf8)
}

fn feed(site: &SiteConfig, posts: &[Post]) -> Feed {
    let posts = &posts[..posts.len().min(site.feed_size)];

    // The newest post's date keeps rebuilds of unchanged content identical.
    let updated = posts
        .first()
        .map_or_else(|| DateTime::<Utc>::from(std::time::UNIX_EPOCH), |p| p.date);

    let mut feed = Feed::default();
    feed.set_title(Text::plain(site.site_name.as_str()));
    feed.set_id(site.base_url.as_str());
    feed.set_updated(DateTime::<FixedOffset>::from(updated));
    if !site.tagline.is_empty() {
        feed.set_subtitle(Text::plain(site.tagline.as_str()));
    }
    feed.set_links(vec![alternate_link(site.base_url.as_str())]);
    feed.set_entries(posts.iter().map(feed_entry).collect::<Vec<Entry>>());
    feed
}

fn feed_entry(post: &Post) -> Entry {
    let date = DateTime::<FixedOffset>::from(post.date);
    let mut entry = Entry::default();
    entry.set_id(post.url.as_str());
    entry.set_title(Text::plain(post.title.as_str()));
    entry.set_updated(date);
    entry.set_published(Some(date));
    entry.set_links(vec![alternate_link(post.url.as_str())]);
    entry.set_summary(Some(Text::plain(post.description())));
    entry.set_categories(
        post.tags
            .iter()
            .map(|tag| {
                let mut category = Category::default();
                category.set_term(tag.slug.as_str());
                category.set_label(Some(tag.name.clone()));
                category
            })
            .collect::<Vec<Category>>(),
    );
    entry
}

fn alternate_link(href: &str) -> Link {
    let mut link = Link::default();
    link.set_href(href);
    link.set_rel("alternate");
    link
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is an Atom-related error.
    Atom(AtomError),

    /// Returned when the serialized feed isn't valid UTF-8.
    Utf8(std::string::FromUtf8Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Atom(err) => err.fmt(f),
            Error::Utf8(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Atom(err) => Some(err),
            Error::Utf8(err) => Some(err),
        }
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}
