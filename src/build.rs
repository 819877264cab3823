//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: parsing the posts
//! ([`crate::parser`]), rendering post, index, scroll, and tag pages
//! ([`crate::page`] and friends), writing them ([`crate::write`]), and
//! generating the Atom feed ([`crate::feed`]).
//!
//! [`Options`] select a dry run, which renders every page but writes
//! nothing, or an updated-only build, which leaves unchanged post pages on
//! disk.

use crate::buffer::{BufferPool, HtmlBuffer};
use crate::config::Config;
use crate::feed::{self, Error as FeedError, FEED_FILE};
use crate::index::{index_file_name, page_count, render_index_page};
use crate::page::{self, render_post_page};
use crate::parser::{Error as ParseError, Parser};
use crate::post::Post;
use crate::scroll::{render_scroll, SCROLL_FILE};
use crate::tagindex::{group_by_tag, render_tag_index, render_tag_page, TAG_INDEX_FILE};
use crate::write::{Error as WriteError, Writer};
use chrono::{DateTime, Utc};
use std::fmt;

/// The output subdirectories owned by the generator. They're removed before
/// each full build.
const GENERATED_DIRECTORIES: [&str; 3] = ["c", "s", "t"];

/// The directory holding post pages. Updated-only builds keep it.
const POSTS_DIRECTORY: &str = "c";

/// How to build the site.
#[derive(Clone, Copy, Debug, Default)]
pub struct Options {
    /// Parse and render everything, but don't touch the output directory.
    pub dry_run: bool,

    /// Only rewrite post pages whose source changed after this time, plus
    /// their neighbours (whose navigation may point at a new post) and any
    /// page missing from the output. Indexes, scroll, tags, and the feed are
    /// always rebuilt. `None` rebuilds everything.
    pub updated_since: Option<DateTime<Utc>>,
}

/// What a build produced.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub posts: usize,

    /// Pages rendered successfully, whether or not they were written.
    pub pages_rendered: usize,
    pub pages_written: usize,
    pub pages_skipped: usize,

    /// Post pages left alone by an updated-only build.
    pub posts_unchanged: usize,
}

/// Builds the site from a [`Config`] object. A page that fails to render for
/// a recoverable reason is logged and skipped; running out of memory or
/// failing to write aborts the build.
pub fn build_site(config: &Config, options: &Options) -> Result<Summary> {
    let site = &config.site;
    let theme = &config.theme;

    let posts = Parser::new(&site.base_url).parse_posts(&config.posts_source_directory)?;
    log::info!(
        "parsed {} posts from `{}`",
        posts.len(),
        config.posts_source_directory.display()
    );

    let mut builder = Builder {
        writer: if options.dry_run {
            None
        } else {
            Some(Writer::new(&config.output_directory))
        },
        pool: BufferPool::default(),
        summary: Summary {
            posts: posts.len(),
            ..Summary::default()
        },
    };
    if let Some(writer) = &mut builder.writer {
        for dir in GENERATED_DIRECTORIES {
            if options.updated_since.is_some() && dir == POSTS_DIRECTORY {
                continue;
            }
            writer.clean(dir)?;
        }
    }

    let stale = match options.updated_since {
        Some(since) => stale_posts(&posts, since),
        None => vec![true; posts.len()],
    };
    for (post, stale) in posts.iter().zip(stale) {
        let file_name = post.file_name();
        if !stale && config.output_directory.join(&file_name).is_file() {
            builder.summary.posts_unchanged += 1;
            continue;
        }
        builder.emit(&file_name, |buf| render_post_page(site, theme, post, buf))?;
    }

    for i in 0..page_count(posts.len(), site.index_size) {
        builder.emit(&index_file_name(i), |buf| {
            render_index_page(site, theme, &posts, i, buf)
        })?;
    }

    if site.build_scroll {
        builder.emit(SCROLL_FILE, |buf| render_scroll(site, theme, &posts, buf))?;
    }

    if site.build_tags {
        let groups = group_by_tag(&posts);
        builder.emit(TAG_INDEX_FILE, |buf| {
            render_tag_index(site, theme, &groups, buf)
        })?;
        for group in &groups {
            builder.emit(&group.tag.file_name(), |buf| {
                render_tag_page(site, theme, group, buf)
            })?;
        }
    }

    if site.build_feed {
        let xml = feed::render_feed(site, &posts)?;
        builder.write(FEED_FILE, &xml)?;
    }

    let summary = builder.summary;
    if options.dry_run {
        log::info!(
            "dry run: rendered {} pages ({} skipped), nothing written",
            summary.pages_rendered,
            summary.pages_skipped
        );
    } else {
        log::info!(
            "wrote {} pages to `{}` ({} skipped, {} posts unchanged)",
            summary.pages_written,
            config.output_directory.display(),
            summary.pages_skipped,
            summary.posts_unchanged
        );
    }
    Ok(summary)
}

/// Marks each post (newest first) whose page an updated-only build must
/// rewrite: those modified after `since` and their immediate neighbours.
/// Posts without a known modification time are always rewritten.
pub fn stale_posts(posts: &[Post], since: DateTime<Utc>) -> Vec<bool> {
    let changed: Vec<bool> = posts
        .iter()
        .map(|post| post.modified.map_or(true, |modified| modified > since))
        .collect();
    (0..changed.len())
        .map(|i| {
            changed[i]
                || i.checked_sub(1).map_or(false, |newer| changed[newer])
                || changed.get(i + 1).copied().unwrap_or(false)
        })
        .collect()
}

struct Builder<'a> {
    /// `None` for a dry run.
    writer: Option<Writer<'a>>,
    pool: BufferPool,
    summary: Summary,
}

impl Builder<'_> {
    // Renders one page into a pooled buffer and writes it to `file_name`.
    fn emit<F>(&mut self, file_name: &str, render: F) -> Result<()>
    where
        F: FnOnce(&mut HtmlBuffer) -> page::Result<String>,
    {
        let mut buf = self.pool.checkout();
        let rendered = render(&mut buf);
        self.pool.checkin(buf);

        match rendered {
            Ok(html) => self.write(file_name, &html),
            Err(err) if err.is_fatal() => Err(Error::Render {
                file_name: file_name.to_owned(),
                err,
            }),
            Err(err) => {
                log::warn!("skipping `{}`: {}", file_name, err);
                self.summary.pages_skipped += 1;
                Ok(())
            }
        }
    }

    fn write(&mut self, file_name: &str, contents: &str) -> Result<()> {
        self.summary.pages_rendered += 1;
        match &mut self.writer {
            Some(writer) => {
                writer.write_page(file_name, contents)?;
                self.summary.pages_written += 1;
            }
            None => log::debug!("dry run: not writing `{}`", file_name),
        }
        Ok(())
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during parsing,
/// rendering, writing, or generating the feed.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors during parsing.
    Parse(ParseError),

    /// Returned when a page can't be rendered and the build can't go on.
    Render { file_name: String, err: page::Error },

    /// Returned for errors writing pages to disk.
    Write(WriteError),

    /// Returned for errors writing the feed.
    Feed(FeedError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(err) => err.fmt(f),
            Error::Render { file_name, err } => {
                write!(f, "Rendering '{}': {}", file_name, err)
            }
            Error::Write(err) => err.fmt(f),
            Error::Feed(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::Render { file_name: _, err } => Some(err),
            Error::Write(err) => Some(err),
            Error::Feed(err) => Some(err),
        }
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

impl From<FeedError> for Error {
    /// Converts [`FeedError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: FeedError) -> Error {
        Error::Feed(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::buffer;
    use crate::post::test::post;
    use crate::template;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_emit_skips_recoverable_errors() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let out = tempfile::tempdir()?;
        let mut builder = Builder {
            writer: Some(Writer::new(out.path())),
            pool: BufferPool::new(1, 64),
            summary: Summary::default(),
        };

        builder.emit("bad.html", |_| {
            Err(page::Error::Template(template::Error::InvalidInput(
                "bad token".to_owned(),
            )))
        })?;
        builder.emit("good.html", |buf| {
            buf.append("<p>ok</p>")?;
            Ok(buf.to_string())
        })?;

        assert_eq!(1, builder.summary.pages_skipped);
        assert_eq!(1, builder.summary.pages_written);
        assert_eq!(1, builder.summary.pages_rendered);
        assert!(!out.path().join("bad.html").exists());
        assert!(out.path().join("good.html").exists());
        assert_eq!(1, builder.pool.available());
        Ok(())
    }

    #[test]
    fn test_emit_aborts_on_exhaustion() {
        let out = tempfile::tempdir().unwrap();
        let mut builder = Builder {
            writer: Some(Writer::new(out.path())),
            pool: BufferPool::default(),
            summary: Summary::default(),
        };
        let exhausted = Vec::<u8>::new()
            .try_reserve(usize::MAX)
            .map_err(|err| buffer::Error::Exhausted {
                requested: usize::MAX,
                err,
            })
            .unwrap_err();

        match builder.emit("page.html", |_| Err(page::Error::from(exhausted))) {
            Err(Error::Render { file_name, err }) => {
                assert_eq!("page.html", file_name);
                assert!(err.is_fatal());
            }
            other => panic!("wanted a render error, got {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_writer_renders_only() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut builder = Builder {
            writer: None,
            pool: BufferPool::new(1, 64),
            summary: Summary::default(),
        };
        builder.emit("page.html", |buf| {
            buf.append("<p>ok</p>")?;
            Ok(buf.to_string())
        })?;
        builder.write("feed.xml", "<feed/>")?;
        assert_eq!(2, builder.summary.pages_rendered);
        assert_eq!(0, builder.summary.pages_written);
        Ok(())
    }

    #[test]
    fn test_stale_posts() {
        let since = Utc.timestamp_opt(1_000_000, 0).unwrap();
        let old = since - Duration::seconds(60);
        let new = since + Duration::seconds(60);
        let stamped = |id, modified| Post {
            modified,
            ..post(id, "t", "")
        };

        // Newest first: a new post at the top marks the one after it too.
        let posts = vec![
            stamped(5, Some(new)),
            stamped(4, Some(old)),
            stamped(3, Some(old)),
            stamped(2, None),
            stamped(1, Some(old)),
        ];
        assert_eq!(
            vec![true, true, true, true, true],
            stale_posts(&posts, since)
        );

        let posts = vec![
            stamped(4, Some(old)),
            stamped(3, Some(old)),
            stamped(2, Some(new)),
            stamped(1, Some(old)),
        ];
        assert_eq!(vec![false, true, true, true], stale_posts(&posts, since));

        let untouched = vec![stamped(2, Some(old)), stamped(1, Some(since))];
        assert_eq!(vec![false, false], stale_posts(&untouched, since));
        assert!(stale_posts(&[], since).is_empty());
    }
}
