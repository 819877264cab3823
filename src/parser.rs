//! Defines the [`Parser`] and [`Error`] types: the logic for reading post
//! source files from the file system into [`Post`]s.

use std::{fmt, fs, path::Path};

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use url::Url;
use walkdir::WalkDir;

use crate::{
    buffer, markdown,
    post::{post_file_name, Post},
    tag::parse_tags,
};

/// The line separating front matter from content, and ending the content.
const DELIMITER: &str = "###";

/// The line separating a post's excerpt from the rest of its body.
const FOLD: &str = "#MORE";

const SOURCE_EXTENSION: &str = "txt";

/// Parses [`Post`] objects from source files.
pub struct Parser<'a> {
    /// `base_url` is the site's base URL. Post pages live at
    /// `{base_url}c/{id}.html` and tag pages at `{base_url}t/{slug}.html`.
    base_url: &'a Url,
}

impl<'a> Parser<'a> {
    pub fn new(base_url: &'a Url) -> Parser<'a> {
        Parser { base_url }
    }

    /// Searches `source_directory` (not recursively) for post files
    /// (extension `.txt`) and returns the posts newest first, each linked to
    /// its neighbours and stamped with its file's modification time. A post that fails to parse is logged and skipped;
    /// only I/O problems with the directory itself and memory exhaustion
    /// abort. Each post file is structured as follows:
    ///
    /// 1. YAML front matter with `title`, `date` (seconds since the epoch),
    ///    and optionally `tags`, `summary`, `icon`, and `parse`
    /// 2. A `###` line
    /// 3. The body, up to the next `###` line or the end of the file
    ///
    /// For example:
    ///
    /// ```text
    /// title: Hello, world!
    /// date: 1618565400
    /// tags: greet, meta
    /// ###
    /// # Hello
    ///
    /// World
    /// #MORE
    /// The rest of the post.
    /// ```
    pub fn parse_posts(&self, source_directory: &Path) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = Vec::new();
        for result in WalkDir::new(source_directory)
            .min_depth(1)
            .max_depth(1)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        {
            let entry = result?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().map_or(true, |ext| ext != SOURCE_EXTENSION)
            {
                continue;
            }

            log::debug!("parsing `{}`", path.display());
            let modified = entry
                .metadata()
                .ok()
                .and_then(|metadata| metadata.modified().ok())
                .map(DateTime::<Utc>::from);
            match self.parse_file(path) {
                Ok(post) => posts.push(Post { modified, ..post }),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => log::warn!("skipping post: {}", err),
            }
        }

        posts.sort_by(|a, b| b.id.cmp(&a.id));
        posts.dedup_by(|later, kept| {
            let duplicate = later.id == kept.id;
            if duplicate {
                log::warn!(
                    "skipping post `{}`: `{}` already has date {}",
                    later.title,
                    kept.title,
                    kept.id
                );
            }
            duplicate
        });
        link_neighbours(&mut posts);
        Ok(posts)
    }

    fn parse_file(&self, path: &Path) -> Result<Post> {
        let annotate =
            |err: Error| Error::Annotated(format!("parsing post `{}`", path.display()), Box::new(err));
        let input = fs::read_to_string(path).map_err(|err| annotate(err.into()))?;
        self.parse_post(&input).map_err(annotate)
    }

    /// Parses a single [`Post`] from the contents of a source file. The
    /// returned post isn't linked to any neighbours.
    pub fn parse_post(&self, input: &str) -> Result<Post> {
        let (frontmatter, content) = split_source(input)?;
        let frontmatter: Frontmatter = serde_yaml::from_str(frontmatter)?;

        if !frontmatter.date.is_finite() {
            return Err(Error::InvalidDate(frontmatter.date));
        }
        let date = Utc
            .timestamp_opt(frontmatter.date.trunc() as i64, 0)
            .single()
            .ok_or(Error::InvalidDate(frontmatter.date))?;
        let id = date.timestamp();

        let (excerpt, rest) = split_fold(content);
        let (body, excerpt) = if frontmatter.parse {
            let mut source = String::with_capacity(content.len());
            source.push_str(excerpt.unwrap_or(""));
            source.push_str(rest);
            (
                markdown::render_markdown(&source)?,
                excerpt.map(markdown::render_markdown).transpose()?,
            )
        } else {
            let mut raw = excerpt.unwrap_or("").to_owned();
            raw.push_str(rest);
            (raw, excerpt.map(str::to_owned))
        };

        let tags = match &frontmatter.tags {
            Some(TagList::Csv(tags)) => parse_tags([tags.as_str()], self.base_url)?,
            Some(TagList::List(tags)) => parse_tags(tags.iter().map(String::as_str), self.base_url)?,
            None => Vec::new(),
        };

        Ok(Post {
            id,
            date,
            url: self.base_url.join(&post_file_name(id))?,
            title: frontmatter.title,
            tags,
            body,
            excerpt,
            summary: frontmatter.summary,
            icon: frontmatter.icon.filter(|icon| !icon.trim().is_empty()),
            prev: None,
            next: None,
            modified: None,
        })
    }
}

// Posts are sorted newest first, so the previous (newer) post comes before
// and the next (older) one after.
fn link_neighbours(posts: &mut [Post]) {
    let urls: Vec<Url> = posts.iter().map(|p| p.url.clone()).collect();
    for (i, post) in posts.iter_mut().enumerate() {
        post.prev = i.checked_sub(1).map(|j| urls[j].clone());
        post.next = urls.get(i + 1).cloned();
    }
}

// Splits a source file into its front matter and its content. The content
// runs from the line after the first `###` line to the next one (or the
// end of the input).
fn split_source(input: &str) -> Result<(&str, &str)> {
    let mut delimiters = lines_with_offsets(input).filter(|(_, line)| is_line(line, DELIMITER));
    let (fm_end, first) = delimiters.next().ok_or(Error::MissingDelimiter)?;
    let content_start = fm_end + first.len();
    let content_end = delimiters.next().map_or(input.len(), |(offset, _)| offset);
    Ok((&input[..fm_end], &input[content_start..content_end]))
}

// Splits content at the first `#MORE` line, returning the text before the
// fold (if there is one) and the text after it.
fn split_fold(content: &str) -> (Option<&str>, &str) {
    match lines_with_offsets(content).find(|(_, line)| is_line(line, FOLD)) {
        Some((offset, line)) => (Some(&content[..offset]), &content[offset + line.len()..]),
        None => (None, content),
    }
}

fn lines_with_offsets(input: &str) -> impl Iterator<Item = (usize, &str)> {
    input.split_inclusive('\n').scan(0, |offset, line| {
        let start = *offset;
        *offset += line.len();
        Some((start, line))
    })
}

fn is_line(line: &str, marker: &str) -> bool {
    line.trim_end_matches(|c| c == '\n' || c == '\r') == marker
}

fn default_parse() -> bool {
    true
}

#[derive(Deserialize)]
struct Frontmatter {
    /// The title of the post.
    title: String,

    /// Seconds since the epoch; fractions are dropped.
    date: f64,

    /// The tags associated with the post.
    #[serde(default)]
    tags: Option<TagList>,

    #[serde(default)]
    summary: Option<String>,

    #[serde(default, alias = "static_icon")]
    icon: Option<String>,

    /// Whether the body is Markdown. Raw HTML bodies set this to `false`.
    #[serde(default = "default_parse")]
    parse: bool,
}

/// Tags may be written as a comma-separated string or as a YAML list.
#[derive(Deserialize)]
#[serde(untagged)]
enum TagList {
    Csv(String),
    List(Vec<String>),
}

/// Represents the result of a [`Post`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Post`] object.
#[derive(Debug)]
pub enum Error {
    /// Returned when a post source file has no `###` line after its front
    /// matter.
    MissingDelimiter,

    /// Returned when the `date` field isn't a representable timestamp.
    InvalidDate(f64),

    /// Returned when there was an error parsing the front matter as YAML.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when there is a problem parsing URLs.
    UrlParse(url::ParseError),

    /// Returned when rendering the body runs out of memory.
    Buffer(buffer::Error),

    /// Returned for other I/O errors.
    Io(std::io::Error),

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl Error {
    /// Reports whether the error should stop the build rather than skip the
    /// one post.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Buffer(_) => true,
            Error::Annotated(_, err) => err.is_fatal(),
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingDelimiter => {
                write!(f, "Missing `{}` line after the front matter", DELIMITER)
            }
            Error::InvalidDate(date) => write!(f, "Invalid date: {}", date),
            Error::DeserializeYaml(err) => err.fmt(f),
            Error::UrlParse(err) => err.fmt(f),
            Error::Buffer(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
            Error::WalkDir(err) => err.fmt(f),
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
            Error::MissingDelimiter => None,
            Error::InvalidDate(_) => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::UrlParse(err) => Some(err),
            Error::Buffer(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<buffer::Error> for Error {
    /// Converts a [`buffer::Error`] into an [`Error`]. It allows us to use the
    /// `?` operator when rendering Markdown.
    fn from(err: buffer::Error) -> Error {
        Error::Buffer(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL parsing and joining functions.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
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
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible directory walks.
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

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base_url() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    #[test]
    fn test_parse_post() -> Result<()> {
        let base_url = base_url();
        let post = Parser::new(&base_url).parse_post(
            "title: Hello\ndate: 1618565400.75\ntags: greet, Meta\nicon: cat.png\n###\n# Hi\n\nThere.\n",
        )?;

        assert_eq!(1618565400, post.id);
        assert_eq!("Hello", post.title);
        assert_eq!("https://example.com/c/1618565400.html", post.url.as_str());
        assert_eq!("<h1>Hi</h1>\n<br>\n<p>There.</p>\n", post.body);
        assert_eq!(None, post.excerpt);
        assert_eq!(Some("cat.png".to_owned()), post.icon);
        let tags: Vec<&str> = post.tags.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(vec!["greet", "meta"], tags);
        Ok(())
    }

    #[test]
    fn test_content_ends_at_next_delimiter() -> Result<()> {
        let base_url = base_url();
        let post = Parser::new(&base_url)
            .parse_post("title: T\ndate: 1\n###\nkept\n###\nignored\n")?;
        assert_eq!("<p>kept</p>\n", post.body);
        Ok(())
    }

    #[test]
    fn test_fold() -> Result<()> {
        let base_url = base_url();
        let post = Parser::new(&base_url)
            .parse_post("title: T\ndate: 1\n###\nabove\n#MORE\nbelow\n")?;
        assert_eq!(Some("<p>above</p>\n".to_owned()), post.excerpt);
        assert_eq!("<p>above</p>\n<p>below</p>\n", post.body);
        Ok(())
    }

    #[test]
    fn test_unparsed_body_is_raw() -> Result<()> {
        let base_url = base_url();
        let post = Parser::new(&base_url).parse_post(
            "title: T\ndate: 1\nparse: false\ntags: [a, b]\n###\n<div>**raw**</div>\n#MORE\nmore\n",
        )?;
        assert_eq!("<div>**raw**</div>\nmore\n", post.body);
        assert_eq!(Some("<div>**raw**</div>\n".to_owned()), post.excerpt);
        assert_eq!(2, post.tags.len());
        Ok(())
    }

    #[test]
    fn test_missing_delimiter() {
        let base_url = base_url();
        match Parser::new(&base_url).parse_post("title: T\ndate: 1\n") {
            Err(Error::MissingDelimiter) => {}
            other => panic!("wanted MissingDelimiter, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_date_is_not_fatal() {
        let base_url = base_url();
        match Parser::new(&base_url).parse_post("title: T\ndate: .nan\n###\n") {
            Err(err @ Error::InvalidDate(_)) => assert!(!err.is_fatal()),
            other => panic!("wanted InvalidDate, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_posts() -> Result<()> {
        let base_url = base_url();
        let posts = Parser::new(&base_url).parse_posts(Path::new("./testdata/dat/"))?;

        let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(vec!["Newest", "Middle", "Oldest"], titles);

        assert_eq!(None, posts[0].prev);
        assert_eq!(Some(posts[1].url.clone()), posts[0].next);
        assert_eq!(Some(posts[0].url.clone()), posts[1].prev);
        assert_eq!(Some(posts[2].url.clone()), posts[1].next);
        assert_eq!(None, posts[2].next);
        assert!(posts.iter().all(|post| post.modified.is_some()));
        Ok(())
    }
}
