//! Small HTML fragments shared by the page assemblers: links, icons, and
//! navigation. Text and URLs are escaped with `pulldown_cmark`'s escapers,
//! wrapped so they can be used directly in `format!`.

use crate::tag::Tag;
use pulldown_cmark::escape::{escape_href, escape_html, StrWrite};
use std::fmt::{self, Display};
use std::io;

struct Adaptor<'a, T> {
    formatter: &'a mut T,
    result: fmt::Result,
}

impl<T> Adaptor<'_, T> {
    fn handle_result(&mut self, result: fmt::Result) -> io::Result<()> {
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                self.result = result;
                Err(io::Error::new(io::ErrorKind::Other, e))
            }
        }
    }
}

impl<T: fmt::Write> StrWrite for Adaptor<'_, T> {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        let result = self.formatter.write_str(s);
        self.handle_result(result)
    }

    fn write_fmt(&mut self, args: fmt::Arguments) -> io::Result<()> {
        let result = self.formatter.write_fmt(args);
        self.handle_result(result)
    }
}

/// Displays a URL escaped for an `href` or `src` attribute.
pub struct EscapeHref<'a>(pub &'a str);

impl Display for EscapeHref<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adaptor = Adaptor {
            formatter: f,
            result: Ok(()),
        };
        let _ = escape_href(&mut adaptor, self.0);
        adaptor.result
    }
}

/// Displays text escaped for HTML element content or a quoted attribute.
pub struct EscapeHtml<'a>(pub &'a str);

impl Display for EscapeHtml<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adaptor = Adaptor {
            formatter: f,
            result: Ok(()),
        };
        let _ = escape_html(&mut adaptor, self.0);
        adaptor.result
    }
}

pub fn link(href: &str, text: &str) -> String {
    format!("<a href=\"{}\">{}</a>", EscapeHref(href), EscapeHtml(text))
}

/// Links to each tag's page, separated by `", "`.
pub fn tag_links(tags: &[Tag]) -> String {
    tags.iter()
        .map(|tag| link(tag.url.as_str(), &tag.name))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn icon(src: &str) -> String {
    format!("<img class=\"icon\" src=\"{}\" alt=\"\">", EscapeHref(src))
}

pub fn read_more(href: &str) -> String {
    format!(
        "<p class=\"read_more\"><a href=\"{}\">read more &raquo;</a></p>",
        EscapeHref(href)
    )
}

/// The link to newer content (the previous post or index page).
pub fn newer_link(href: &str) -> String {
    format!("<a class=\"newer\" href=\"{}\">&lt; newer</a>", EscapeHref(href))
}

/// The link to older content (the next post or index page).
pub fn older_link(href: &str) -> String {
    format!("<a class=\"older\" href=\"{}\">older &gt;</a>", EscapeHref(href))
}
