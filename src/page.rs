//! Assembles post pages and the pieces every page shares: the common
//! header tokens ([`apply_common_tokens`]) and the header/navigation/footer
//! frame around a page body ([`frame`]).
//!
//! Every assembler takes a scratch [`HtmlBuffer`] (usually checked out of a
//! [`crate::buffer::BufferPool`]) and returns the finished page as a string.

use crate::buffer::{self, HtmlBuffer};
use crate::config::{SiteConfig, Theme};
use crate::html::{self, EscapeHtml};
use crate::post::Post;
use crate::template::{self, expand_template, RenderContext, Token};
use std::fmt;
use url::Url;

/// The directory under the site root holding post icons.
const ICONS_DIRECTORY: &str = "img/icons/";

/// Fills the tokens the site header and footer use on every page. Site links
/// are built from `{BASE_URL}` so a site can live below a path. `title` is the
/// page's own title, if it has one; pages without one are titled with the
/// site name. `image` overrides the site's default preview image.
pub fn apply_common_tokens(
    context: &mut RenderContext,
    site: &SiteConfig,
    title: Option<&str>,
    page_url: &Url,
    image: Option<&Url>,
) -> Result<()> {
    let title = EscapeHtml(title.unwrap_or(&site.site_name)).to_string();
    let image = match image {
        Some(image) => image.to_string(),
        None => default_image(site)?.map_or_else(String::new, |url| url.to_string()),
    };
    context
        .set(Token::SiteName, EscapeHtml(&site.site_name).to_string())
        .set(Token::BaseUrl, site.base_url.as_str())
        .set(Token::PageUrl, page_url.as_str())
        .set(Token::MainImage, image)
        .set(Token::TitleForMeta, title.clone())
        .set(Token::PageTitle, title);
    Ok(())
}

// The configured default image as an absolute URL.
fn default_image(site: &SiteConfig) -> Result<Option<Url>> {
    match site.default_image.as_deref() {
        None | Some("") => Ok(None),
        Some(image) if image.contains("://") => Ok(Some(Url::parse(image)?)),
        Some(image) => Ok(Some(site.base_url.join(image.trim_start_matches('/'))?)),
    }
}

/// The absolute URL of a post's icon, if it has one.
pub fn icon_url(site: &SiteConfig, post: &Post) -> Result<Option<Url>> {
    match &post.icon {
        Some(icon) => Ok(Some(
            site.base_url.join(ICONS_DIRECTORY)?.join(icon.trim_start_matches('/'))?,
        )),
        None => Ok(None),
    }
}

/// Builds the context for rendering `post`, either as its own page or as an
/// index item.
pub fn post_context(site: &SiteConfig, post: &Post) -> Result<RenderContext> {
    let icon = icon_url(site, post)?;
    let mut context = RenderContext::new();
    context
        .set(Token::Title, EscapeHtml(&post.title).to_string())
        .set(Token::Date, post.legible_date())
        .set(Token::Content, post.body.as_str())
        .set(Token::PostUrl, post.url.as_str())
        .set(Token::Description, EscapeHtml(&post.description()).to_string())
        .set(Token::Tags, html::tag_links(&post.tags))
        .set_tags(post.tags.clone())
        .set_prev(post.prev.is_some())
        .set_next(post.next.is_some());
    if let Some(icon) = &icon {
        context.set(Token::Icon, html::icon(icon.as_str()));
    }
    if let Some(prev) = &post.prev {
        context
            .set(Token::PrevUrl, prev.as_str())
            .set(Token::Forward, html::newer_link(prev.as_str()));
    }
    if let Some(next) = &post.next {
        context
            .set(Token::NextUrl, next.as_str())
            .set(Token::Back, html::older_link(next.as_str()));
    }
    apply_common_tokens(&mut context, site, Some(&post.title), &post.url, icon.as_ref())?;
    Ok(context)
}

/// Renders the page for a single post: header, post template, navigation,
/// and footer, expanded together.
pub fn render_post_page(
    site: &SiteConfig,
    theme: &Theme,
    post: &Post,
    buf: &mut HtmlBuffer,
) -> Result<String> {
    let context = post_context(site, post)?;
    buf.append(&site.header)?;
    buf.append(&theme.single_page)?;
    buf.append(&theme.navigation)?;
    buf.append(&site.footer)?;
    Ok(expand_template(buf.as_str(), &context)?)
}

/// Wraps an already rendered `body` in the expanded header, navigation, and
/// footer. The body itself is not expanded again.
pub fn frame(
    site: &SiteConfig,
    theme: &Theme,
    context: &RenderContext,
    body: &str,
) -> Result<String> {
    let header = expand_template(&site.header, context)?;
    let navigation = expand_template(&theme.navigation, context)?;
    let footer = expand_template(&site.footer, context)?;

    let mut page =
        HtmlBuffer::with_capacity(header.len() + body.len() + navigation.len() + footer.len())?;
    page.append(&header)?;
    page.append(body)?;
    page.append(&navigation)?;
    page.append(&footer)?;
    Ok(page.into_string())
}

/// The result of a fallible page-assembly operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error assembling a page.
#[derive(Debug)]
pub enum Error {
    /// An error expanding a template.
    Template(template::Error),

    /// Returned when a page or asset URL can't be built.
    UrlParse(url::ParseError),
}

impl Error {
    /// Reports whether the error should stop the build rather than skip the
    /// one page.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Template(template::Error::Buffer(_)))
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => err.fmt(f),
            Error::UrlParse(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(err) => Some(err),
            Error::UrlParse(err) => Some(err),
        }
    }
}

impl From<template::Error> for Error {
    /// Converts a [`template::Error`] into an [`Error`]. This allows us to use
    /// the `?` operator when expanding templates.
    fn from(err: template::Error) -> Error {
        Error::Template(err)
    }
}

impl From<buffer::Error> for Error {
    /// Converts a [`buffer::Error`] into an [`Error`]. This allows us to use
    /// the `?` operator on buffer writes.
    fn from(err: buffer::Error) -> Error {
        Error::Template(template::Error::Buffer(err))
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. This allows us to use
    /// the `?` operator for URL joins.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}
