//! Assembles the tag index (`t/index.html`) and one page per tag
//! (`t/{slug}.html`).

use crate::buffer::HtmlBuffer;
use crate::config::{SiteConfig, Theme};
use crate::html::{self, EscapeHtml};
use crate::page::{apply_common_tokens, frame, Result};
use crate::post::Post;
use crate::scroll::{post_item, SCROLL_FILE};
use crate::tag::Tag;
use crate::template::{RenderContext, Token};
use std::collections::BTreeMap;

/// The tag index's path relative to the output directory.
pub const TAG_INDEX_FILE: &str = "t/index.html";

/// A tag and the posts carrying it, newest first.
pub struct TagGroup<'a> {
    pub tag: &'a Tag,
    pub posts: Vec<&'a Post>,
}

/// Collects the distinct tags across `posts`, sorted by slug. Each group
/// keeps the order of `posts`.
pub fn group_by_tag(posts: &[Post]) -> Vec<TagGroup<'_>> {
    let mut groups: BTreeMap<&str, TagGroup> = BTreeMap::new();
    for post in posts {
        for tag in &post.tags {
            groups
                .entry(tag.slug.as_str())
                .or_insert_with(|| TagGroup {
                    tag,
                    posts: Vec::new(),
                })
                .posts
                .push(post);
        }
    }
    groups.into_values().collect()
}

/// Renders the index of every tag, each with its post count.
pub fn render_tag_index(
    site: &SiteConfig,
    theme: &Theme,
    groups: &[TagGroup],
    buf: &mut HtmlBuffer,
) -> Result<String> {
    buf.append("<div class=\"tag_index\">\n")?;
    if site.build_scroll {
        let scroll = site.base_url.join(SCROLL_FILE)?;
        buf.append(&format!(
            "<p class=\"view_as\">View as: {} | tag index</p>\n",
            html::link(scroll.as_str(), "scroll")
        ))?;
    }
    if groups.is_empty() {
        buf.append("<p>No tags found.</p>\n")?;
    } else {
        buf.append("<ul>\n")?;
        for group in groups {
            buf.append(&format!(
                "<li>{} ({})</li>\n",
                html::link(group.tag.url.as_str(), &group.tag.name),
                group.posts.len()
            ))?;
        }
        buf.append("</ul>\n")?;
    }
    buf.append("</div>\n")?;

    let mut context = RenderContext::new();
    context.set(
        Token::Description,
        format!("Index of tags on {}", EscapeHtml(&site.site_name)),
    );
    apply_common_tokens(
        &mut context,
        site,
        Some("Tags"),
        &site.base_url.join(TAG_INDEX_FILE)?,
        None,
    )?;
    frame(site, theme, &context, buf.as_str())
}

/// Renders the page listing every post tagged with `group.tag`.
pub fn render_tag_page(
    site: &SiteConfig,
    theme: &Theme,
    group: &TagGroup,
    buf: &mut HtmlBuffer,
) -> Result<String> {
    let name = EscapeHtml(&group.tag.name).to_string();
    buf.append("<div class=\"tag_page\">\n")?;
    buf.append(&format!("<h2>Pages tagged &quot;{}&quot;</h2>\n<ul>\n", name))?;
    for post in &group.posts {
        buf.append(&post_item(post))?;
    }
    buf.append("</ul>\n</div>\n")?;

    let mut context = RenderContext::new();
    context.set(
        Token::Description,
        format!(
            "Posts tagged with &#39;{}&#39; on {}",
            name,
            EscapeHtml(&site.site_name)
        ),
    );
    apply_common_tokens(
        &mut context,
        site,
        Some(&format!("Pages tagged \"{}\"", group.tag.name)),
        &group.tag.url,
        None,
    )?;
    frame(site, theme, &context, buf.as_str())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::page::test::site;
    use crate::post::test::post;
    use crate::tag::parse_tags;

    fn tagged_posts() -> Result<Vec<Post>> {
        let base = site().base_url;
        let mut newer = post(2, "Newer", "");
        newer.tags = parse_tags(["web, rust"], &base)?;
        let mut older = post(1, "Older", "");
        older.tags = parse_tags(["Rust"], &base)?;
        Ok(vec![newer, older])
    }

    #[test]
    fn test_group_by_tag() -> Result<()> {
        let posts = tagged_posts()?;
        let groups = group_by_tag(&posts);

        let summary: Vec<(&str, Vec<&str>)> = groups
            .iter()
            .map(|g| {
                (
                    g.tag.slug.as_str(),
                    g.posts.iter().map(|p| p.title.as_str()).collect(),
                )
            })
            .collect();
        assert_eq!(
            vec![("rust", vec!["Newer", "Older"]), ("web", vec!["Newer"])],
            summary
        );
        Ok(())
    }

    #[test]
    fn test_render_tag_index() -> Result<()> {
        let posts = tagged_posts()?;
        let page = render_tag_index(
            &site(),
            &Theme::default(),
            &group_by_tag(&posts),
            &mut HtmlBuffer::new(),
        )?;
        assert!(page.contains("<li><a href=\"https://example.com/t/rust.html\">rust</a> (2)</li>"));
        assert!(page.contains("<li><a href=\"https://example.com/t/web.html\">web</a> (1)</li>"));
        assert!(page.contains("View as: <a href=\"https://example.com/s/index.html\">scroll</a> | tag index"));
        assert!(page.contains("<meta content=\"Index of tags on My Site\">"));
        Ok(())
    }

    #[test]
    fn test_render_tag_page() -> Result<()> {
        let posts = tagged_posts()?;
        let groups = group_by_tag(&posts);
        let page = render_tag_page(&site(), &Theme::default(), &groups[0], &mut HtmlBuffer::new())?;
        assert!(page.contains("<h2>Pages tagged &quot;rust&quot;</h2>"));
        assert!(page.contains("<li><a href=\"https://example.com/c/2.html\">Newer</a> - 1970-01-01 00:00:02</li>"));
        assert!(page.contains("<li><a href=\"https://example.com/c/1.html\">Older</a>"));
        assert!(page.contains("<title>Pages tagged &quot;rust&quot;</title>"));
        Ok(())
    }

    #[test]
    fn test_empty_tag_index() -> Result<()> {
        let page = render_tag_index(&site(), &Theme::default(), &[], &mut HtmlBuffer::new())?;
        assert!(page.contains("<p>No tags found.</p>"));
        Ok(())
    }
}
