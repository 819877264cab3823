//! Assembles the scroll: every post on one page, grouped by year and then
//! by month, newest first.

use crate::buffer::HtmlBuffer;
use crate::config::{SiteConfig, Theme};
use crate::html::{self, EscapeHtml};
use crate::page::{apply_common_tokens, frame, Result};
use crate::post::Post;
use crate::tagindex::TAG_INDEX_FILE;
use crate::template::{RenderContext, Token};
use chrono::Datelike;

/// The scroll's path relative to the output directory.
pub const SCROLL_FILE: &str = "s/index.html";

/// Renders the scroll. `posts` must be sorted newest first, which is how
/// [`crate::parser::Parser::parse_posts`] returns them.
pub fn render_scroll(
    site: &SiteConfig,
    theme: &Theme,
    posts: &[Post],
    buf: &mut HtmlBuffer,
) -> Result<String> {
    buf.append("<div class=\"scroll\">\n")?;
    if site.build_tags {
        let tag_index = site.base_url.join(TAG_INDEX_FILE)?;
        buf.append(&format!(
            "<p class=\"view_as\">View as: scroll | {}</p>\n",
            html::link(tag_index.as_str(), "tag index")
        ))?;
    }

    if posts.is_empty() {
        buf.append("<p>No posts found.</p>\n")?;
    }

    let mut current: Option<(i32, u32)> = None;
    for post in posts {
        let (year, month) = (post.date.year(), post.date.month());
        match current {
            Some((y, m)) if y == year && m == month => {}
            Some((y, _)) if y == year => {
                buf.append("</ul>\n")?;
                month_heading(buf, post)?;
            }
            Some(_) => {
                buf.append("</ul>\n</ul>\n")?;
                year_heading(buf, year)?;
                month_heading(buf, post)?;
            }
            None => {
                year_heading(buf, year)?;
                month_heading(buf, post)?;
            }
        }
        current = Some((year, month));
        buf.append(&post_item(post))?;
    }
    if current.is_some() {
        buf.append("</ul>\n</ul>\n")?;
    }
    buf.append("</div>\n")?;

    let mut context = RenderContext::new();
    context.set(
        Token::Description,
        format!("Every post on {}, newest first", EscapeHtml(&site.site_name)),
    );
    apply_common_tokens(
        &mut context,
        site,
        Some("Scroll"),
        &site.base_url.join(SCROLL_FILE)?,
        None,
    )?;
    frame(site, theme, &context, buf.as_str())
}

fn year_heading(buf: &mut HtmlBuffer, year: i32) -> Result<()> {
    Ok(buf.append(&format!("<h2>{}</h2>\n<ul>\n", year))?)
}

fn month_heading(buf: &mut HtmlBuffer, post: &Post) -> Result<()> {
    Ok(buf.append(&format!("<li><h3>{}</h3></li>\n<ul>\n", post.date.format("%B")))?)
}

/// A post as a list item: its linked title and date.
pub fn post_item(post: &Post) -> String {
    format!(
        "<li>{} - {}</li>\n",
        html::link(post.url.as_str(), &post.title),
        post.legible_date()
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::page::test::site;
    use crate::post::test::post;
    use pretty_assertions::assert_eq;

    fn body(page: &str) -> &str {
        let start = page.find("<div class=\"scroll\">").unwrap();
        let end = page.find("</div>\n").unwrap() + "</div>\n".len();
        &page[start..end]
    }

    #[test]
    fn test_grouping() -> Result<()> {
        let mut site = site();
        site.build_tags = false;
        let posts = vec![
            post(1618565400, "April", ""),   // 2021-04-16
            post(1617235200, "April 1", ""), // 2021-04-01
            post(1612137600, "February", ""), // 2021-02-01
            post(1577836800, "New Year", ""), // 2020-01-01
        ];
        let page = render_scroll(&site, &Theme::default(), &posts, &mut HtmlBuffer::new())?;
        assert_eq!(
            "<div class=\"scroll\">\n\
             <h2>2021</h2>\n<ul>\n\
             <li><h3>April</h3></li>\n<ul>\n\
             <li><a href=\"https://example.com/c/1618565400.html\">April</a> - 2021-04-16 09:30:00</li>\n\
             <li><a href=\"https://example.com/c/1617235200.html\">April 1</a> - 2021-04-01 00:00:00</li>\n\
             </ul>\n\
             <li><h3>February</h3></li>\n<ul>\n\
             <li><a href=\"https://example.com/c/1612137600.html\">February</a> - 2021-02-01 00:00:00</li>\n\
             </ul>\n</ul>\n\
             <h2>2020</h2>\n<ul>\n\
             <li><h3>January</h3></li>\n<ul>\n\
             <li><a href=\"https://example.com/c/1577836800.html\">New Year</a> - 2020-01-01 00:00:00</li>\n\
             </ul>\n</ul>\n\
             </div>\n",
            body(&page)
        );
        Ok(())
    }

    #[test]
    fn test_empty_scroll() -> Result<()> {
        let page = render_scroll(&site(), &Theme::default(), &[], &mut HtmlBuffer::new())?;
        assert!(page.contains("<p>No posts found.</p>"));
        assert!(page.contains(
            "View as: scroll | <a href=\"https://example.com/t/index.html\">tag index</a>"
        ));
        assert!(page.contains("<title>Scroll</title>"));
        Ok(())
    }
}
