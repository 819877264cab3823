//! Assembles the paginated main index: `index.html`, `index1.html`,
//! `index2.html`, and so on, newest posts first.

use crate::buffer::HtmlBuffer;
use crate::config::{SiteConfig, Theme};
use crate::html;
use crate::page::{apply_common_tokens, frame, post_context, Result};
use crate::post::Post;
use crate::template::{expand_template, RenderContext, Token};

/// Shown at the bottom of the last index page.
const OLDEST_NOTICE: &str = "<p class=\"oldest\">(these are the oldest things)</p>\n";

/// The number of index pages needed for `posts` posts. There is always at
/// least one, even for an empty site.
pub fn page_count(posts: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    ((posts + page_size - 1) / page_size).max(1)
}

/// The file name of the `page`th index page (counting from zero).
pub fn index_file_name(page: usize) -> String {
    match page {
        0 => String::from("index.html"),
        _ => format!("index{}.html", page),
    }
}

/// Renders the `page`th index page. Each post is rendered through the index
/// item template, showing its excerpt and a read-more link when it has a
/// fold.
pub fn render_index_page(
    site: &SiteConfig,
    theme: &Theme,
    posts: &[Post],
    page: usize,
    buf: &mut HtmlBuffer,
) -> Result<String> {
    let total_pages = page_count(posts.len(), site.index_size);
    let chunk = posts
        .chunks(site.index_size.max(1))
        .nth(page)
        .unwrap_or_default();

    for post in chunk {
        let (summary, summarized) = post.summarize();
        let mut content = summary.to_owned();
        if summarized {
            content.push_str(&html::read_more(post.url.as_str()));
        }
        let mut context = post_context(site, post)?;
        context.set(Token::Content, content);
        buf.append(&expand_template(&theme.index_item, &context)?)?;
    }
    if page + 1 >= total_pages {
        buf.append(OLDEST_NOTICE)?;
    }

    let page_url = site.base_url.join(&index_file_name(page))?;
    let mut context = RenderContext::new();
    context
        .set(
            Token::Description,
            format!("Index of all posts on {}", html::EscapeHtml(&site.site_name)),
        )
        .set_prev(page > 0)
        .set_next(page + 1 < total_pages);
    if page > 0 {
        let newer = site.base_url.join(&index_file_name(page - 1))?;
        context
            .set(Token::PrevUrl, newer.as_str())
            .set(Token::Forward, html::newer_link(newer.as_str()));
    }
    if page + 1 < total_pages {
        let older = site.base_url.join(&index_file_name(page + 1))?;
        context
            .set(Token::NextUrl, older.as_str())
            .set(Token::Back, html::older_link(older.as_str()));
    }
    apply_common_tokens(&mut context, site, None, &page_url, None)?;

    frame(site, theme, &context, buf.as_str())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::page::test::site;
    use crate::post::test::post;

    fn posts(n: i64) -> Vec<Post> {
        (0..n)
            .rev()
            .map(|i| post(i + 1, &format!("Post {}", i + 1), "<p>body</p>\n"))
            .collect()
    }

    #[test]
    fn test_page_count() {
        assert_eq!(1, page_count(0, 10));
        assert_eq!(1, page_count(10, 10));
        assert_eq!(2, page_count(11, 10));
        assert_eq!(3, page_count(3, 1));
    }

    #[test]
    fn test_index_file_name() {
        assert_eq!("index.html", index_file_name(0));
        assert_eq!("index2.html", index_file_name(2));
    }

    #[test]
    fn test_pagination() -> Result<()> {
        let mut site = site();
        site.index_size = 2;
        let theme = Theme::default();
        let posts = posts(5);

        let first = render_index_page(&site, &theme, &posts, 0, &mut HtmlBuffer::new())?;
        assert!(first.contains("Post 5"));
        assert!(first.contains("Post 4"));
        assert!(!first.contains("Post 3"));
        assert!(first.contains("href=\"https://example.com/index1.html\">older &gt;</a>"));
        assert!(!first.contains("newer"));
        assert!(!first.contains("oldest things"));

        let middle = render_index_page(&site, &theme, &posts, 1, &mut HtmlBuffer::new())?;
        assert!(middle.contains(
            "<a class=\"newer\" href=\"https://example.com/index.html\">&lt; newer</a> | \
             <a class=\"older\" href=\"https://example.com/index2.html\">older &gt;</a>"
        ));

        let last = render_index_page(&site, &theme, &posts, 2, &mut HtmlBuffer::new())?;
        assert!(last.contains("Post 1"));
        assert!(last.contains("(these are the oldest things)"));
        assert!(!last.contains("older &gt;"));
        Ok(())
    }

    #[test]
    fn test_folded_post_gets_read_more() -> Result<()> {
        let site = site();
        let mut folded = post(7, "Folded", "<p>above</p>\n<p>below</p>\n");
        folded.excerpt = Some("<p>above</p>\n".to_owned());

        let page = render_index_page(
            &site,
            &Theme::default(),
            &[folded],
            0,
            &mut HtmlBuffer::new(),
        )?;
        assert!(page.contains(
            "<p>above</p>\n<p class=\"read_more\"><a href=\"https://example.com/c/7.html\">read more &raquo;</a></p>"
        ));
        assert!(!page.contains("below"));
        assert!(page.contains("<meta content=\"Index of all posts on My Site\">"));
        Ok(())
    }

    #[test]
    fn test_empty_site() -> Result<()> {
        let page = render_index_page(&site(), &Theme::default(), &[], 0, &mut HtmlBuffer::new())?;
        assert!(page.contains("(these are the oldest things)"));
        Ok(())
    }
}
