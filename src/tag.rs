//! Defines the [`Tag`] type, which represents a [`crate::post::Post`] tag.

use std::hash::{Hash, Hasher};
use url::Url;

/// Represents a [`crate::post::Post`] tag.
#[derive(Clone, Debug)]
pub struct Tag {
    /// The tag as the author wrote it, trimmed.
    pub name: String,

    /// The slugified name, so that e.g., `macOS` and `MacOS` resolve to the
    /// same tag page. This is also the tag page's file stem.
    pub slug: String,

    /// The URL for the tag's page, `{base_url}t/{slug}.html`.
    pub url: Url,
}

impl Tag {
    /// Creates a tag from its display name, deriving the slug and the page
    /// URL from `base_url`.
    pub fn new(name: &str, base_url: &Url) -> Result<Tag, url::ParseError> {
        let slug = slug::slugify(name);
        Ok(Tag {
            url: base_url.join(&format!("t/{}.html", slug))?,
            name: name.to_owned(),
            slug,
        })
    }

    /// The output path of the tag's page relative to the output directory.
    pub fn file_name(&self) -> String {
        format!("t/{}.html", self.slug)
    }
}

impl Hash for Tag {
    /// Implements [`Hash`] for [`Tag`] by delegating directly to the `slug`
    /// field.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slug.hash(state)
    }
}

impl PartialEq for Tag {
    /// Implements [`PartialEq`] and [`Eq`] for [`Tag`] by delegating directly
    /// to the `slug` field.
    fn eq(&self, other: &Self) -> bool {
        self.slug == other.slug
    }
}
impl Eq for Tag {}

/// Parses a comma-separated tag list. Names are trimmed, empty entries are
/// dropped, and repeats (by slug) keep their first spelling.
pub fn parse_tags<'a, I>(names: I, base_url: &Url) -> Result<Vec<Tag>, url::ParseError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut tags: Vec<Tag> = Vec::new();
    for name in names
        .into_iter()
        .flat_map(|s| s.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let tag = Tag::new(name, base_url)?;
        if tag.slug.is_empty() {
            log::warn!("ignoring tag `{}`: it has no URL-safe characters", name);
        } else if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    Ok(tags)
}
