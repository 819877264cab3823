//! The template engine. Templates are plain HTML with three kinds of markup:
//!
//! * `{TOKEN}` placeholders, replaced by [`replace_token`];
//! * `<!-- LOOP tags -->`...`<!-- END LOOP -->` regions, repeated once per
//!   tag by [`process_loops`];
//! * `<!-- IF condition -->`...`<!-- END IF -->` regions, kept or dropped
//!   by [`process_conditionals`].
//!
//! [`expand_template`] runs all three, in that order, against a
//! [`RenderContext`]. A region whose end marker is missing is left exactly as
//! written. Placeholders are filled in a single left-to-right pass, so text
//! inserted for one token is never expanded again.

use crate::buffer::{self, HtmlBuffer};
use crate::tag::Tag;
use std::collections::HashMap;
use std::fmt;

const LOOP_START: &str = "<!-- LOOP tags -->";
const LOOP_OPEN_PREFIX: &str = "<!-- LOOP ";
const LOOP_END: &str = "<!-- END LOOP -->";
const IF_OPEN_PREFIX: &str = "<!-- IF ";
const IF_END: &str = "<!-- END IF -->";

/// Separator between the repetitions of a loop body.
const LOOP_SEPARATOR: &str = ", ";

/// Conditional passes always made, even when one changes nothing.
const MIN_CONDITIONAL_PASSES: usize = 3;

/// The placeholders [`expand_template`] fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Title,
    Date,
    Icon,
    Content,
    PostUrl,
    PrevUrl,
    NextUrl,
    Description,
    Tags,
    Back,
    Forward,
    MainImage,
    SiteName,
    PageUrl,
    TitleForMeta,
    PageTitle,
    BaseUrl,
}

impl Token {
    pub const ALL: [Token; 17] = [
        Token::Title,
        Token::Date,
        Token::Icon,
        Token::Content,
        Token::PostUrl,
        Token::PrevUrl,
        Token::NextUrl,
        Token::Description,
        Token::Tags,
        Token::Back,
        Token::Forward,
        Token::MainImage,
        Token::SiteName,
        Token::PageUrl,
        Token::TitleForMeta,
        Token::PageTitle,
        Token::BaseUrl,
    ];

    /// Looks up a token by its placeholder name.
    pub fn from_name(name: &str) -> Option<Token> {
        Token::ALL.into_iter().find(|token| token.name() == name)
    }

    /// The name between the braces, e.g. `POST_URL` for `{POST_URL}`.
    pub fn name(self) -> &'static str {
        match self {
            Token::Title => "TITLE",
            Token::Date => "DATE",
            Token::Icon => "ICON",
            Token::Content => "CONTENT",
            Token::PostUrl => "POST_URL",
            Token::PrevUrl => "PREV_URL",
            Token::NextUrl => "NEXT_URL",
            Token::Description => "DESCRIPTION",
            Token::Tags => "TAGS",
            Token::Back => "BACK",
            Token::Forward => "FORWARD",
            Token::MainImage => "MAIN_IMAGE",
            Token::SiteName => "SITE_NAME",
            Token::PageUrl => "PAGE_URL",
            Token::TitleForMeta => "TITLE_FOR_META",
            Token::PageTitle => "PAGETITLE",
            Token::BaseUrl => "BASE_URL",
        }
    }
}

/// The conditions an `IF` region can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    HasNavigation,
    HasTags,
    HasPrev,
    HasNext,
}

impl Condition {
    pub const ALL: [Condition; 4] = [
        Condition::HasNavigation,
        Condition::HasTags,
        Condition::HasPrev,
        Condition::HasNext,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Condition::HasNavigation => "has_navigation",
            Condition::HasTags => "has_tags",
            Condition::HasPrev => "has_prev",
            Condition::HasNext => "has_next",
        }
    }

    fn start_marker(self) -> String {
        format!("{}{} -->", IF_OPEN_PREFIX, self.name())
    }
}

/// Everything one page render substitutes into its template. Built once per
/// page and only read during expansion.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    tokens: HashMap<Token, String>,
    tags: Vec<Tag>,
    has_prev: bool,
    has_next: bool,
}

impl RenderContext {
    pub fn new() -> RenderContext {
        RenderContext::default()
    }

    /// Sets the value substituted for `token`, replacing any earlier value.
    pub fn set(&mut self, token: Token, value: impl Into<String>) -> &mut Self {
        self.tokens.insert(token, value.into());
        self
    }

    pub fn set_tags(&mut self, tags: Vec<Tag>) -> &mut Self {
        self.tags = tags;
        self
    }

    pub fn set_prev(&mut self, has_prev: bool) -> &mut Self {
        self.has_prev = has_prev;
        self
    }

    pub fn set_next(&mut self, has_next: bool) -> &mut Self {
        self.has_next = has_next;
        self
    }

    pub fn get(&self, token: Token) -> Option<&str> {
        self.tokens.get(&token).map(String::as_str)
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn condition(&self, condition: Condition) -> bool {
        match condition {
            Condition::HasNavigation => self.has_prev || self.has_next,
            Condition::HasTags => !self.tags.is_empty(),
            Condition::HasPrev => self.has_prev,
            Condition::HasNext => self.has_next,
        }
    }
}

/// Expands `template` against `context`: tag loops first, then
/// conditionals, then every [`Token`] placeholder. Tokens the context doesn't
/// set expand to the empty string; unknown placeholders are kept. Values are
/// inserted verbatim, so a post body that mentions `{SITE_NAME}` keeps it.
pub fn expand_template(template: &str, context: &RenderContext) -> Result<String> {
    let looped = process_loops(template, context.tags())?;
    let conditioned = process_conditionals(&looped, context)?;
    substitute(&conditioned, |name| {
        Token::from_name(name).map(|token| context.get(token).unwrap_or(""))
    })
}

/// Replaces every `{token}` in `template` with `value`, or with nothing when
/// `value` is `None`. The result is always a new string. Text inserted from
/// `value` is not scanned again.
///
/// Fails with [`Error::InvalidInput`] if `token` is empty or contains a
/// brace, since no placeholder could ever match it.
pub fn replace_token(template: &str, token: &str, value: Option<&str>) -> Result<String> {
    if token.is_empty() || token.contains(|c| c == '{' || c == '}') {
        return Err(Error::InvalidInput(format!(
            "invalid template token name {:?}",
            token
        )));
    }

    let value = value.unwrap_or("");
    substitute(template, |name| (name == token).then(|| value))
}

// Copies `template`, replacing each `{NAME}` for which `lookup` returns a
// value. Inserted values are not scanned again.
fn substitute<'v, F>(template: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<&'v str>,
{
    let mut out = HtmlBuffer::with_capacity(template.len())?;
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.append(&rest[..open])?;
        let after = &rest[open + 1..];
        let name = after
            .find(|c| c == '{' || c == '}')
            .filter(|&end| after[end..].starts_with('}'))
            .map(|end| &after[..end]);
        match name.and_then(|name| lookup(name).map(|value| (name, value))) {
            Some((name, value)) => {
                out.append(value)?;
                rest = &after[name.len() + 1..];
            }
            None => {
                out.push('{')?;
                rest = after;
            }
        }
    }
    out.append(rest)?;
    Ok(out.into_string())
}

/// Expands every `<!-- LOOP tags -->` region, repeating its body once per
/// tag with `{TAG}` and `{TAG_URL}` filled in, joined by `", "`. An
/// unterminated region stops processing and is left as written.
pub fn process_loops(template: &str, tags: &[Tag]) -> Result<String> {
    let mut out = HtmlBuffer::with_capacity(template.len())?;
    let mut rest = template;
    while let Some(region) = find_region(rest, LOOP_START, LOOP_OPEN_PREFIX, LOOP_END) {
        out.append(&rest[..region.start])?;
        let body = &rest[region.body_start..region.body_end];
        for (i, tag) in tags.iter().enumerate() {
            if i > 0 {
                out.append(LOOP_SEPARATOR)?;
            }
            out.append(&substitute(body, |name| match name {
                "TAG" => Some(tag.name.as_str()),
                "TAG_URL" => Some(tag.url.as_str()),
                _ => None,
            })?)?;
        }
        rest = &rest[region.end..];
    }
    out.append(rest)?;
    Ok(out.into_string())
}

/// Resolves `<!-- IF condition -->` regions. A true condition keeps the body
/// and drops the markers; a false one drops the whole region. Each pass
/// resolves the first region of every condition; passes repeat until one
/// changes nothing. Regions naming unknown conditions are left alone.
pub fn process_conditionals(template: &str, context: &RenderContext) -> Result<String> {
    let mut out = template.to_owned();
    let mut pass = 0;
    loop {
        let mut changed = false;
        for condition in Condition::ALL {
            let marker = condition.start_marker();
            if let Some(region) = find_region(&out, &marker, IF_OPEN_PREFIX, IF_END) {
                let mut resolved = HtmlBuffer::with_capacity(out.len())?;
                resolved.append(&out[..region.start])?;
                if context.condition(condition) {
                    resolved.append(&out[region.body_start..region.body_end])?;
                }
                resolved.append(&out[region.end..])?;
                out = resolved.into_string();
                changed = true;
            }
        }
        pass += 1;
        if !changed && pass >= MIN_CONDITIONAL_PASSES {
            break;
        }
    }
    Ok(out)
}

/// Byte offsets of a marker-delimited region.
#[derive(Debug, PartialEq, Eq)]
struct Region {
    /// Start of the start marker.
    start: usize,
    body_start: usize,
    /// Start of the end marker.
    body_end: usize,
    /// Just past the end marker.
    end: usize,
}

// Finds the first `start_marker` and its matching `end_marker`. Any marker
// beginning with `open_prefix` between them opens a nested region that
// consumes one end marker of its own.
fn find_region(
    haystack: &str,
    start_marker: &str,
    open_prefix: &str,
    end_marker: &str,
) -> Option<Region> {
    let start = haystack.find(start_marker)?;
    let body_start = start + start_marker.len();
    let mut depth = 0usize;
    let mut cursor = body_start;
    loop {
        let rest = &haystack[cursor..];
        let next_end = rest.find(end_marker)?;
        match rest.find(open_prefix) {
            Some(next_open) if next_open < next_end => {
                depth += 1;
                cursor += next_open + open_prefix.len();
            }
            _ if depth > 0 => {
                depth -= 1;
                cursor += next_end + end_marker.len();
            }
            _ => {
                let body_end = cursor + next_end;
                return Some(Region {
                    start,
                    body_start,
                    body_end,
                    end: body_end + end_marker.len(),
                });
            }
        }
    }
}

/// The result of a fallible template operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error expanding a template.
#[derive(Debug)]
pub enum Error {
    /// Returned when an argument can't be used, e.g. an empty token name.
    InvalidInput(String),

    /// Returned when the output buffer can't grow.
    Buffer(buffer::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidInput(msg) => msg.fmt(f),
            Error::Buffer(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidInput(_) => None,
            Error::Buffer(err) => Some(err),
        }
    }
}

impl From<buffer::Error> for Error {
    /// Converts a [`buffer::Error`] into an [`Error`]. This allows us to use
    /// the `?` operator on buffer writes.
    fn from(err: buffer::Error) -> Error {
        Error::Buffer(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use url::Url;

    fn tags(names: &[&str]) -> Vec<Tag> {
        let base = Url::parse("https://example.com/").unwrap();
        names.iter().map(|n| Tag::new(n, &base).unwrap()).collect()
    }

    #[test]
    fn test_replace_token_all_instances() -> Result<()> {
        assert_eq!("Y-Y", replace_token("{X}-{X}", "X", Some("Y"))?);
        Ok(())
    }

    #[test]
    fn test_replace_token_missing_value_is_empty() -> Result<()> {
        assert_eq!("a--b", replace_token("a-{X}-b", "X", None)?);
        Ok(())
    }

    #[test]
    fn test_replace_token_without_match_is_copy() -> Result<()> {
        assert_eq!("no tokens", replace_token("no tokens", "X", Some("Y"))?);
        Ok(())
    }

    #[test]
    fn test_replace_token_self_referencing_value_terminates() -> Result<()> {
        assert_eq!("<{X}>", replace_token("<{X}>", "X", Some("{X}"))?);
        Ok(())
    }

    #[test]
    fn test_replace_token_rejects_bad_names() {
        for name in ["", "A}", "{A"] {
            match replace_token("{A}", name, Some("x")) {
                Err(Error::InvalidInput(_)) => {}
                other => panic!("wanted InvalidInput for {:?}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_loop() -> Result<()> {
        let template = "Tags: <!-- LOOP tags --><a href=\"{TAG_URL}\">{TAG}</a><!-- END LOOP -->.";
        assert_eq!(
            "Tags: <a href=\"https://example.com/t/rust.html\">rust</a>, \
             <a href=\"https://example.com/t/web.html\">web</a>.",
            process_loops(template, &tags(&["rust", "web"]))?
        );
        assert_eq!("Tags: .", process_loops(template, &[])?);
        Ok(())
    }

    #[test]
    fn test_unterminated_loop_is_untouched() -> Result<()> {
        let template = "<ul><!-- LOOP tags --><li>x</li></ul>";
        assert_eq!(template, process_loops(template, &tags(&["a"]))?);
        assert_eq!(template, expand_template(template, &RenderContext::new())?);
        Ok(())
    }

    #[test]
    fn test_conditionals() -> Result<()> {
        let template = "<!-- IF has_prev -->P<!-- END IF -->|<!-- IF has_next -->N<!-- END IF -->";
        let mut context = RenderContext::new();
        context.set_prev(true);
        assert_eq!("P|", process_conditionals(template, &context)?);
        Ok(())
    }

    #[test]
    fn test_nested_conditionals() -> Result<()> {
        let template = "<!-- IF has_navigation -->[<!-- IF has_prev -->prev<!-- END IF -->\
                        <!-- IF has_next -->next<!-- END IF -->]<!-- END IF -->";

        let mut context = RenderContext::new();
        assert_eq!("", process_conditionals(template, &context)?);

        context.set_next(true);
        assert_eq!("[next]", process_conditionals(template, &context)?);
        Ok(())
    }

    #[test]
    fn test_repeated_conditionals() -> Result<()> {
        let template = "<!-- IF has_tags -->a<!-- END IF --><!-- IF has_tags -->b<!-- END IF -->\
                        <!-- IF has_tags -->c<!-- END IF --><!-- IF has_tags -->d<!-- END IF -->";
        let mut context = RenderContext::new();
        context.set_tags(tags(&["x"]));
        assert_eq!("abcd", process_conditionals(template, &context)?);
        Ok(())
    }

    #[test]
    fn test_unknown_and_unterminated_conditionals_are_untouched() -> Result<()> {
        let context = RenderContext::new();
        let unknown = "<!-- IF has_cake -->cake<!-- END IF -->";
        assert_eq!(unknown, process_conditionals(unknown, &context)?);
        let open = "<!-- IF has_prev -->dangling";
        assert_eq!(open, process_conditionals(open, &context)?);
        Ok(())
    }

    #[test]
    fn test_expand_template() -> Result<()> {
        let template = "<h3>{TITLE}</h3><!-- IF has_tags -->\
                        <p><!-- LOOP tags -->{TAG}<!-- END LOOP --></p><!-- END IF -->\
                        {CONTENT}{UNKNOWN}{NEXT_URL}";
        let mut context = RenderContext::new();
        context
            .set(Token::Title, "Hello")
            .set(Token::Content, "<p>body</p>")
            .set_tags(tags(&["a", "b"]));
        assert_eq!(
            "<h3>Hello</h3><p>a, b</p><p>body</p>{UNKNOWN}",
            expand_template(template, &context)?
        );
        Ok(())
    }

    #[test]
    fn test_inserted_values_are_not_expanded() -> Result<()> {
        let mut context = RenderContext::new();
        context
            .set(Token::Title, "About {CONTENT}")
            .set(Token::Content, "<p>I run {SITE_NAME}</p>")
            .set(Token::SiteName, "My Site");
        assert_eq!(
            "<title>About {CONTENT}</title><p>I run {SITE_NAME}</p>",
            expand_template("<title>{TITLE}</title>{CONTENT}", &context)?
        );
        Ok(())
    }

    #[test]
    fn test_loop_values_are_not_expanded() -> Result<()> {
        let base = Url::parse("https://example.com/").unwrap();
        let tag = Tag::new("{TAG_URL}", &base).unwrap();
        assert_eq!(
            "[{TAG_URL}]",
            process_loops("<!-- LOOP tags -->[{TAG}]<!-- END LOOP -->", &[tag])?
        );
        Ok(())
    }

    #[test]
    fn test_stray_braces_are_kept() -> Result<()> {
        let mut context = RenderContext::new();
        context.set(Token::Title, "T");
        assert_eq!(
            "{T {TITLE {} }",
            expand_template("{{TITLE} {TITLE {} }", &context)?
        );
        assert_eq!("a{b", replace_token("a{b", "X", Some("Y"))?);
        Ok(())
    }

    #[test]
    fn test_token_names_round_trip() {
        for token in Token::ALL {
            assert_eq!(Some(token), Token::from_name(token.name()));
        }
        assert_eq!(None, Token::from_name("TAG"));
    }

    #[test]
    fn test_find_region_skips_nested_ends() {
        let haystack = "x<!-- IF has_tags -->a<!-- IF other -->b<!-- END IF -->c<!-- END IF -->y";
        let region = find_region(haystack, "<!-- IF has_tags -->", IF_OPEN_PREFIX, IF_END).unwrap();
        assert_eq!(
            "a<!-- IF other -->b<!-- END IF -->c",
            &haystack[region.body_start..region.body_end]
        );
        assert_eq!("y", &haystack[region.end..]);
    }
}
