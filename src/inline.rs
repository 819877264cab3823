//! The inline half of the Markdown dialect: backslash escapes and the span
//! delimiters (`**`, `*`, `` ` ``, `_`) plus inline images.
//!
//! Spans are toggles, not a stack. Each delimiter flips its own flag in
//! [`ParserState`] regardless of what else is open, and a flag left open on
//! one line stays open on the next. A document that depends on that quirky
//! output keeps rendering the same way.

use crate::buffer::{HtmlBuffer, Result};
use std::fmt;

/// One of the four toggled inline spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span {
    Bold,
    Italic,
    Code,
    Underline,
}

impl Span {
    pub fn open_tag(self) -> &'static str {
        match self {
            Span::Bold => "<strong>",
            Span::Italic => "<i>",
            Span::Code => "<code>",
            Span::Underline => "<u>",
        }
    }

    pub fn close_tag(self) -> &'static str {
        match self {
            Span::Bold => "</strong>",
            Span::Italic => "</i>",
            Span::Code => "</code>",
            Span::Underline => "</u>",
        }
    }
}

/// The open/closed flags for one document. A fresh value has everything
/// closed; [`crate::markdown`] owns one per render and force-closes whatever
/// is still open at the end.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParserState {
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
    pub underline: bool,
    pub blockquote: bool,
    pub ordered_list: bool,
    pub unordered_list: bool,
}

impl ParserState {
    /// Flips `span` and returns the tag that the flip emits: the opening tag
    /// if the span was closed, the closing tag if it was open.
    pub fn toggle(&mut self, span: Span) -> &'static str {
        let open = self.span_mut(span);
        *open = !*open;
        if *open {
            span.open_tag()
        } else {
            span.close_tag()
        }
    }

    pub fn is_open(&self, span: Span) -> bool {
        match span {
            Span::Bold => self.bold,
            Span::Italic => self.italic,
            Span::Code => self.code,
            Span::Underline => self.underline,
        }
    }

    fn span_mut(&mut self, span: Span) -> &mut bool {
        match span {
            Span::Bold => &mut self.bold,
            Span::Italic => &mut self.italic,
            Span::Code => &mut self.code,
            Span::Underline => &mut self.underline,
        }
    }
}

/// A character of an escape-resolved line. `literal` is set for characters
/// that were written as `\X`; the formatter copies those through without
/// giving them any Markdown meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub ch: char,
    pub literal: bool,
}

/// A line with its backslash escapes resolved. Displays as plain text.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EscapedLine {
    glyphs: Vec<Glyph>,
}

impl EscapedLine {
    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Reports whether the line begins with an escaped character. Such a line
    /// is never treated as a heading, list item or blockquote.
    pub fn starts_literal(&self) -> bool {
        self.glyphs.first().map_or(false, |g| g.literal)
    }
}

impl fmt::Display for EscapedLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use fmt::Write;
        for glyph in &self.glyphs {
            f.write_char(glyph.ch)?;
        }
        Ok(())
    }
}

/// Resolves backslash escapes: `\X` becomes a literal `X`. A lone trailing
/// backslash is kept as is. No HTML entity escaping happens here.
pub fn resolve_escapes(line: &str) -> EscapedLine {
    let mut glyphs = Vec::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(escaped) => glyphs.push(Glyph {
                    ch: escaped,
                    literal: true,
                }),
                None => glyphs.push(Glyph { ch, literal: false }),
            }
        } else {
            glyphs.push(Glyph { ch, literal: false });
        }
    }
    EscapedLine { glyphs }
}

/// Formats the inline spans of one escape-resolved line into `out`,
/// updating `state` as delimiters toggle. Malformed image references fall
/// back to a literal `!`; nothing here fails except buffer growth.
pub fn format_line(
    line: &EscapedLine,
    state: &mut ParserState,
    out: &mut HtmlBuffer,
) -> Result<()> {
    let glyphs = line.glyphs();
    let markup = |i: usize, ch: char| {
        glyphs
            .get(i)
            .map_or(false, |g| !g.literal && g.ch == ch)
    };

    let mut i = 0;
    while i < glyphs.len() {
        let glyph = glyphs[i];
        if glyph.literal {
            out.push(glyph.ch)?;
            i += 1;
            continue;
        }

        match glyph.ch {
            '*' if markup(i + 1, '*') => {
                out.append(state.toggle(Span::Bold))?;
                i += 2;
            }
            '*' => {
                out.append(state.toggle(Span::Italic))?;
                i += 1;
            }
            '`' => {
                out.append(state.toggle(Span::Code))?;
                i += 1;
            }
            '_' => {
                out.append(state.toggle(Span::Underline))?;
                i += 1;
            }
            // `!!` is reserved for image galleries, which aren't supported;
            // both characters are dropped.
            '!' if markup(i + 1, '!') => i += 2,
            '!' if markup(i + 1, '[') => match parse_image(glyphs, i) {
                Some(image) => {
                    out.append("<img class=\"post\" src=\"")?;
                    out.append(&image.src)?;
                    out.append("\" alt=\"")?;
                    out.append(&image.alt)?;
                    out.append("\">")?;
                    i = image.end;
                }
                None => {
                    log::debug!("malformed image reference; keeping literal `!`");
                    out.push('!')?;
                    i += 1;
                }
            },
            ch => {
                out.push(ch)?;
                i += 1;
            }
        }
    }
    Ok(())
}

struct Image {
    alt: String,
    src: String,

    /// Index of the first glyph after the reference.
    end: usize,
}

// Parses `![alt](src)` starting at the `!` at `start`. The source ends at the
// first `)` or space; without one on this line the reference is malformed.
fn parse_image(glyphs: &[Glyph], start: usize) -> Option<Image> {
    let alt_start = start + 2;
    let alt_end = alt_start + glyphs[alt_start..].iter().position(|g| g.ch == ']')?;
    if glyphs.get(alt_end + 1).map(|g| g.ch) != Some('(') {
        return None;
    }
    let src_start = alt_end + 2;
    let src_end = src_start
        + glyphs[src_start..]
            .iter()
            .position(|g| g.ch == ')' || g.ch == ' ')?;

    let text = |range: &[Glyph]| range.iter().map(|g| g.ch).collect::<String>();
    Some(Image {
        alt: text(&glyphs[alt_start..alt_end]),
        src: text(&glyphs[src_start..src_end]),
        end: src_end + 1,
    })
}
