//! Converts the site's Markdown dialect to HTML. See [`render_markdown`].
//!
//! The dialect is line oriented. Each line has its escapes resolved and its
//! inline spans formatted (see [`crate::inline`]) and is then classified by
//! its first characters:
//!
//! | Line starts with | Output                                   |
//! |------------------|------------------------------------------|
//! | `#` to `######`  | `<hN>` heading, more `#`s clamp to `<h6>` |
//! | `- `             | `<li>` inside a `<ul>`                   |
//! | digit then `.`   | `<li>` inside an `<ol>`                  |
//! | `>`              | `<p>` inside a `<blockquote>`            |
//! | (empty line)     | `<br>`                                   |
//! | anything else    | `<p>`, closing any open list/blockquote |

use crate::buffer::{HtmlBuffer, Result};
use crate::inline::{format_line, resolve_escapes, ParserState, Span};

/// The deepest heading level; longer runs of `#` still produce `<h6>`.
const MAX_HEADING_LEVEL: usize = 6;

/// Renders a whole document to HTML. Every call starts from a closed
/// [`ParserState`] and the output never has dangling open tags. Malformed
/// input is rendered best-effort; the only failure is running out of memory.
pub fn render_markdown(source: &str) -> Result<String> {
    let mut out = HtmlBuffer::with_capacity(source.len().saturating_mul(3))?;
    let mut parser = Parser::new(&mut out);
    for line in lines(source) {
        parser.line(line)?;
    }
    parser.finish()?;
    Ok(out.into_string())
}

// Splits on `\n`. A final line without a newline is still a line; the empty
// remainder after a trailing newline is not. Only an empty document has no
// lines: `"\n"` is one empty line.
fn lines(source: &str) -> impl Iterator<Item = &str> {
    let empty = source.is_empty();
    source
        .strip_suffix('\n')
        .unwrap_or(source)
        .split('\n')
        .filter(move |_| !empty)
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}

/// The block parser. Lives for exactly one document.
struct Parser<'a> {
    state: ParserState,
    out: &'a mut HtmlBuffer,

    /// Scratch space for the inline-formatted form of the current line.
    formatted: HtmlBuffer,
}

impl<'a> Parser<'a> {
    fn new(out: &'a mut HtmlBuffer) -> Parser<'a> {
        Parser {
            state: ParserState::default(),
            out,
            formatted: HtmlBuffer::new(),
        }
    }

    fn line(&mut self, line: &str) -> Result<()> {
        let escaped = resolve_escapes(line);
        self.formatted.reset();
        format_line(&escaped, &mut self.state, &mut self.formatted)?;

        // Classification looks at the formatted line, so `**x**` is a
        // paragraph that starts with `<strong>`.
        let formatted = std::mem::take(&mut self.formatted);
        let result = if escaped.starts_literal() {
            self.paragraph(formatted.as_str())
        } else {
            self.block(formatted.as_str())
        };
        self.formatted = formatted;
        result
    }

    fn block(&mut self, line: &str) -> Result<()> {
        let bytes = line.as_bytes();
        if bytes.first() == Some(&b'#') {
            self.heading(line)
        } else if let Some(item) = line.strip_prefix("- ") {
            self.unordered_item(item)
        } else if bytes.len() >= 2 && bytes[0].is_ascii_digit() && bytes[1] == b'.' {
            self.ordered_item(skip_space(&line[2..]))
        } else if let Some(quoted) = line.strip_prefix('>') {
            self.blockquote(skip_space(quoted))
        } else if line.is_empty() {
            self.out.append("<br>\n")
        } else {
            self.paragraph(line)
        }
    }

    fn heading(&mut self, line: &str) -> Result<()> {
        let hashes = line.bytes().take_while(|b| *b == b'#').count();
        let level = hashes.min(MAX_HEADING_LEVEL);
        let content = skip_space(&line[hashes..]);
        self.out.append(&format!("<h{}>{}</h{}>\n", level, content, level))
    }

    fn unordered_item(&mut self, item: &str) -> Result<()> {
        if self.state.ordered_list {
            self.out.append("</ol>")?;
            self.state.ordered_list = false;
        }
        if !self.state.unordered_list {
            self.out.append("<ul>")?;
            self.state.unordered_list = true;
        }
        self.list_item(item)
    }

    fn ordered_item(&mut self, item: &str) -> Result<()> {
        if self.state.unordered_list {
            self.out.append("</ul>")?;
            self.state.unordered_list = false;
        }
        if !self.state.ordered_list {
            self.out.append("<ol>")?;
            self.state.ordered_list = true;
        }
        self.list_item(item)
    }

    fn list_item(&mut self, item: &str) -> Result<()> {
        self.out.append("<li>")?;
        self.out.append(item)?;
        self.out.append("</li>")
    }

    fn blockquote(&mut self, quoted: &str) -> Result<()> {
        if !self.state.blockquote {
            self.out.append("<blockquote>")?;
            self.state.blockquote = true;
        }
        self.out.append("<p>")?;
        self.out.append(quoted)?;
        self.out.append("</p>\n")
    }

    fn paragraph(&mut self, line: &str) -> Result<()> {
        self.close_blocks()?;
        self.out.append("<p>")?;
        self.out.append(line)?;
        self.out.append("</p>\n")
    }

    fn close_blocks(&mut self) -> Result<()> {
        if self.state.unordered_list {
            self.out.append("</ul>")?;
            self.state.unordered_list = false;
        }
        if self.state.ordered_list {
            self.out.append("</ol>")?;
            self.state.ordered_list = false;
        }
        if self.state.blockquote {
            self.out.append("</blockquote>")?;
            self.state.blockquote = false;
        }
        Ok(())
    }

    // Closes everything still open, in a fixed order: lists, bold, italic,
    // blockquote, code, underline.
    fn finish(mut self) -> Result<()> {
        if self.state.unordered_list {
            self.out.append("</ul>")?;
        }
        if self.state.ordered_list {
            self.out.append("</ol>")?;
        }
        for span in [Span::Bold, Span::Italic] {
            if self.state.is_open(span) {
                self.out.append(self.state.toggle(span))?;
            }
        }
        if self.state.blockquote {
            self.out.append("</blockquote>")?;
        }
        for span in [Span::Code, Span::Underline] {
            if self.state.is_open(span) {
                self.out.append(self.state.toggle(span))?;
            }
        }
        Ok(())
    }
}

fn skip_space(s: &str) -> &str {
    s.strip_prefix(' ').unwrap_or(s)
}
