//! The library code for the `folio` static site generator. The architecture
//! can be generally broken down into two distinct steps:
//!
//! 1. Parsing posts from source files on disk ([`crate::parser`]), which
//!    renders their Markdown bodies ([`crate::markdown`])
//! 2. Assembling and writing the output pages ([`crate::build`])
//!
//! The Markdown dialect is small and line oriented. Inline spans toggle on
//! and off ([`crate::inline`]) and block structure is decided one line at a
//! time ([`crate::markdown`]).
//!
//! Pages are assembled from plain HTML templates with `{TOKEN}`
//! placeholders and `LOOP`/`IF` comment regions ([`crate::template`]). Each
//! kind of output page has its own assembler: post pages ([`crate::page`]),
//! the paginated index ([`crate::index`]), the scroll ([`crate::scroll`]),
//! tag pages ([`crate::tagindex`]), and the Atom feed ([`crate::feed`]).
//!
//! New sites are scaffolded by [`crate::scaffold`].

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod buffer;
pub mod build;
pub mod config;
pub mod feed;
pub mod html;
pub mod index;
pub mod inline;
pub mod markdown;
pub mod page;
pub mod parser;
pub mod post;
pub mod scaffold;
pub mod scroll;
pub mod tag;
pub mod tagindex;
pub mod template;
pub mod write;

pub use markdown::render_markdown;
pub use template::{expand_template, RenderContext};
