//! Render orchestration for fig.
//!
//! [`Renderer`] composes the three core subsystems into a single
//! "render this code block" operation:
//!
//! 1. resolve the language tag (`fig-registry`) — an unrecognized tag is
//!    the `Ok(None)` sentinel, not an error
//! 2. consult the render cache (`fig-cache`) under the composite key
//! 3. on miss, drive the request pipeline (`fig-remote`) and populate
//!    the cache with the successful result
//!
//! Failures are never cached and always propagate as typed errors; a
//! failed block degrades locally and must not abort a surrounding
//! document pass ([`Renderer::render_many`] collects per-block results).
//!
//! # Example
//!
//! ```ignore
//! use fig_render::{RenderOptions, Renderer};
//!
//! let renderer = Renderer::new("https://kroki.io");
//! let options = RenderOptions::default();
//! match renderer.render("A->B", "plantuml", &options)? {
//!     Some(content) => println!("{content}"),
//!     None => println!("not a diagram block"),
//! }
//! ```

mod consts;
mod renderer;

pub use consts::{
    DEFAULT_CACHE_ENTRIES, DEFAULT_CACHE_MAX_AGE, DEFAULT_RETRY_COUNT, DEFAULT_RETRY_DELAY,
    DEFAULT_TIMEOUT,
};
pub use renderer::{
    BlockError, BlockRequest, PartialRender, RenderError, RenderOptions, RenderedBlock, Renderer,
};
