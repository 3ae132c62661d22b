//! Diagram type registry and language tag resolution for fig.
//!
//! This crate owns the table of diagram types the rendering service
//! understands and the mapping from code-fence language tags to canonical
//! type identifiers:
//!
//! - [`DiagramType`]: one registry entry (canonical id, endpoint, tag,
//!   aliases, enabled flag)
//! - [`default_types`]: the built-in registry table
//! - [`Resolver`]: language tag → canonical type + inline block options
//! - [`AliasMap`]: the flat alias lookup, rebuilt from the table
//!
//! # Example
//!
//! ```
//! use fig_registry::{Resolver, default_types};
//!
//! let resolver = Resolver::new(default_types());
//! let resolved = resolver.resolve("plantuml{format: png}").unwrap();
//! assert_eq!(resolved.diagram_type, "plantuml");
//! assert_eq!(resolved.options.get("format"), Some("png"));
//! ```

mod resolver;
mod types;

pub use resolver::{AliasMap, BlockOptions, Resolved, Resolver};
pub use types::{DiagramType, default_types};
