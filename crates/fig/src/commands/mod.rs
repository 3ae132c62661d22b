//! CLI command implementations.

pub(crate) mod export;
pub(crate) mod render;
pub(crate) mod types;

pub(crate) use export::ExportArgs;
pub(crate) use render::RenderArgs;
pub(crate) use types::TypesArgs;
