//! Source encoding and the resilient request pipeline for fig.
//!
//! This crate owns everything between diagram source text and a rendered
//! payload from the remote service:
//!
//! - [`encoder`]: deterministic source → URL-safe compressed token
//! - [`transport`]: the [`Transport`] seam and its [`UreqTransport`]
//!   production implementation
//! - [`pipeline`]: GET-first/POST-fallback strategy with per-strategy
//!   retry and exponential backoff, normalizing every response shape to
//!   a single [`Rendered`] type
//!
//! The pipeline performs no side effects beyond the network call itself;
//! caching is the orchestrator's concern (`fig-render`).

pub mod encoder;
pub mod pipeline;
pub mod transport;

pub use encoder::{EncodeError, encode};
pub use pipeline::{Payload, Pipeline, PipelineError, RenderRequest, Rendered};
pub use transport::{
    Method, Transport, TransportError, TransportRequest, TransportResponse, UreqTransport,
};
