//! The render orchestrator.

use std::time::Duration;

use rayon::prelude::*;

use fig_cache::{CacheKey, RenderCache};
use fig_registry::{DiagramType, Resolver, default_types};
use fig_remote::{Pipeline, PipelineError, RenderRequest, Transport, UreqTransport};

use crate::consts::{
    DEFAULT_CACHE_ENTRIES, DEFAULT_CACHE_MAX_AGE, DEFAULT_RETRY_COUNT, DEFAULT_RETRY_DELAY,
    DEFAULT_TIMEOUT,
};

/// Caller-supplied options for a render call.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Desired output format; an inline `{format: ...}` override wins.
    pub format: String,
    /// Skip both the cache read and the cache write.
    pub no_cache: bool,
    /// Optional document-scope discriminator for the cache key.
    pub scope: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: "svg".to_owned(),
            no_cache: false,
            scope: None,
        }
    }
}

/// Terminal rendering failure surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The diagram type is not registered (or is disabled).
    #[error("unknown diagram type: {0}")]
    UnknownType(String),
    /// The request pipeline failed after retries and fallback.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl RenderError {
    /// HTTP status carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Pipeline(e) => e.status(),
            Self::UnknownType(_) => None,
        }
    }
}

/// One code block in a batched render.
#[derive(Debug, Clone)]
pub struct BlockRequest {
    /// Caller-side position, echoed back in results.
    pub index: usize,
    /// Raw code block text.
    pub source: String,
    /// The fence's language tag, options included.
    pub language_tag: String,
}

/// Successfully rendered block.
#[derive(Debug)]
pub struct RenderedBlock {
    pub index: usize,
    pub content: String,
}

/// Per-block rendering error.
#[derive(Debug, thiserror::Error)]
#[error("block {index}: {error}")]
pub struct BlockError {
    pub index: usize,
    pub error: RenderError,
}

/// Result of a batched render with partial failures.
#[derive(Debug)]
pub struct PartialRender {
    /// Successfully rendered blocks.
    pub rendered: Vec<RenderedBlock>,
    /// Indexes of blocks whose tag is not a diagram.
    pub skipped: Vec<usize>,
    /// Errors for blocks that failed to render.
    pub errors: Vec<BlockError>,
}

/// Orchestrates resolver → cache → pipeline for render calls.
///
/// Configure with builder methods:
///
/// ```ignore
/// let renderer = Renderer::new("https://kroki.io")
///     .timeout(Duration::from_secs(60))
///     .retries(3, Duration::from_millis(500));
/// ```
pub struct Renderer {
    server: String,
    resolver: Resolver,
    cache: RenderCache,
    pipeline: Pipeline,
    /// Set once a transport is injected; `timeout` then leaves it alone.
    custom_transport: bool,
    headers: Vec<(String, String)>,
    retry_count: u32,
    retry_delay: Duration,
}

impl Renderer {
    /// Create a renderer for the given service base URL with the default
    /// type table, cache bounds and transport.
    #[must_use]
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server: server_url.into(),
            resolver: Resolver::new(default_types()),
            cache: RenderCache::new(DEFAULT_CACHE_ENTRIES, DEFAULT_CACHE_MAX_AGE),
            pipeline: Pipeline::new(Box::new(UreqTransport::new(DEFAULT_TIMEOUT))),
            custom_transport: false,
            headers: Vec::new(),
            retry_count: DEFAULT_RETRY_COUNT,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Replace the HTTP transport (tests inject mocks here).
    ///
    /// An injected transport owns its own timing configuration;
    /// [`timeout`](Self::timeout) no longer applies afterwards.
    #[must_use]
    pub fn with_transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.pipeline = Pipeline::new(transport);
        self.custom_transport = true;
        self
    }

    /// Replace the diagram type table.
    #[must_use]
    pub fn with_types(mut self, table: Vec<DiagramType>) -> Self {
        self.resolver = Resolver::new(table);
        self
    }

    /// Set the per-attempt HTTP timeout by rebuilding the default
    /// transport. A transport injected via
    /// [`with_transport`](Self::with_transport) is kept as-is.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        if !self.custom_transport {
            self.pipeline = Pipeline::new(Box::new(UreqTransport::new(timeout)));
        }
        self
    }

    /// Set retry attempts per strategy and the base backoff delay.
    #[must_use]
    pub fn retries(mut self, count: u32, delay: Duration) -> Self {
        self.retry_count = count;
        self.retry_delay = delay;
        self
    }

    /// Set custom headers merged into every service request.
    #[must_use]
    pub fn headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    /// Set the cache capacity and age bounds.
    #[must_use]
    pub fn cache_limits(mut self, max_entries: usize, max_age: Duration) -> Self {
        self.cache = RenderCache::new(max_entries, max_age);
        self
    }

    /// Rebuild the resolver from a changed registration table.
    pub fn set_types(&mut self, table: Vec<DiagramType>) {
        self.resolver.set_table(table);
    }

    /// The render cache, for stats, pruning and invalidation.
    #[must_use]
    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    /// All language tags currently recognized, sorted.
    #[must_use]
    pub fn known_tags(&self) -> Vec<&str> {
        self.resolver.known_tags()
    }

    /// Render one code block.
    ///
    /// Returns `Ok(None)` when the language tag is not a recognized
    /// diagram — the block is simply not ours to render.
    pub fn render(
        &self,
        source: &str,
        language_tag: &str,
        options: &RenderOptions,
    ) -> Result<Option<String>, RenderError> {
        let Some(resolved) = self.resolver.resolve(language_tag) else {
            return Ok(None);
        };

        let format = resolve_format(resolved.options.get("format"), &options.format);
        let content = self.render_resolved(source, &resolved.diagram_type, &format, options)?;
        Ok(Some(content))
    }

    /// Render a block whose diagram type is already known.
    ///
    /// # Errors
    ///
    /// Fails with [`RenderError::UnknownType`] when `diagram_type` is not
    /// a registered, enabled canonical id.
    pub fn render_by_type(
        &self,
        source: &str,
        diagram_type: &str,
        options: &RenderOptions,
    ) -> Result<String, RenderError> {
        self.render_resolved(source, diagram_type, &options.format, options)
    }

    /// Render a batch of independent code blocks in parallel, collecting
    /// partial results. A failed block never aborts the batch.
    #[must_use]
    pub fn render_many(&self, blocks: &[BlockRequest], options: &RenderOptions) -> PartialRender {
        let results: Vec<(usize, Result<Option<String>, RenderError>)> = blocks
            .par_iter()
            .map(|block| {
                (
                    block.index,
                    self.render(&block.source, &block.language_tag, options),
                )
            })
            .collect();

        let mut partial = PartialRender {
            rendered: Vec::new(),
            skipped: Vec::new(),
            errors: Vec::new(),
        };
        for (index, result) in results {
            match result {
                Ok(Some(content)) => partial.rendered.push(RenderedBlock { index, content }),
                Ok(None) => partial.skipped.push(index),
                Err(error) => partial.errors.push(BlockError { index, error }),
            }
        }
        partial
    }

    /// Resolve → cache → pipeline for a known canonical type.
    fn render_resolved(
        &self,
        source: &str,
        diagram_type: &str,
        format: &str,
        options: &RenderOptions,
    ) -> Result<String, RenderError> {
        let registration = self
            .resolver
            .registration(diagram_type)
            .ok_or_else(|| RenderError::UnknownType(diagram_type.to_owned()))?;

        let mut key = CacheKey::new(source, diagram_type, format);
        if let Some(scope) = &options.scope {
            key = key.scoped(scope);
        }

        if !options.no_cache
            && let Some(hit) = self.cache.get(&key)
        {
            tracing::debug!(fingerprint = %key.fingerprint(), "render cache hit");
            return Ok(hit);
        }

        let request = RenderRequest {
            server: self.server.clone(),
            endpoint: registration.endpoint.clone(),
            format: format.to_owned(),
            source: source.to_owned(),
            headers: self.headers.clone(),
            retry_count: self.retry_count,
            retry_delay: self.retry_delay,
        };
        let rendered = self.pipeline.render(&request)?;
        let content = rendered.payload.into_content();

        // Only successes populate the cache; failures already returned
        if !options.no_cache {
            self.cache.set(key, content.clone());
        }
        Ok(content)
    }
}

/// Apply the inline format override, falling back on unknown values.
fn resolve_format(inline: Option<&str>, default: &str) -> String {
    match inline {
        Some(value @ ("svg" | "png")) => value.to_owned(),
        Some(other) => {
            tracing::warn!("unknown inline format value '{other}', using '{default}'");
            default.to_owned()
        }
        None => default.to_owned(),
    }
}
