//! Cache key computation.

use sha2::{Digest, Sha256};

/// Composite key for a rendered diagram.
///
/// Two requests with identical source, type and format collide to the
/// same key regardless of surrounding document context, unless a `scope`
/// discriminator is set explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Raw diagram source text.
    pub source: String,
    /// Canonical diagram type identifier.
    pub diagram_type: String,
    /// Output format ("svg", "png", ...).
    pub format: String,
    /// Optional document-scope discriminator.
    pub scope: Option<String>,
}

impl CacheKey {
    /// Create a key without a document scope.
    #[must_use]
    pub fn new(source: &str, diagram_type: &str, format: &str) -> Self {
        Self {
            source: source.to_owned(),
            diagram_type: diagram_type.to_owned(),
            format: format.to_owned(),
            scope: None,
        }
    }

    /// Attach a document-scope discriminator.
    #[must_use]
    pub fn scoped(mut self, scope: &str) -> Self {
        self.scope = Some(scope.to_owned());
        self
    }

    /// Content hash of this key, for logging and file naming.
    ///
    /// SHA-256 of `"{type}:{format}:{scope}:{source}"`, hex-encoded.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let scope = self.scope.as_deref().unwrap_or("");
        let content = format!(
            "{}:{}:{}:{}",
            self.diagram_type, self.format, scope, self.source
        );
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }
}
