//! Diagram type registrations.
//!
//! Each [`DiagramType`] describes one rendering target of the remote
//! service. The table returned by [`default_types`] is the single source
//! of truth consumed by the resolver and by any host integration that
//! decides which language tags to watch for.

use serde::{Deserialize, Serialize};

/// One entry in the diagram type registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramType {
    /// Canonical identifier, stable across renames.
    pub id: String,
    /// Human-readable name for UI surfaces.
    pub name: String,
    /// Service-side type name used in request URLs.
    pub endpoint: String,
    /// Editor-facing language tag.
    pub tag: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Documentation URL for the diagram grammar.
    #[serde(default)]
    pub docs_url: String,
    /// Whether this type participates in resolution.
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    /// Additional language tags that resolve to this type.
    #[serde(default)]
    pub aliases: Vec<String>,
}

fn enabled_default() -> bool {
    true
}

impl DiagramType {
    /// Create an enabled registration whose endpoint and tag equal its id.
    #[must_use]
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_owned(),
            name: name.to_owned(),
            endpoint: id.to_owned(),
            tag: id.to_owned(),
            description: String::new(),
            docs_url: String::new(),
            enabled: true,
            aliases: Vec::new(),
        }
    }

    /// Set the service-side endpoint name.
    #[must_use]
    pub fn endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_owned();
        self
    }

    /// Set the documentation URL.
    #[must_use]
    pub fn docs_url(mut self, url: &str) -> Self {
        self.docs_url = url.to_owned();
        self
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }

    /// Add extra aliases.
    #[must_use]
    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| (*a).to_owned()).collect();
        self
    }

    /// Set the enabled flag.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Built-in registry table covering the common service endpoints.
#[must_use]
pub fn default_types() -> Vec<DiagramType> {
    vec![
        DiagramType::new("plantuml", "PlantUML")
            .description("UML diagrams from the PlantUML grammar")
            .docs_url("https://plantuml.com")
            .aliases(&["puml", "uml"]),
        DiagramType::new("c4plantuml", "C4 with PlantUML")
            .description("C4 architecture diagrams")
            .docs_url("https://github.com/plantuml-stdlib/C4-PlantUML")
            .aliases(&["c4"]),
        DiagramType::new("mermaid", "Mermaid")
            .docs_url("https://mermaid.js.org"),
        DiagramType::new("graphviz", "GraphViz")
            .docs_url("https://graphviz.org")
            .aliases(&["dot"]),
        DiagramType::new("ditaa", "Ditaa").docs_url("https://ditaa.sourceforge.net"),
        DiagramType::new("blockdiag", "BlockDiag").docs_url("http://blockdiag.com"),
        DiagramType::new("seqdiag", "SeqDiag").docs_url("http://blockdiag.com"),
        DiagramType::new("actdiag", "ActDiag").docs_url("http://blockdiag.com"),
        DiagramType::new("nwdiag", "NwDiag").docs_url("http://blockdiag.com"),
        DiagramType::new("erd", "Erd").docs_url("https://github.com/BurntSushi/erd"),
        DiagramType::new("nomnoml", "Nomnoml").docs_url("https://nomnoml.com"),
        DiagramType::new("svgbob", "Svgbob")
            .docs_url("https://github.com/ivanceras/svgbob"),
        DiagramType::new("vega", "Vega").docs_url("https://vega.github.io/vega"),
        DiagramType::new("vegalite", "Vega-Lite")
            .docs_url("https://vega.github.io/vega-lite"),
        DiagramType::new("wavedrom", "WaveDrom").docs_url("https://wavedrom.com"),
    ]
}
