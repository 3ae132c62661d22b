//! Language tag resolution.
//!
//! A [`Resolver`] owns the registry table and a flat [`AliasMap`] rebuilt
//! from it. The map is a full replacement on every rebuild; no stale
//! entries survive a table change. Alias collisions resolve
//! last-write-wins over table order — a known sharp edge, kept
//! deliberately.

use std::collections::HashMap;

use crate::types::DiagramType;

/// Inline per-block options parsed from a language tag.
///
/// The tag grammar is `ident` or `ident{key: value, key: value}`.
/// A malformed option block degrades to an empty option set; it never
/// prevents the base identifier from resolving.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockOptions {
    entries: HashMap<String, String>,
}

impl BlockOptions {
    /// Look up an option value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Whether any options were parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of parsed options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Result of resolving a language tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Canonical diagram type identifier.
    pub diagram_type: String,
    /// Inline options parsed from the tag.
    pub options: BlockOptions,
}

/// Flat case-sensitive map from every recognized tag to its canonical id.
#[derive(Debug, Default)]
pub struct AliasMap {
    map: HashMap<String, String>,
}

impl AliasMap {
    /// Build the map from a registration table.
    ///
    /// Every enabled registration contributes its canonical id, its
    /// editor-facing tag, and each of its aliases. Later entries in the
    /// table overwrite earlier ones on collision (last write wins).
    /// Disabled registrations contribute nothing.
    #[must_use]
    pub fn build(table: &[DiagramType]) -> Self {
        let mut map = HashMap::new();
        for reg in table.iter().filter(|r| r.enabled) {
            map.insert(reg.id.clone(), reg.id.clone());
            map.insert(reg.tag.clone(), reg.id.clone());
            for alias in &reg.aliases {
                map.insert(alias.clone(), reg.id.clone());
            }
        }
        Self { map }
    }

    /// Canonical id for a tag, if recognized.
    #[must_use]
    pub fn lookup(&self, tag: &str) -> Option<&str> {
        self.map.get(tag).map(String::as_str)
    }

    /// All recognized tags, sorted for deterministic introspection.
    #[must_use]
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.map.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

/// Language tag resolver over a registration table.
pub struct Resolver {
    table: Vec<DiagramType>,
    aliases: AliasMap,
}

impl Resolver {
    /// Create a resolver, building the alias map from `table`.
    #[must_use]
    pub fn new(table: Vec<DiagramType>) -> Self {
        let aliases = AliasMap::build(&table);
        Self { table, aliases }
    }

    /// Replace the registration table and rebuild the alias map.
    pub fn set_table(&mut self, table: Vec<DiagramType>) {
        self.aliases = AliasMap::build(&table);
        self.table = table;
    }

    /// The current registration table.
    #[must_use]
    pub fn table(&self) -> &[DiagramType] {
        &self.table
    }

    /// Registration for a canonical id, if present and enabled.
    #[must_use]
    pub fn registration(&self, id: &str) -> Option<&DiagramType> {
        self.table.iter().find(|r| r.enabled && r.id == id)
    }

    /// Resolve a language tag to a canonical type and inline options.
    ///
    /// Returns `None` when the base identifier is not a recognized tag —
    /// the code block is simply not a diagram.
    #[must_use]
    pub fn resolve(&self, language_tag: &str) -> Option<Resolved> {
        let (base, options) = split_tag(language_tag);
        let diagram_type = self.aliases.lookup(base)?.to_owned();
        Some(Resolved {
            diagram_type,
            options,
        })
    }

    /// The complete set of currently recognized tags, sorted.
    #[must_use]
    pub fn known_tags(&self) -> Vec<&str> {
        self.aliases.tags()
    }
}

/// Split a language tag into its base identifier and option block.
///
/// Grammar: `<ident>` or `<ident>{<opts>}` where `<opts>` is a
/// comma-separated list of `key:value` pairs, both sides trimmed.
fn split_tag(tag: &str) -> (&str, BlockOptions) {
    let tag = tag.trim();
    let Some(open) = tag.find('{') else {
        return (tag, BlockOptions::default());
    };
    let base = tag[..open].trim_end();
    let rest = &tag[open..];
    (base, parse_options(rest).unwrap_or_default())
}

/// Parse an `{k:v, k:v}` option block.
///
/// Returns `None` on any malformed input: missing closing brace, trailing
/// garbage, a pair without `:`, or an empty key.
fn parse_options(block: &str) -> Option<BlockOptions> {
    let inner = block.strip_prefix('{')?.strip_suffix('}')?;
    let mut entries = HashMap::new();
    for pair in inner.split(',') {
        if pair.trim().is_empty() {
            continue;
        }
        let (key, value) = pair.split_once(':')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        entries.insert(key.to_owned(), value.trim().to_owned());
    }
    Some(BlockOptions { entries })
}
