//! Core domain types for the node documentation corpus.

use serde::{Deserialize, Serialize};

/// Current schema version for `manifest.json` and `positions.json`.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// NodeRecord (input)
// ---------------------------------------------------------------------------

/// Structural flags carried by every node record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeFlags {
    pub is_trigger: bool,
    pub is_webhook: bool,
    pub is_ai_tool: bool,
    pub has_credentials: bool,
    pub has_operations: bool,
}

/// One configurable parameter of a node, already parsed upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeProperty {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Parameter type as published by the catalog (`string`, `options`, ...).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// One operation a node exposes (e.g. `message: send`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeOperation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A node definition as produced by the upstream catalog.
///
/// Immutable once loaded. Optional catalog fields are explicit and defaulted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Namespace-qualified identity, e.g. `n8n-nodes-base.httpRequest`.
    pub node_type: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Human-readable category hint from the catalog (e.g. `Communication`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(flatten)]
    pub flags: NodeFlags,
    /// Whether the catalog ships full documentation for this node.
    #[serde(default)]
    pub has_documentation: bool,
    /// Pre-extracted documentation text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<NodeProperty>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<NodeOperation>,
}

/// Segment after the final `.` of an identity, case preserved.
pub fn type_segment(identity: &str) -> &str {
    identity.rsplit('.').next().unwrap_or(identity)
}

impl NodeRecord {
    /// Minimal record, mostly useful for tests and fixtures.
    pub fn new(node_type: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// True when the record has a non-blank description.
    pub fn has_description(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }

    /// The trailing type segment after the final `.` (case preserved).
    pub fn type_name(&self) -> &str {
        type_segment(&self.node_type)
    }

    /// File stem used for the node's individual document.
    pub fn file_stem(&self) -> String {
        self.node_type.replace('@', "").replace('/', "-")
    }

    /// Display name collapsed onto one line, as used in headings and links.
    ///
    /// Every whitespace run, including line breaks, becomes a single space.
    pub fn heading_name(&self) -> String {
        self.display_name.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

// ---------------------------------------------------------------------------
// Scoring and tiers
// ---------------------------------------------------------------------------

/// The four importance factors, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorScores {
    pub usage: f64,
    pub documentation: f64,
    pub popularity: f64,
    pub versatility: f64,
}

/// Rank-based tier assigned by position against configured caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Essential,
    Common,
    Specialized,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Essential, Tier::Common, Tier::Specialized];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Essential => "essential",
            Self::Common => "common",
            Self::Specialized => "specialized",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node record with its importance score, rank and tier.
#[derive(Debug, Clone)]
pub struct ScoredNode {
    pub record: NodeRecord,
    pub factors: FactorScores,
    /// Weighted total in `[0, 1]`.
    pub score: f64,
    /// 1-based, unique and dense.
    pub rank: usize,
    pub tier: Tier,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// A node matched against the category rule table.
#[derive(Debug, Clone)]
pub struct CategorizedNode {
    pub record: NodeRecord,
    pub category: String,
    pub subcategory: Option<String>,
    /// Lower is more important.
    pub priority: u32,
    pub is_top: bool,
}

impl CategorizedNode {
    /// `category` or `category.subcategory` when a subcategory is present.
    pub fn group_key(&self) -> String {
        match &self.subcategory {
            Some(sub) => format!("{}.{sub}", self.category),
            None => self.category.clone(),
        }
    }
}

/// Keyword-derived usage bucket. Independent of [`Tier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageFrequency {
    Essential,
    Common,
    Specialized,
}

impl UsageFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Essential => "essential",
            Self::Common => "common",
            Self::Specialized => "specialized",
        }
    }
}

/// Free-form structural tags derived from node flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeTag {
    Trigger,
    Webhook,
    Ai,
    RequiresAuth,
    MultiOperation,
}

impl NodeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Webhook => "webhook",
            Self::Ai => "ai",
            Self::RequiresAuth => "requires-auth",
            Self::MultiOperation => "multi-operation",
        }
    }
}

/// A node with its functional groups and related nodes.
#[derive(Debug, Clone)]
pub struct GroupedNode {
    pub record: NodeRecord,
    pub usage: UsageFrequency,
    /// Functional-group tags in rule order. Never empty.
    pub groups: Vec<String>,
    /// Up to five related node identities, in input order.
    pub related: Vec<String>,
    pub tags: Vec<NodeTag>,
}

/// Kind of an explicit pairwise relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipKind {
    Alternative,
    Complement,
    Prerequisite,
    Successor,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alternative => "alternative",
            Self::Complement => "complement",
            Self::Prerequisite => "prerequisite",
            Self::Successor => "successor",
        }
    }
}

/// A relationship whose endpoints were both found among the input nodes.
#[derive(Debug, Clone, Serialize)]
pub struct Relationship {
    /// Identity of the first node matching the rule's `from` endpoint.
    pub source: String,
    /// Identity of the first node matching the rule's `to` endpoint.
    pub target: String,
    pub kind: RelationshipKind,
    pub rationale: String,
}

// ---------------------------------------------------------------------------
// Packaging
// ---------------------------------------------------------------------------

/// Everything known about one categorized node, joined for packaging.
#[derive(Debug, Clone)]
pub struct CorpusNode {
    pub record: NodeRecord,
    pub category: String,
    pub subcategory: Option<String>,
    pub priority: u32,
    pub is_top: bool,
    pub factors: FactorScores,
    pub score: f64,
    pub rank: usize,
    pub tier: Tier,
    pub usage: UsageFrequency,
    pub groups: Vec<String>,
    pub related: Vec<String>,
    pub tags: Vec<NodeTag>,
}

impl CorpusNode {
    /// Usage factor expressed as a percentage of the busiest node.
    pub fn usage_percentage(&self) -> f64 {
        self.factors.usage * 100.0
    }
}

/// Where one node's content lives inside a merged file.
///
/// Invariant: `end_line == start_line + line_count - 1`, lines are 1-based
/// and inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub node_type: String,
    pub display_name: String,
    pub file_name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub line_count: usize,
    pub anchor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_percentage: Option<f64>,
}

/// One generated merged file and the positions of the nodes inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedFileInfo {
    pub file_name: String,
    pub category: String,
    pub node_count: usize,
    pub positions: Vec<NodePosition>,
}

impl MergedFileInfo {
    /// Path relative to the corpus root (`{category}/{file_name}`).
    pub fn relative_path(&self) -> String {
        format!("{}/{}", self.category, self.file_name)
    }
}

/// Reference to a node that received its own document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndividualFileRef {
    pub node_type: String,
    pub display_name: String,
    /// Path relative to the corpus root.
    pub path: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// `positions.json`: the machine-readable line-offset table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionTable {
    pub schema_version: u32,
    pub merged_files: Vec<MergedFileInfo>,
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// A file written during a corpus build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestFile {
    /// Path relative to the corpus root.
    pub path: String,
    pub sha256: String,
    pub size_bytes: usize,
}

/// `manifest.json` stored at the corpus root. Carries no timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusManifest {
    pub schema_version: u32,
    pub tool_version: String,
    pub node_count: usize,
    pub individual_count: usize,
    pub merged_count: usize,
    pub uncategorized_count: usize,
    pub files: Vec<ManifestFile>,
}
