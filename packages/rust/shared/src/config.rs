//! Configuration for nodedocs.
//!
//! Three documents feed a run:
//! - the application config at `~/.nodedocs/nodedocs.toml` (output layout,
//!   cutoffs, paths to the other two documents)
//! - the category document (category table plus grouping rule tables)
//! - the priority document (tier caps, scoring weights, popularity lists)
//!
//! The category and priority documents have built-in defaults. When a path is
//! configured explicitly, a missing or malformed file is fatal.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NodeDocsError, Result};
use crate::types::{NodeFlags, RelationshipKind};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "nodedocs.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".nodedocs";

/// Built-in category table.
const BUILTIN_CATEGORIES: &str = include_str!("../defaults/categories.toml");

/// Tolerance when checking that scoring weights do not exceed 1.0.
const WEIGHT_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Application config (nodedocs.toml)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Locations of the category and priority documents.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Externally supplied packages listed in their own index section.
    #[serde(default)]
    pub auxiliary_packages: Vec<AuxiliaryPackage>,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Corpus output directory.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// How many categorized nodes get individual files regardless of tier.
    #[serde(default = "default_top_nodes")]
    pub top_nodes: usize,

    /// Maximum nodes per merged file before it is split into parts.
    #[serde(default = "default_merged_file_cap")]
    pub merged_file_cap: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            top_nodes: default_top_nodes(),
            merged_file_cap: default_merged_file_cap(),
        }
    }
}

fn default_output_dir() -> String {
    "node-docs".into()
}
fn default_top_nodes() -> usize {
    50
}
fn default_merged_file_cap() -> usize {
    100
}

/// `[paths]` section. Unset paths fall back to the built-in documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priorities: Option<PathBuf>,
}

/// `[[auxiliary_packages]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuxiliaryPackage {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub node_count: usize,
}

// ---------------------------------------------------------------------------
// Category document
// ---------------------------------------------------------------------------

/// The category table plus the functional grouping rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Categories in canonical order.
    #[serde(default)]
    pub categories: Vec<CategoryDefinition>,

    #[serde(default)]
    pub grouping: GroupingRules,
}

/// One `[[categories]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDefinition {
    /// Directory-safe key, e.g. `communication`.
    pub key: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// Lower is more important.
    #[serde(default = "default_priority")]
    pub priority: u32,
    /// Type names that belong to the category without a subcategory.
    #[serde(default)]
    pub nodes: Vec<String>,
    /// Subcategory key to type names.
    #[serde(default)]
    pub subcategories: BTreeMap<String, Vec<String>>,
}

fn default_priority() -> u32 {
    100
}

impl CategoryConfig {
    /// The category table embedded in the binary, with default grouping rules.
    pub fn builtin() -> Result<Self> {
        parse_category_config(BUILTIN_CATEGORIES, Path::new("<builtin>"))
    }

    /// Look up a category definition by key.
    pub fn category(&self, key: &str) -> Option<&CategoryDefinition> {
        self.categories.iter().find(|c| c.key == key)
    }

    /// Display name for a category key, falling back to the key itself.
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.category(key)
            .map(|c| c.display_name.as_str())
            .unwrap_or(key)
    }

    /// Check keys are unique and usable as directory names.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for category in &self.categories {
            let key = category.key.as_str();
            if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
                return Err(NodeDocsError::config(format!(
                    "category key '{key}' is not a valid directory name"
                )));
            }
            if !seen.insert(key) {
                return Err(NodeDocsError::config(format!(
                    "category key '{key}' is defined twice"
                )));
            }
        }
        Ok(())
    }
}

/// `[grouping]` section: rule tables for the functional grouper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupingRules {
    /// Checked first against the lower-cased identity.
    #[serde(default = "default_essential_keywords")]
    pub essential_keywords: Vec<String>,

    /// Checked when no essential keyword matched.
    #[serde(default = "default_common_keywords")]
    pub common_keywords: Vec<String>,

    /// Ordered functional-group rules.
    #[serde(default = "default_functional_groups")]
    pub functional_groups: Vec<FunctionalGroupRule>,

    /// Tag force-assigned to nodes matching no rule.
    #[serde(default = "default_fallback_group")]
    pub fallback_group: String,

    /// Explicit pairwise relationships.
    #[serde(default = "default_relationships")]
    pub relationships: Vec<RelationshipRule>,
}

impl Default for GroupingRules {
    fn default() -> Self {
        Self {
            essential_keywords: default_essential_keywords(),
            common_keywords: default_common_keywords(),
            functional_groups: default_functional_groups(),
            fallback_group: default_fallback_group(),
            relationships: default_relationships(),
        }
    }
}

/// A structural flag a functional-group rule can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagPredicate {
    Trigger,
    Webhook,
    AiTool,
    Credentials,
    Operations,
}

impl FlagPredicate {
    pub fn matches(&self, flags: &NodeFlags) -> bool {
        match self {
            Self::Trigger => flags.is_trigger,
            Self::Webhook => flags.is_webhook,
            Self::AiTool => flags.is_ai_tool,
            Self::Credentials => flags.has_credentials,
            Self::Operations => flags.has_operations,
        }
    }
}

/// One keyword-predicate rule assigning a functional-group tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionalGroupRule {
    pub tag: String,
    /// Lower-case substrings tested against identity and display name.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Any of these flags also matches.
    #[serde(default)]
    pub flags: Vec<FlagPredicate>,
}

/// One row of the explicit relationship table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipRule {
    /// Substring of a normalized identity.
    pub from: String,
    pub to: String,
    pub kind: RelationshipKind,
    pub rationale: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn default_essential_keywords() -> Vec<String> {
    strings(&[
        "httprequest",
        "webhook",
        "nodes-base.code",
        "nodes-base.set",
        "nodes-base.if",
        "nodes-base.switch",
        "nodes-base.merge",
        "scheduletrigger",
        "manualtrigger",
        "splitinbatches",
    ])
}

fn default_common_keywords() -> Vec<String> {
    strings(&[
        "slack",
        "gmail",
        "googlesheets",
        "notion",
        "airtable",
        "postgres",
        "mysql",
        "telegram",
        "discord",
        "openai",
        "github",
        "hubspot",
        "redis",
        "mongodb",
    ])
}

fn group(tag: &str, keywords: &[&str], flags: &[FlagPredicate]) -> FunctionalGroupRule {
    FunctionalGroupRule {
        tag: tag.to_string(),
        keywords: strings(keywords),
        flags: flags.to_vec(),
    }
}

fn default_functional_groups() -> Vec<FunctionalGroupRule> {
    vec![
        group(
            "communication",
            &[
                "slack", "gmail", "telegram", "discord", "teams", "email", "twilio", "mattermost",
                "whatsapp", "sms",
            ],
            &[],
        ),
        group(
            "productivity",
            &[
                "sheets", "notion", "airtable", "drive", "calendar", "trello", "asana", "clickup",
                "todoist", "excel", "docs",
            ],
            &[],
        ),
        group(
            "development",
            &[
                "github", "gitlab", "jira", "git", "code", "function", "executecommand", "ssh",
                "graphql", "jenkins", "httprequest",
            ],
            &[],
        ),
        group(
            "marketing",
            &[
                "hubspot", "mailchimp", "salesforce", "pipedrive", "activecampaign", "sendgrid",
                "facebook", "twitter", "linkedin",
            ],
            &[],
        ),
        group(
            "database",
            &["postgres", "mysql", "mongo", "redis", "supabase", "sql", "baserow", "database"],
            &[],
        ),
        group(
            "storage",
            &["s3", "ftp", "drive", "dropbox", "binaryfile", "file", "box"],
            &[],
        ),
        group(
            "ai",
            &[
                "openai", "anthropic", "agent", "lmchat", "embeddings", "vectorstore", "memory",
                "chain", "ollama", "gemini",
            ],
            &[FlagPredicate::AiTool],
        ),
        group(
            "automation",
            &["trigger", "webhook", "schedule", "cron", "interval", "workflow", "wait"],
            &[FlagPredicate::Trigger, FlagPredicate::Webhook],
        ),
        group(
            "analytics",
            &["analytics", "mixpanel", "segment", "posthog", "metabase", "grafana"],
            &[],
        ),
        group(
            "utility",
            &[
                "crypto", "datetime", "compression", "xml", "html", "markdown", "image", "filter",
                "sort", "limit",
            ],
            &[],
        ),
    ]
}

fn default_fallback_group() -> String {
    "utility".into()
}

fn relation(from: &str, to: &str, kind: RelationshipKind, rationale: &str) -> RelationshipRule {
    RelationshipRule {
        from: from.to_string(),
        to: to.to_string(),
        kind,
        rationale: rationale.to_string(),
    }
}

fn default_relationships() -> Vec<RelationshipRule> {
    use RelationshipKind::*;
    vec![
        relation(
            "httprequest",
            "graphql",
            Alternative,
            "Both call remote APIs; GraphQL sends typed queries, HTTP Request covers plain REST.",
        ),
        relation(
            "webhook",
            "respondtowebhook",
            Complement,
            "Respond to Webhook sends a custom reply to a request received by Webhook.",
        ),
        relation(
            "function",
            "code",
            Successor,
            "Code replaces the legacy Function node and supports both JavaScript and Python.",
        ),
        relation(
            "splitinbatches",
            "merge",
            Complement,
            "Merge recombines item streams that Split In Batches processed separately.",
        ),
        relation(
            "lmchatopenai",
            "agent",
            Prerequisite,
            "An AI Agent needs a chat model sub-node before it can run.",
        ),
        relation(
            "memorybufferwindow",
            "agent",
            Complement,
            "Window buffer memory lets an agent keep conversation context between runs.",
        ),
        relation(
            "scheduletrigger",
            "cron",
            Successor,
            "Schedule Trigger replaces the legacy Cron node.",
        ),
        relation(
            "googlesheets",
            "airtable",
            Alternative,
            "Both store tabular records; Airtable adds typed fields and linked tables.",
        ),
        relation(
            "postgres",
            "mysql",
            Alternative,
            "Both run SQL against a relational database; pick the one your stack uses.",
        ),
    ]
}

// ---------------------------------------------------------------------------
// Priority document
// ---------------------------------------------------------------------------

/// Tier caps, scoring weights and popularity tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriorityConfig {
    #[serde(default)]
    pub tiers: TierCaps,
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default)]
    pub popularity: PopularityConfig,
    #[serde(default)]
    pub versatility: VersatilityConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

impl PriorityConfig {
    /// Reject weights that could push a total score outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        let w = &self.weights;
        let all = [w.usage, w.documentation, w.popularity, w.versatility];
        if all.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(NodeDocsError::config(
                "scoring weights must be finite and non-negative",
            ));
        }
        let sum: f64 = all.iter().sum();
        if sum > 1.0 + WEIGHT_EPSILON {
            return Err(NodeDocsError::config(format!(
                "scoring weights sum to {sum:.3}, must not exceed 1.0"
            )));
        }
        for (name, score) in &self.popularity.category_scores {
            if !(0.0..=1.0).contains(score) {
                return Err(NodeDocsError::config(format!(
                    "category score for '{name}' must lie in [0, 1], got {score}"
                )));
            }
        }
        let default_score = self.popularity.default_score;
        if !(0.0..=1.0).contains(&default_score) {
            return Err(NodeDocsError::config(format!(
                "popularity default_score must lie in [0, 1], got {default_score}"
            )));
        }
        Ok(())
    }
}

/// `[tiers]` section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierCaps {
    #[serde(default = "default_essential_max")]
    pub essential_max: usize,
    #[serde(default = "default_common_max")]
    pub common_max: usize,
}

impl Default for TierCaps {
    fn default() -> Self {
        Self {
            essential_max: default_essential_max(),
            common_max: default_common_max(),
        }
    }
}

fn default_essential_max() -> usize {
    50
}
fn default_common_max() -> usize {
    150
}

/// `[weights]` section. The caller controls the sum; nothing is renormalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_usage_weight")]
    pub usage: f64,
    #[serde(default = "default_factor_weight")]
    pub documentation: f64,
    #[serde(default = "default_factor_weight")]
    pub popularity: f64,
    #[serde(default = "default_factor_weight")]
    pub versatility: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            usage: default_usage_weight(),
            documentation: default_factor_weight(),
            popularity: default_factor_weight(),
            versatility: default_factor_weight(),
        }
    }
}

fn default_usage_weight() -> f64 {
    0.4
}
fn default_factor_weight() -> f64 {
    0.2
}

/// `[popularity]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopularityConfig {
    #[serde(default = "default_essential_nodes")]
    pub essential: Vec<String>,
    #[serde(default = "default_common_nodes")]
    pub common: Vec<String>,
    #[serde(default = "default_boosted_nodes")]
    pub boosted: Vec<String>,
    /// Base score keyed by the catalog's human-readable category.
    #[serde(default = "default_category_scores")]
    pub category_scores: BTreeMap<String, f64>,
    #[serde(default = "default_category_score")]
    pub default_score: f64,
}

impl Default for PopularityConfig {
    fn default() -> Self {
        Self {
            essential: default_essential_nodes(),
            common: default_common_nodes(),
            boosted: default_boosted_nodes(),
            category_scores: default_category_scores(),
            default_score: default_category_score(),
        }
    }
}

fn default_essential_nodes() -> Vec<String> {
    strings(&[
        "httpRequest",
        "webhook",
        "code",
        "set",
        "if",
        "switch",
        "merge",
        "scheduleTrigger",
        "manualTrigger",
        "splitInBatches",
    ])
}

fn default_common_nodes() -> Vec<String> {
    strings(&[
        "slack",
        "gmail",
        "googleSheets",
        "postgres",
        "mySql",
        "notion",
        "airtable",
        "telegram",
        "discord",
        "github",
        "openAi",
        "emailSend",
    ])
}

fn default_boosted_nodes() -> Vec<String> {
    strings(&[
        "agent",
        "lmChatOpenAi",
        "toolCode",
        "vectorStorePinecone",
        "memoryBufferWindow",
        "formTrigger",
    ])
}

fn default_category_scores() -> BTreeMap<String, f64> {
    [
        ("Core Nodes", 0.6),
        ("AI", 0.6),
        ("Communication", 0.5),
        ("Data & Storage", 0.5),
        ("Productivity", 0.5),
        ("Development", 0.4),
        ("Marketing", 0.4),
        ("Sales", 0.4),
        ("Utility", 0.4),
        ("Analytics", 0.3),
        ("Finance & Accounting", 0.3),
        ("Miscellaneous", 0.2),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn default_category_score() -> f64 {
    0.2
}

/// `[versatility]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersatilityConfig {
    #[serde(default = "default_core_nodes")]
    pub core_nodes: Vec<String>,
}

impl Default for VersatilityConfig {
    fn default() -> Self {
        Self {
            core_nodes: default_core_nodes(),
        }
    }
}

fn default_core_nodes() -> Vec<String> {
    strings(&["httpRequest", "code", "set", "if", "switch", "merge", "function", "webhook"])
}

/// `[identity]` section: prefixes stripped by identity normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Lower-case package namespaces; the first match is stripped.
    #[serde(default = "default_namespace_prefixes")]
    pub namespace_prefixes: Vec<String>,
    /// Lower-case product prefix stripped after the namespace.
    #[serde(default = "default_product_prefix")]
    pub product_prefix: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            namespace_prefixes: default_namespace_prefixes(),
            product_prefix: default_product_prefix(),
        }
    }
}

fn default_namespace_prefixes() -> Vec<String> {
    strings(&[
        "@n8n/n8n-nodes-langchain.",
        "n8n-nodes-langchain.",
        "n8n-nodes-base.",
        "nodes-base.",
        "nodes-langchain.",
    ])
}

fn default_product_prefix() -> String {
    "n8n-".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.nodedocs/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| NodeDocsError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.nodedocs/nodedocs.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| NodeDocsError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| NodeDocsError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| NodeDocsError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| NodeDocsError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| NodeDocsError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Load the category document, or the built-in one when `path` is `None`.
pub fn load_category_config(path: Option<&Path>) -> Result<CategoryConfig> {
    let Some(path) = path else {
        return CategoryConfig::builtin();
    };
    let content = std::fs::read_to_string(path).map_err(|e| {
        NodeDocsError::config(format!(
            "cannot read category config {}: {e}",
            path.display()
        ))
    })?;
    parse_category_config(&content, path)
}

fn parse_category_config(content: &str, origin: &Path) -> Result<CategoryConfig> {
    let config: CategoryConfig = toml::from_str(content).map_err(|e| {
        NodeDocsError::config(format!("failed to parse {}: {e}", origin.display()))
    })?;
    config.validate()?;
    tracing::debug!(
        origin = %origin.display(),
        categories = config.categories.len(),
        "category config loaded"
    );
    Ok(config)
}

/// Load the priority document, or the built-in defaults when `path` is `None`.
pub fn load_priority_config(path: Option<&Path>) -> Result<PriorityConfig> {
    let config = match path {
        None => PriorityConfig::default(),
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| {
                NodeDocsError::config(format!(
                    "cannot read priority config {}: {e}",
                    path.display()
                ))
            })?;
            toml::from_str(&content).map_err(|e| {
                NodeDocsError::config(format!("failed to parse {}: {e}", path.display()))
            })?
        }
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("merged_file_cap"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.top_nodes, 50);
        assert_eq!(parsed.defaults.merged_file_cap, 100);
    }

    #[test]
    fn config_with_paths_and_packages() {
        let toml_str = r#"
[defaults]
output_dir = "/tmp/docs"

[paths]
categories = "/etc/nodedocs/categories.toml"

[[auxiliary_packages]]
name = "n8n-nodes-community-pack"
description = "Community nodes"
node_count = 12
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.output_dir, "/tmp/docs");
        assert_eq!(config.defaults.top_nodes, 50);
        assert!(config.paths.categories.is_some());
        assert!(config.paths.priorities.is_none());
        assert_eq!(config.auxiliary_packages[0].node_count, 12);
    }

    #[test]
    fn builtin_categories_parse() {
        let config = CategoryConfig::builtin().expect("builtin categories");
        assert_eq!(config.categories[0].key, "core");
        assert!(config.category("communication").is_some());
        assert_eq!(config.display_name("data"), "Data & Storage");
        assert_eq!(config.display_name("nope"), "nope");
        // Grouping rules fall back to defaults when the section is absent.
        assert_eq!(config.grouping.functional_groups.len(), 10);
        assert_eq!(config.grouping.fallback_group, "utility");
    }

    #[test]
    fn duplicate_category_keys_rejected() {
        let toml_str = r#"
[[categories]]
key = "core"
display_name = "Core"

[[categories]]
key = "core"
display_name = "Core again"
"#;
        let err = parse_category_config(toml_str, Path::new("dup.toml")).unwrap_err();
        assert!(err.to_string().contains("defined twice"));
    }

    #[test]
    fn path_like_category_key_rejected() {
        let toml_str = r#"
[[categories]]
key = "../escape"
display_name = "Nope"
"#;
        assert!(parse_category_config(toml_str, Path::new("bad.toml")).is_err());
    }

    #[test]
    fn missing_category_file_is_fatal() {
        let err = load_category_config(Some(Path::new("/nonexistent/categories.toml")))
            .unwrap_err();
        assert!(matches!(err, NodeDocsError::Config { .. }));
    }

    #[test]
    fn default_weights_are_valid() {
        let config = PriorityConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.weights.usage, 0.4);
        assert_eq!(config.tiers.essential_max, 50);
    }

    #[test]
    fn overweight_config_rejected() {
        let toml_str = r#"
[weights]
usage = 0.7
documentation = 0.3
"#;
        let config: PriorityConfig = toml::from_str(toml_str).expect("parse");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must not exceed 1.0"));
    }

    #[test]
    fn out_of_range_default_popularity_rejected() {
        let toml_str = r#"
[popularity]
default_score = 1.5
"#;
        let config: PriorityConfig = toml::from_str(toml_str).expect("parse");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("default_score"));

        let mut config = PriorityConfig::default();
        config.popularity.default_score = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_weight_rejected() {
        let mut config = PriorityConfig::default();
        config.weights.popularity = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_priority_document_keeps_defaults() {
        let toml_str = r#"
[tiers]
essential_max = 10

[popularity]
boosted = ["slack"]
"#;
        let config: PriorityConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.tiers.essential_max, 10);
        assert_eq!(config.tiers.common_max, 150);
        assert_eq!(config.popularity.boosted, vec!["slack".to_string()]);
        assert!(!config.popularity.essential.is_empty());
        assert_eq!(config.popularity.default_score, 0.2);
    }

    #[test]
    fn flag_predicates_read_flags() {
        let flags = NodeFlags {
            is_trigger: true,
            ..NodeFlags::default()
        };
        assert!(FlagPredicate::Trigger.matches(&flags));
        assert!(!FlagPredicate::Webhook.matches(&flags));
    }
}
