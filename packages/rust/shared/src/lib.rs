//! Shared types, error model, and configuration for nodedocs.
//!
//! This crate is the foundation depended on by all other nodedocs crates.
//! It provides:
//! - [`NodeDocsError`]: the unified error type
//! - Domain types ([`NodeRecord`], [`ScoredNode`], [`CategorizedNode`],
//!   [`GroupedNode`], [`NodePosition`], [`MergedFileInfo`])
//! - Configuration ([`AppConfig`], [`CategoryConfig`], [`PriorityConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, AuxiliaryPackage, CategoryConfig, CategoryDefinition, DefaultsConfig,
    FlagPredicate, FunctionalGroupRule, GroupingRules, IdentityConfig, PathsConfig,
    PopularityConfig, PriorityConfig, RelationshipRule, ScoringWeights, TierCaps,
    VersatilityConfig, config_dir, config_file_path, init_config, load_category_config,
    load_config, load_config_from, load_priority_config,
};
pub use error::{NodeDocsError, Result};
pub use types::{
    CURRENT_SCHEMA_VERSION, CategorizedNode, CorpusManifest, CorpusNode, FactorScores,
    GroupedNode, IndividualFileRef, ManifestFile, MergedFileInfo, NodeFlags, NodeOperation,
    NodePosition, NodeProperty, NodeRecord, NodeTag, PositionTable, Relationship,
    RelationshipKind, ScoredNode, Tier, UsageFrequency, type_segment,
};
