//! Corpus building for node documentation.
//!
//! Scores and tiers node records, classifies them into categories, derives
//! functional groups and relationships, then packages everything into
//! individual and merged Markdown files with exact line offsets and a master
//! index. [`pipeline::build_corpus`] runs the stages end to end.

pub mod categories;
pub mod grouping;
pub mod index;
pub mod output;
pub mod packager;
pub mod pipeline;
pub mod scoring;
pub mod tiers;
pub mod verify;

pub use packager::{MarkdownRenderer, NodeRenderer};
pub use pipeline::{
    BuildConfig, BuildResult, ProgressReporter, SilentProgress, build_corpus, load_node_records,
    rank_nodes,
};
pub use verify::{VerifyReport, verify_corpus};
