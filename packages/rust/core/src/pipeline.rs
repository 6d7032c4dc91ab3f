//! End-to-end build: records → score → tier → classify → group → package → index.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use nodedocs_shared::{
    AuxiliaryPackage, CURRENT_SCHEMA_VERSION, CategoryConfig, CorpusManifest, CorpusNode,
    GroupedNode, NodeDocsError, NodeRecord, PositionTable, PriorityConfig, Relationship, Result,
    ScoredNode, Tier,
};

use crate::categories::{CategoryLookup, classify};
use crate::grouping::group_nodes;
use crate::index::{INDEX_FILE, IndexInput, build_master_index};
use crate::output::{CorpusWriter, MANIFEST_FILE, POSITIONS_FILE, clean_previous_build};
use crate::packager::{NodeRenderer, PackagerConfig, package};
use crate::scoring::{ScoringTables, score_nodes};
use crate::tiers::assign_tiers;

/// Configuration for [`build_corpus`].
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Corpus root directory.
    pub output_root: PathBuf,
    /// Classifier cutoff: the first N categorized nodes are top nodes.
    pub top_nodes: usize,
    /// Most nodes per merged file.
    pub merged_file_cap: usize,
    /// Tool version recorded in the manifest.
    pub tool_version: String,
    /// Remove files listed by a previous manifest before writing.
    pub clean: bool,
}

/// Result of [`build_corpus`].
#[derive(Debug)]
pub struct BuildResult {
    pub output_root: PathBuf,
    /// Distinct input nodes.
    pub node_count: usize,
    pub individual_count: usize,
    pub merged_file_count: usize,
    pub merged_node_count: usize,
    pub uncategorized_count: usize,
    /// Nodes dropped by render or write failures.
    pub skipped: Vec<String>,
    pub elapsed: Duration,
}

/// Progress callback for reporting build status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after a node file or merged file is written.
    fn node_written(&self, path: &str, current: usize, total: usize);
    /// Called when the build completes.
    fn done(&self, result: &BuildResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn node_written(&self, _path: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &BuildResult) {}
}

/// Categorized nodes joined with their scores and groups, split for packaging.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    /// Individual-file nodes, in rank order.
    pub high: Vec<CorpusNode>,
    /// Merged-file nodes, in classifier order.
    pub low: Vec<CorpusNode>,
    pub uncategorized: Vec<String>,
    pub relationships: Vec<Relationship>,
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Read a JSON array of node records.
pub fn load_node_records(path: &Path) -> Result<Vec<NodeRecord>> {
    let content = std::fs::read_to_string(path).map_err(|e| NodeDocsError::io(path, e))?;
    let records: Vec<NodeRecord> = serde_json::from_str(&content)
        .map_err(|e| NodeDocsError::Serialization(format!("{}: {e}", path.display())))?;
    info!(path = %path.display(), count = records.len(), "loaded node records");
    Ok(records)
}

/// Drop repeated node types, keeping the first occurrence.
pub fn dedupe_records(records: Vec<NodeRecord>) -> Vec<NodeRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    records
        .into_iter()
        .filter(|r| {
            let fresh = seen.insert(r.node_type.clone());
            if !fresh {
                warn!(node = %r.node_type, "duplicate node type, keeping first");
            }
            fresh
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Score and tier every node. Output is in rank order.
pub fn rank_nodes(records: &[NodeRecord], priorities: &PriorityConfig) -> Vec<ScoredNode> {
    let tables = ScoringTables::from_config(priorities);
    let scores = score_nodes(records, &tables);
    assign_tiers(records, &scores, &priorities.tiers)
}

/// Run the analysis stages and split categorized nodes into high and low.
///
/// A node is high-priority when the classifier marks it a top node or its
/// tier is essential. Records must have unique node types.
#[instrument(skip_all, fields(node_count = records.len(), top_nodes))]
pub fn assemble_corpus(
    records: &[NodeRecord],
    categories: &CategoryConfig,
    priorities: &PriorityConfig,
    top_nodes: usize,
) -> Corpus {
    let ranked = rank_nodes(records, priorities);
    let by_type: HashMap<&str, &ScoredNode> = ranked
        .iter()
        .map(|n| (n.record.node_type.as_str(), n))
        .collect();

    let classification = classify(records, &CategoryLookup::from_config(categories), top_nodes);

    let grouping = group_nodes(records, &categories.grouping, &priorities.identity);
    let groups: HashMap<&str, &GroupedNode> = grouping
        .nodes
        .iter()
        .map(|n| (n.record.node_type.as_str(), n))
        .collect();

    let mut corpus = Corpus {
        uncategorized: classification.uncategorized.clone(),
        relationships: grouping.relationships.clone(),
        ..Corpus::default()
    };

    for categorized in classification.all() {
        let key = categorized.record.node_type.as_str();
        let (Some(scored), Some(grouped)) = (by_type.get(key), groups.get(key)) else {
            continue;
        };

        let node = CorpusNode {
            record: categorized.record.clone(),
            category: categorized.category.clone(),
            subcategory: categorized.subcategory.clone(),
            priority: categorized.priority,
            is_top: categorized.is_top,
            factors: scored.factors,
            score: scored.score,
            rank: scored.rank,
            tier: scored.tier,
            usage: grouped.usage,
            groups: grouped.groups.clone(),
            related: grouped.related.clone(),
            tags: grouped.tags.clone(),
        };

        if node.is_top || node.tier == Tier::Essential {
            corpus.high.push(node);
        } else {
            corpus.low.push(node);
        }
    }

    corpus.high.sort_by_key(|n| n.rank);

    info!(
        high = corpus.high.len(),
        low = corpus.low.len(),
        uncategorized = corpus.uncategorized.len(),
        relationships = corpus.relationships.len(),
        "corpus assembled"
    );

    corpus
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Run the full build and write the corpus to `config.output_root`.
///
/// Invalid configuration fails before anything is written. Per-node failures
/// are logged and reported in [`BuildResult::skipped`].
#[instrument(skip_all, fields(out = %config.output_root.display()))]
pub fn build_corpus(
    records: Vec<NodeRecord>,
    categories: &CategoryConfig,
    priorities: &PriorityConfig,
    auxiliary: &[AuxiliaryPackage],
    renderer: &dyn NodeRenderer,
    config: &BuildConfig,
    progress: &dyn ProgressReporter,
) -> Result<BuildResult> {
    let start = Instant::now();

    categories.validate()?;
    priorities.validate()?;

    progress.phase("Analyzing nodes");
    let records = dedupe_records(records);
    let corpus = assemble_corpus(&records, categories, priorities, config.top_nodes);

    if config.clean {
        progress.phase("Removing previous build");
        clean_previous_build(&config.output_root)?;
    }

    progress.phase("Packaging documents");
    let mut writer = CorpusWriter::create(&config.output_root)?;
    let packaged = package(
        &corpus.high,
        &corpus.low,
        categories,
        renderer,
        &PackagerConfig {
            merged_file_cap: config.merged_file_cap,
        },
        &mut writer,
        progress,
    )?;

    progress.phase("Writing index");
    let index = build_master_index(&IndexInput {
        high: &corpus.high,
        low: &corpus.low,
        individual: &packaged.individual,
        merged: &packaged.merged,
        categories,
        relationships: &corpus.relationships,
        uncategorized: &corpus.uncategorized,
        auxiliary,
    });
    writer.write(INDEX_FILE, &index)?;

    writer.write_json(
        POSITIONS_FILE,
        &PositionTable {
            schema_version: CURRENT_SCHEMA_VERSION,
            merged_files: packaged.merged.clone(),
        },
    )?;

    let merged_node_count: usize = packaged.merged.iter().map(|m| m.node_count).sum();
    let manifest = CorpusManifest {
        schema_version: CURRENT_SCHEMA_VERSION,
        tool_version: config.tool_version.clone(),
        node_count: records.len(),
        individual_count: packaged.individual.len(),
        merged_count: packaged.merged.len(),
        uncategorized_count: corpus.uncategorized.len(),
        files: writer.files(),
    };
    writer.write_json(MANIFEST_FILE, &manifest)?;

    let result = BuildResult {
        output_root: config.output_root.clone(),
        node_count: records.len(),
        individual_count: packaged.individual.len(),
        merged_file_count: packaged.merged.len(),
        merged_node_count,
        uncategorized_count: corpus.uncategorized.len(),
        skipped: packaged.skipped,
        elapsed: start.elapsed(),
    };

    info!(
        nodes = result.node_count,
        individual = result.individual_count,
        merged_files = result.merged_file_count,
        skipped = result.skipped.len(),
        elapsed_ms = result.elapsed.as_millis() as u64,
        "build complete"
    );

    progress.done(&result);
    Ok(result)
}
