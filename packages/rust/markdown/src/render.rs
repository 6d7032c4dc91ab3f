//! Default per-node document renderer.

use nodedocs_shared::CorpusNode;
use tracing::trace;

use crate::cleanup::tidy;
use crate::escape::{code_span, escape_cell, table, truncate};

/// Longest property description kept in the properties table.
const PROPERTY_DESCRIPTION_MAX: usize = 120;

/// Render one node as a self-contained Markdown document.
///
/// The document opens with `# {display_name}`; the packager demotes headings
/// when the body is placed inside a merged file.
pub fn render_node(node: &CorpusNode) -> String {
    let record = &node.record;
    trace!(node = %record.node_type, "rendering node");
    let mut out: Vec<String> = Vec::new();

    out.push(format!("# {}", record.heading_name()));
    out.push(String::new());

    if let Some(description) = record.description.as_deref().filter(|d| !d.trim().is_empty()) {
        out.push(format!("> {}", escape_cell(description)));
        out.push(String::new());
    }

    out.extend(table(&["Field", "Value"], &summary_rows(node)));
    out.push(String::new());

    if !record.operations.is_empty() {
        out.push("## Operations".to_string());
        out.push(String::new());
        for op in &record.operations {
            let mut line = format!("- **{}**", op.name.trim());
            if let Some(resource) = &op.resource {
                line.push_str(&format!(" ({})", resource.trim()));
            }
            if let Some(description) = op.description.as_deref().filter(|d| !d.trim().is_empty()) {
                line.push_str(&format!(": {}", escape_cell(description)));
            }
            out.push(line);
        }
        out.push(String::new());
    }

    if !record.properties.is_empty() {
        out.push("## Properties".to_string());
        out.push(String::new());
        let rows: Vec<Vec<String>> = record
            .properties
            .iter()
            .map(|p| {
                vec![
                    code_span(&p.name),
                    escape_cell(p.kind.as_deref().unwrap_or("-")),
                    (if p.required { "yes" } else { "no" }).to_string(),
                    p.default
                        .as_ref()
                        .map(|v| code_span(&escape_cell(&v.to_string())))
                        .unwrap_or_else(|| "-".to_string()),
                    p.description
                        .as_deref()
                        .map(|d| escape_cell(&truncate(d, PROPERTY_DESCRIPTION_MAX)))
                        .unwrap_or_default(),
                ]
            })
            .collect();
        out.extend(table(
            &["Name", "Type", "Required", "Default", "Description"],
            &rows,
        ));
        out.push(String::new());

        let with_options: Vec<_> =
            record.properties.iter().filter(|p| !p.options.is_empty()).collect();
        if !with_options.is_empty() {
            out.push("### Options".to_string());
            out.push(String::new());
            for p in with_options {
                out.push(format!("- {}: {}", code_span(&p.name), p.options.join(", ")));
            }
            out.push(String::new());
        }
    }

    if let Some(doc) = record.documentation.as_deref().filter(|d| !d.trim().is_empty()) {
        out.push("## Documentation".to_string());
        out.push(String::new());
        out.push(doc.trim().to_string());
        out.push(String::new());
    }

    if !node.related.is_empty() {
        out.push("## Related Nodes".to_string());
        out.push(String::new());
        for related in &node.related {
            out.push(format!("- {}", code_span(related)));
        }
        out.push(String::new());
    }

    tidy(&out.join("\n"))
}

fn summary_rows(node: &CorpusNode) -> Vec<Vec<String>> {
    let record = &node.record;
    let mut rows = vec![
        vec!["Node type".to_string(), code_span(&record.node_type)],
        vec![
            "Category".to_string(),
            match &node.subcategory {
                Some(sub) => format!("{} / {sub}", node.category),
                None => node.category.clone(),
            },
        ],
        vec![
            "Tier".to_string(),
            format!("{} (rank {})", node.tier, node.rank),
        ],
        vec!["Score".to_string(), format!("{:.3}", node.score)],
        vec![
            "Usage".to_string(),
            format!("{:.1}% ({})", node.usage_percentage(), node.usage.as_str()),
        ],
    ];

    if let Some(package) = &record.package {
        rows.push(vec!["Package".to_string(), code_span(package)]);
    }
    if let Some(version) = &record.version {
        rows.push(vec!["Version".to_string(), escape_cell(version)]);
    }
    if !node.tags.is_empty() {
        let tags: Vec<&str> = node.tags.iter().map(|t| t.as_str()).collect();
        rows.push(vec!["Tags".to_string(), tags.join(", ")]);
    }
    if !node.groups.is_empty() {
        rows.push(vec!["Groups".to_string(), node.groups.join(", ")]);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodedocs_shared::{
        FactorScores, NodeOperation, NodeProperty, NodeRecord, NodeTag, Tier, UsageFrequency,
    };

    fn make_node() -> CorpusNode {
        let mut record = NodeRecord::new("n8n-nodes-base.slack", "Slack");
        record.description = Some("Consume the Slack API".into());
        record.operations = vec![NodeOperation {
            name: "send".into(),
            resource: Some("message".into()),
            description: Some("Send a message".into()),
        }];
        record.properties = vec![NodeProperty {
            name: "channel".into(),
            kind: Some("string".into()),
            required: true,
            description: Some("Channel | name".into()),
            options: vec![],
            ..NodeProperty::default()
        }];

        CorpusNode {
            record,
            category: "communication".into(),
            subcategory: None,
            priority: 4,
            is_top: false,
            factors: FactorScores {
                usage: 0.5,
                ..FactorScores::default()
            },
            score: 0.4567,
            rank: 3,
            tier: Tier::Common,
            usage: UsageFrequency::Common,
            groups: vec!["communication".into()],
            related: vec!["n8n-nodes-base.gmail".into()],
            tags: vec![NodeTag::RequiresAuth],
        }
    }

    #[test]
    fn render_starts_with_title() {
        let md = render_node(&make_node());
        assert!(md.starts_with("# Slack\n\n> Consume the Slack API\n"));
        assert!(md.ends_with('\n'));
        assert!(!md.ends_with("\n\n"));
    }

    #[test]
    fn render_includes_sections() {
        let md = render_node(&make_node());
        assert!(md.contains("| Tier | common (rank 3) |"));
        assert!(md.contains("| Score | 0.457 |"));
        assert!(md.contains("| Usage | 50.0% (common) |"));
        assert!(md.contains("- **send** (message): Send a message"));
        assert!(md.contains("| `channel` | string | yes | - | Channel \\| name |"));
        assert!(md.contains("## Related Nodes\n\n- `n8n-nodes-base.gmail`"));
        assert!(md.contains("| Tags | requires-auth |"));
    }

    #[test]
    fn render_skips_empty_sections() {
        let mut node = make_node();
        node.record.operations.clear();
        node.record.properties.clear();
        node.related.clear();
        let md = render_node(&node);
        assert!(!md.contains("## Operations"));
        assert!(!md.contains("## Properties"));
        assert!(!md.contains("## Related Nodes"));
    }

    #[test]
    fn multi_line_name_renders_single_title_line() {
        let mut node = make_node();
        node.record.display_name = "Slack\nBot".into();
        let md = render_node(&node);
        assert!(md.starts_with("# Slack Bot\n\n"));
    }

    #[test]
    fn render_is_deterministic() {
        let node = make_node();
        assert_eq!(render_node(&node), render_node(&node));
    }
}
