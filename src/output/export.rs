//! Leveled, path-annotated export rows
//!
//! The tree is flattened per top-level branch into ordered rows
//! `{label, level, path}`. Intermediate categories that expanded into
//! children produce no row of their own; their names live on in the paths of
//! the rows below them.

use crate::tree::{CategoryNode, NodeStatus};

/// Separator between path segments
pub const PATH_SEPARATOR: &str = " → ";

/// Label of the sentinel row for a branch with nothing beneath it
pub const NO_CHILDREN_LABEL: &str = "No subcategories found";

/// Upper bound on section name length, in characters
pub const SECTION_NAME_MAX: usize = 31;

const FORBIDDEN_SECTION_CHARS: &[char] = &['\\', '/', '*', '?', ':', '[', ']'];

/// What a row stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKind {
    /// A leaf category
    Category,

    /// A label harvested from a flat filter list
    Flat,

    /// Sentinel for a top-level branch that had no children
    NoChildren,

    /// Sentinel for a node that could not be resolved
    Failed,
}

impl RowKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Flat => "flat",
            Self::NoChildren => "no_children",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "category" => Some(Self::Category),
            "flat" => Some(Self::Flat),
            "no_children" => Some(Self::NoChildren),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One exported line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub label: String,
    pub level: u32,
    pub path: String,
    pub kind: RowKind,
    /// Leaf reason or failure cause, when there is one
    pub detail: Option<String>,
}

/// Rows of one top-level branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSection {
    /// Sanitized, unique section name
    pub name: String,
    /// Unsanitized name of the top-level category
    pub root: String,
    pub rows: Vec<ExportRow>,
}

/// Flattens the tree into one section per top-level branch
///
/// With `exclude_root`, the top-level name is dropped from every path; a row
/// whose path would then be empty falls back to the branch name.
pub fn export_sections(roots: &[CategoryNode], exclude_root: bool) -> Vec<ExportSection> {
    let mut taken: Vec<String> = Vec::with_capacity(roots.len());

    roots
        .iter()
        .map(|root| {
            let name = unique_section_name(&sanitize_section_name(&root.name), &taken);
            taken.push(name.clone());

            let mut rows = Vec::new();
            if root.status == NodeStatus::NoChildren {
                rows.push(ExportRow {
                    label: NO_CHILDREN_LABEL.to_string(),
                    level: root.depth,
                    path: root.name.clone(),
                    kind: RowKind::NoChildren,
                    detail: root.leaf_reason.map(|reason| reason.to_string()),
                });
            } else {
                collect_rows(root, &root.name, exclude_root, &mut rows);
            }

            ExportSection {
                name,
                root: root.name.clone(),
                rows,
            }
        })
        .collect()
}

fn collect_rows(node: &CategoryNode, root: &str, exclude_root: bool, rows: &mut Vec<ExportRow>) {
    match node.status {
        NodeStatus::Pending => {}
        NodeStatus::Failed => rows.push(ExportRow {
            label: node.name.clone(),
            level: node.depth,
            path: join_path(&node.parent_path, root, exclude_root),
            kind: RowKind::Failed,
            detail: node.failure.as_ref().map(|f| f.cause.to_string()),
        }),
        NodeStatus::NoChildren => rows.push(ExportRow {
            label: node.name.clone(),
            level: node.depth,
            path: join_path(&node.parent_path, root, exclude_root),
            kind: RowKind::Category,
            detail: node.leaf_reason.map(|reason| reason.to_string()),
        }),
        NodeStatus::Expanded => {
            if let Some(labels) = &node.flat_categories {
                let path = join_path(&node.path(), root, exclude_root);
                rows.extend(labels.iter().map(|label| ExportRow {
                    label: label.clone(),
                    level: node.depth + 1,
                    path: path.clone(),
                    kind: RowKind::Flat,
                    detail: None,
                }));
            }
            for child in &node.children {
                collect_rows(child, root, exclude_root, rows);
            }
        }
    }
}

fn join_path(segments: &[String], root: &str, exclude_root: bool) -> String {
    let segments = if exclude_root && !segments.is_empty() {
        &segments[1..]
    } else {
        segments
    };

    if segments.is_empty() {
        root.to_string()
    } else {
        segments.join(PATH_SEPARATOR)
    }
}

/// Strips characters that are not allowed in section names and bounds the length
pub fn sanitize_section_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !FORBIDDEN_SECTION_CHARS.contains(c))
        .collect();
    let truncated: String = cleaned.trim().chars().take(SECTION_NAME_MAX).collect();
    let truncated = truncated.trim_end().to_string();

    if truncated.is_empty() {
        "Section".to_string()
    } else {
        truncated
    }
}

/// Appends ` (2)`, ` (3)`, ... until `name` is not in `taken`, staying within
/// [`SECTION_NAME_MAX`]
fn unique_section_name(name: &str, taken: &[String]) -> String {
    let is_taken = |candidate: &str| taken.iter().any(|t| t.eq_ignore_ascii_case(candidate));
    if !is_taken(name) {
        return name.to_string();
    }

    let mut n = 2;
    loop {
        let suffix = format!(" ({})", n);
        let keep = SECTION_NAME_MAX.saturating_sub(suffix.chars().count());
        let base: String = name.chars().take(keep).collect();
        let candidate = format!("{}{}", base.trim_end(), suffix);
        if !is_taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{LeafReason, NodeFailure};
    use crate::NodeError;
    use std::time::Duration;

    fn node(name: &str, parent_path: &[&str], status: NodeStatus) -> CategoryNode {
        CategoryNode {
            name: name.to_string(),
            url: Some(format!("/{}", name.to_lowercase())),
            parent_path: parent_path.iter().map(|s| s.to_string()).collect(),
            depth: parent_path.len() as u32 + 1,
            children: Vec::new(),
            flat_categories: None,
            status,
            strategy: None,
            leaf_reason: (status == NodeStatus::NoChildren).then_some(LeafReason::NoStructure),
            failure: None,
            attempts: 1,
            elapsed: Duration::ZERO,
        }
    }

    fn shoes() -> CategoryNode {
        let mut root = node("Shoes", &[], NodeStatus::Expanded);
        root.children = vec![
            node("Sneakers", &["Shoes"], NodeStatus::NoChildren),
            node("Boots", &["Shoes"], NodeStatus::NoChildren),
        ];
        root
    }

    #[test]
    fn test_leaf_rows_under_root() {
        for exclude_root in [true, false] {
            let sections = export_sections(&[shoes()], exclude_root);
            assert_eq!(sections.len(), 1);
            assert_eq!(sections[0].name, "Shoes");

            let rows = &sections[0].rows;
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].label, "Sneakers");
            assert_eq!(rows[1].label, "Boots");
            for row in rows {
                assert_eq!(row.level, 2);
                assert_eq!(row.path, "Shoes");
                assert_eq!(row.kind, RowKind::Category);
            }
        }
    }

    #[test]
    fn test_deep_paths_and_exclude_root() {
        let mut root = shoes();
        let mut boots = node("Boots", &["Shoes"], NodeStatus::Expanded);
        boots.children = vec![node("Chelsea", &["Shoes", "Boots"], NodeStatus::NoChildren)];
        root.children[1] = boots;

        let kept = export_sections(&[root.clone()], false);
        assert_eq!(kept[0].rows[1].path, "Shoes → Boots");
        assert_eq!(kept[0].rows[1].level, 3);

        let excluded = export_sections(&[root], true);
        assert_eq!(excluded[0].rows[1].path, "Boots");
    }

    #[test]
    fn test_flat_labels_share_path() {
        let mut colors = node("Colors", &["Shoes"], NodeStatus::Expanded);
        colors.flat_categories = Some(vec!["Red".into(), "Blue".into(), "Red".into()]);
        let mut root = node("Shoes", &[], NodeStatus::Expanded);
        root.children = vec![colors];

        let rows = &export_sections(&[root], false)[0].rows;
        let labels: Vec<_> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Red", "Blue", "Red"]);
        assert!(rows.iter().all(|r| r.path == "Shoes → Colors"));
        assert!(rows.iter().all(|r| r.level == 3 && r.kind == RowKind::Flat));
    }

    #[test]
    fn test_sentinels() {
        let empty_root = node("Gifts", &[], NodeStatus::NoChildren);
        let mut failed_root = node("Sale", &[], NodeStatus::Failed);
        failed_root.attempts = 3;
        failed_root.failure = Some(NodeFailure {
            attempts: 3,
            cause: NodeError::NavigationTimeout("/sale".into()),
        });

        let sections = export_sections(&[empty_root, failed_root], true);

        assert_eq!(sections[0].rows.len(), 1);
        assert_eq!(sections[0].rows[0].kind, RowKind::NoChildren);
        assert_eq!(sections[0].rows[0].label, NO_CHILDREN_LABEL);
        assert_eq!(sections[0].rows[0].path, "Gifts");

        assert_eq!(sections[1].rows.len(), 1);
        assert_eq!(sections[1].rows[0].kind, RowKind::Failed);
        assert_eq!(sections[1].rows[0].path, "Sale");
        assert!(sections[1].rows[0]
            .detail
            .as_deref()
            .unwrap()
            .contains("timed out"));
    }

    #[test]
    fn test_section_names_sanitized_and_unique() {
        assert_eq!(sanitize_section_name("Home / Garden: [Sale]?"), "Home  Garden Sale");
        assert_eq!(sanitize_section_name("///"), "Section");

        let long = "Very long category name that keeps going";
        let sanitized = sanitize_section_name(long);
        assert_eq!(sanitized.chars().count(), SECTION_NAME_MAX);

        let roots = vec![
            node(long, &[], NodeStatus::NoChildren),
            node(long, &[], NodeStatus::NoChildren),
            node("Shoes", &[], NodeStatus::NoChildren),
            node("Shoes?", &[], NodeStatus::NoChildren),
        ];
        let names: Vec<_> = export_sections(&roots, true)
            .into_iter()
            .map(|s| s.name)
            .collect();

        assert_eq!(names[0], sanitized);
        assert!(names[1].ends_with(" (2)"));
        assert!(names[1].chars().count() <= SECTION_NAME_MAX);
        assert_eq!(names[2], "Shoes");
        assert_eq!(names[3], "Shoes (2)");
    }

    #[test]
    fn test_row_kind_db_strings() {
        for kind in [
            RowKind::Category,
            RowKind::Flat,
            RowKind::NoChildren,
            RowKind::Failed,
        ] {
            assert_eq!(RowKind::from_db_string(kind.to_db_string()), Some(kind));
        }
    }
}
