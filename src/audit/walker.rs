//! Depth-first walk of a requirement tree into flat course tuples.

use super::constraint::resolve;
use super::diag::Diagnostics;
use super::node::{AuditDocument, NodeShape, RequirementNode};
use super::{CourseTuple, CHAIN_SEP};

/// Canonical chain segment for any subtree whose display name mentions
/// "General Education". Catalog years name these plans differently
/// ("EY2024 General Education Plan", ...); collapsing them to one token
/// keeps general-education requirements comparable across years.
const GEN_ED_SEGMENT: &str = "GenEd";
const GEN_ED_MARKER: &str = "General Education";

/// Top-level programs that are bookkeeping, not requirements. They make
/// virtually every course "count", so they are skipped outright.
const PROGRAM_SKIP_MARKERS: &[&str] = &["Degree Check", "Total Units"];

/// Flatten a whole audit document: the `requirement` subtree plus any
/// `uni_req_tree.programs`, each walked from an empty chain.
pub fn walk_document(doc: &AuditDocument, diag: &mut Diagnostics) -> Vec<CourseTuple> {
    let mut out = Vec::new();
    if let Some(root) = &doc.requirement {
        walk_node(root, "", &mut out, diag);
    }
    if let Some(tree) = &doc.uni_req_tree {
        for program in &tree.programs {
            let name = program.display_name();
            if PROGRAM_SKIP_MARKERS.iter().any(|m| name.contains(m)) {
                continue;
            }
            walk_node(program, "", &mut out, diag);
        }
    }
    out
}

/// Walk a bare list of sibling nodes against the same inherited chain
/// (list items are siblings, not an added chain level).
pub fn walk_nodes(
    nodes: &[RequirementNode],
    inherited: &str,
    out: &mut Vec<CourseTuple>,
    diag: &mut Diagnostics,
) {
    for node in nodes {
        walk_node(node, inherited, out, diag);
    }
}

fn walk_node(
    node: &RequirementNode,
    inherited: &str,
    out: &mut Vec<CourseTuple>,
    diag: &mut Diagnostics,
) {
    let raw_name = node.display_name();
    let name = if raw_name.contains(GEN_ED_MARKER) {
        GEN_ED_SEGMENT
    } else {
        raw_name
    };
    let chain = if inherited.is_empty() {
        name.to_string()
    } else {
        format!("{inherited}{CHAIN_SEP}{name}")
    };

    match node.shape() {
        NodeShape::Choice(children) => walk_nodes(children, &chain, out, diag),
        NodeShape::Constrained(constraints) => {
            for constraint in constraints {
                out.extend(resolve(constraint, &chain, diag));
            }
        }
        NodeShape::InlineConstraint(raw) => out.extend(resolve(&raw, &chain, diag)),
        NodeShape::BareCourse(code) => out.push(CourseTuple::course(code, &chain)),
        NodeShape::Dead => {}
    }
}
