//! Relationship extraction.
//!
//! Two sources produce edges:
//!
//! - Textual directives in descriptions and notes. `/blocking #N` means the
//!   current issue blocks `N`; `/blocked by #N` means `N` blocks the current
//!   issue. Matching is case-insensitive and every occurrence counts.
//! - Structural issue links. A child linked to an epic yields one
//!   `contains` edge from that epic.

use crate::domain::{Edge, NodeId};
use regex::Regex;
use std::sync::LazyLock;

static BLOCKING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)/blocking\s+#(\d+)").expect("valid blocking regex")
});

static BLOCKED_BY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)/blocked by\s+#(\d+)").expect("valid blocked-by regex")
});

/// Extract `blocks` edges from directives in `text`.
///
/// Edges are returned in the order the directives appear, `/blocking`
/// matches first. References that overflow an issue number or point back
/// at `source` are ignored.
pub fn extract_text_edges(source: &NodeId, text: &str) -> Vec<Edge> {
    let referenced = |re: &Regex| -> Vec<u64> {
        re.captures_iter(text)
            .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
            .collect()
    };

    let blocking = referenced(&BLOCKING)
        .into_iter()
        .map(|target| Edge::blocks(source.clone(), target));
    let blocked_by = referenced(&BLOCKED_BY)
        .into_iter()
        .map(|blocker| Edge::blocks(blocker, source.clone()));

    blocking
        .chain(blocked_by)
        .filter(|edge| !edge.is_self_loop())
        .collect()
}

/// The directive that records `blocker` as blocking the note's issue.
pub fn blocked_by_directive(blocker: u64) -> String {
    format!("/blocked by #{blocker}")
}

/// Derive the containment edge for `child` from its linked issues.
///
/// `is_container` decides whether a linked issue can own the child. Links
/// are considered in the order given and only the first container wins.
pub fn extract_link_edge<F>(child: &NodeId, linked: &[u64], is_container: F) -> Option<Edge>
where
    F: Fn(u64) -> bool,
{
    linked
        .iter()
        .copied()
        .find(|&iid| is_container(iid) && NodeId::Remote(iid) != *child)
        .map(|parent| Edge::contains(parent, child.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EdgeSet;
    use rstest::rstest;

    fn id(n: u64) -> NodeId {
        NodeId::Remote(n)
    }

    #[rstest]
    #[case::blocking("Please see /blocking #5", vec![Edge::blocks(id(1), id(5))])]
    #[case::blocked_by("/blocked by #7", vec![Edge::blocks(id(7), id(1))])]
    #[case::case_insensitive("/BLOCKED BY #7 and /Blocking #8", vec![
        Edge::blocks(id(1), id(8)),
        Edge::blocks(id(7), id(1)),
    ])]
    #[case::extra_whitespace("/blocked by   #3", vec![Edge::blocks(id(3), id(1))])]
    #[case::split_across_lines("/blocked\nby #3", vec![])]
    #[case::tab_inside_directive("/blocked\tby #3", vec![])]
    #[case::several("/blocking #2\n/blocking #3", vec![
        Edge::blocks(id(1), id(2)),
        Edge::blocks(id(1), id(3)),
    ])]
    #[case::no_directives("blocks #4 without slash", vec![])]
    #[case::missing_number("/blocking #", vec![])]
    #[case::self_reference("/blocking #1", vec![])]
    fn text_edges(#[case] text: &str, #[case] expected: Vec<Edge>) {
        assert_eq!(extract_text_edges(&id(1), text), expected);
    }

    #[test]
    fn placeholder_source_is_kept() {
        let source = NodeId::Placeholder("NEW_1".to_string());
        assert_eq!(
            extract_text_edges(&source, "/blocked by #9"),
            vec![Edge::blocks(id(9), source.clone())]
        );
    }

    #[test]
    fn same_directive_in_description_and_note_is_deduplicated() {
        let description = "Work item.\n/blocking #5";
        let note = "> /blocking #5\nquoting the description";

        let mut edges = EdgeSet::new();
        edges.extend(extract_text_edges(&id(1), description));
        edges.extend(extract_text_edges(&id(1), note));

        assert_eq!(edges.into_vec(), vec![Edge::blocks(id(1), id(5))]);
    }

    #[test]
    fn first_container_link_wins() {
        let epics = [10, 20];
        let edge = extract_link_edge(&id(3), &[4, 20, 10], |iid| epics.contains(&iid));
        assert_eq!(edge, Some(Edge::contains(id(20), id(3))));
    }

    #[test]
    fn no_container_link_yields_nothing() {
        assert_eq!(extract_link_edge(&id(3), &[4, 5], |_| false), None);
        assert_eq!(extract_link_edge(&id(3), &[], |_| true), None);
    }

    #[test]
    fn directive_format_roundtrips() {
        let note = blocked_by_directive(12);
        assert_eq!(note, "/blocked by #12");
        assert_eq!(
            extract_text_edges(&id(4), &note),
            vec![Edge::blocks(id(12), id(4))]
        );
    }
}
