/*!
 * # Visibility Planning
 *
 * Turns a set of focus targets into a hide plan:
 *
 * 1. The **keep-set** is every target plus its ancestors up to (not
 *    including) the search root.
 * 2. For every kept element, its siblings that are not kept are hidden,
 *    unless the parent is a target or lies inside one (**parent dominance**:
 *    selecting a container shows everything inside it), or the sibling is
 *    excluded by [`ExclusionRules`].
 * 3. Consecutive hidden siblings are grouped into [`DividerGroup`]s so a
 *    renderer can insert one "N sections hidden" affordance per run.
 *
 * Plans are not incremental. A renderer must revert an active plan before
 * applying a new one; [`FocusSession`] hands out both halves of that
 * transition.
 */

mod selection;
mod session;

pub use selection::SelectionSet;
pub use session::{
    FocusSession, FocusStatus, FocusTransition, Notifier, PARTIAL_RESOLUTION_MESSAGE,
    describe_selection,
};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::dom::{Document, NodeId};

/// Elements that are never hidden by a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionRules {
    pub excluded_tags: BTreeSet<String>,
    pub excluded_ids: BTreeSet<String>,
    /// Infrastructure such as notification banners that must stay on screen.
    pub always_visible_classes: BTreeSet<String>,
    /// Leave `aria-hidden="true"` elements alone.
    pub respect_aria_hidden: bool,
}

impl Default for ExclusionRules {
    fn default() -> Self {
        Self {
            excluded_tags: BTreeSet::new(),
            excluded_ids: BTreeSet::new(),
            always_visible_classes: ["notification-banner", "toast"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            respect_aria_hidden: true,
        }
    }
}

impl ExclusionRules {
    pub fn is_excluded(&self, doc: &Document, element: NodeId) -> bool {
        let Some(tag) = doc.tag(element) else {
            return true;
        };
        if doc.kind(element).is_some_and(|kind| kind.is_metadata()) {
            return true;
        }
        if self.excluded_tags.contains(tag) {
            return true;
        }
        if doc
            .element_id(element)
            .is_some_and(|id| self.excluded_ids.contains(id))
        {
            return true;
        }
        if self.respect_aria_hidden && doc.attr(element, "aria-hidden") == Some("true") {
            return true;
        }
        self.always_visible_classes
            .iter()
            .any(|class| doc.has_class(element, class))
    }
}

/// A maximal run of consecutive hidden siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DividerGroup {
    /// The parent whose children form the run.
    pub container: NodeId,
    /// First hidden element of the run.
    pub start: NodeId,
    /// Every hidden element of the run, in document order.
    pub members: Vec<NodeId>,
    /// The visible sibling right after the run, `None` for a trailing run.
    pub next_visible: Option<NodeId>,
}

impl DividerGroup {
    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Where the divider affordance goes: directly before the run.
    pub fn insert_before(&self) -> NodeId {
        self.start
    }
}

/// Elements to hide plus the divider groups describing them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityPlan {
    hidden: Vec<NodeId>,
    dividers: Vec<DividerGroup>,
}

impl VisibilityPlan {
    /// Hidden elements in document order. Their subtrees are hidden with them.
    pub fn hidden(&self) -> &[NodeId] {
        &self.hidden
    }

    pub fn dividers(&self) -> &[DividerGroup] {
        &self.dividers
    }

    pub fn is_empty(&self) -> bool {
        self.hidden.is_empty()
    }

    pub fn is_hidden(&self, element: NodeId) -> bool {
        self.hidden.contains(&element)
    }

    /// Whether `node` is hidden itself or sits inside a hidden element.
    pub fn is_concealed(&self, doc: &Document, node: NodeId) -> bool {
        self.is_hidden(node) || doc.ancestors(node).any(|ancestor| self.is_hidden(ancestor))
    }

    /// Reveal one divider group's members and drop its divider.
    pub fn expand(&mut self, group: usize) -> Option<DividerGroup> {
        if group >= self.dividers.len() {
            return None;
        }
        let expanded = self.dividers.remove(group);
        self.hidden.retain(|element| !expanded.members.contains(element));
        Some(expanded)
    }
}

#[derive(Debug, Clone, Default)]
pub struct VisibilityPlanner {
    rules: ExclusionRules,
}

impl VisibilityPlanner {
    pub fn new(rules: ExclusionRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ExclusionRules {
        &self.rules
    }

    /// Compute the hide plan for `targets` below `root`.
    ///
    /// Targets that are `root` itself or lie outside it are ignored.
    pub fn plan(&self, doc: &Document, root: NodeId, targets: &[NodeId]) -> VisibilityPlan {
        let targets: HashSet<NodeId> = targets
            .iter()
            .copied()
            .filter(|&target| {
                let inside = doc.is_ancestor_of(root, target);
                if !inside {
                    log::debug!("ignoring focus target {target:?} outside {root:?}");
                }
                inside
            })
            .collect();

        let mut keep: HashSet<NodeId> = HashSet::new();
        for &target in &targets {
            keep.insert(target);
            keep.extend(doc.ancestors(target).take_while(|&ancestor| ancestor != root));
        }

        let mut hidden: HashSet<NodeId> = HashSet::new();
        for &element in &keep {
            let Some(parent) = doc.parent(element) else {
                continue;
            };
            if is_dominated(doc, root, parent, &targets) {
                continue;
            }
            for sibling in doc.element_children(parent) {
                if !keep.contains(&sibling) && !self.rules.is_excluded(doc, sibling) {
                    hidden.insert(sibling);
                }
            }
        }

        let containers: HashSet<NodeId> = hidden.iter().filter_map(|&h| doc.parent(h)).collect();
        let mut plan = VisibilityPlan::default();
        for node in std::iter::once(root).chain(doc.descendants(root)) {
            if hidden.contains(&node) {
                plan.hidden.push(node);
            }
            if containers.contains(&node) {
                plan.dividers.extend(group_runs(doc, node, &hidden));
            }
        }
        plan
    }
}

/// `parent` is a target or lies inside one (below `root`).
fn is_dominated(doc: &Document, root: NodeId, parent: NodeId, targets: &HashSet<NodeId>) -> bool {
    std::iter::once(parent)
        .chain(doc.ancestors(parent))
        .take_while(|&node| node != root)
        .any(|node| targets.contains(&node))
}

fn group_runs(doc: &Document, container: NodeId, hidden: &HashSet<NodeId>) -> Vec<DividerGroup> {
    let mut groups = Vec::new();
    let mut run: Vec<NodeId> = Vec::new();

    for child in doc.element_children(container) {
        if hidden.contains(&child) {
            run.push(child);
        } else if doc.kind(child).is_some_and(|kind| kind.is_metadata()) {
            // Never rendered, so it does not split a run.
            continue;
        } else if !run.is_empty() {
            groups.push(DividerGroup {
                container,
                start: run[0],
                members: std::mem::take(&mut run),
                next_visible: Some(child),
            });
        }
    }

    if !run.is_empty() {
        groups.push(DividerGroup {
            container,
            start: run[0],
            members: run,
            next_visible: None,
        });
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_document;
    use pretty_assertions::assert_eq;

    fn by_id(doc: &Document, id: &str) -> NodeId {
        doc.elements_by_id(id)[0]
    }

    fn ids(doc: &Document, nodes: &[NodeId]) -> Vec<String> {
        nodes
            .iter()
            .map(|&n| doc.element_id(n).unwrap_or("?").to_string())
            .collect()
    }

    #[test]
    fn test_siblings_of_target_and_ancestors_are_hidden() {
        let doc = parse_document(
            r#"<body>
                <h1 id="title">T</h1>
                <div id="sec">
                    <p id="a">A</p><p id="b">B</p><p id="c">C</p>
                </div>
                <div id="other"><p id="d">D</p></div>
            </body>"#,
        )
        .unwrap();

        let plan = VisibilityPlanner::default().plan(&doc, doc.body(), &[by_id(&doc, "b")]);

        assert_eq!(ids(&doc, plan.hidden()), vec!["title", "a", "c", "other"]);
        assert!(plan.is_concealed(&doc, by_id(&doc, "d")));
        assert!(!plan.is_concealed(&doc, by_id(&doc, "b")));
    }

    #[test]
    fn test_parent_dominance_keeps_container_contents() {
        let doc = parse_document(
            r#"<body>
                <div id="intro"><p id="i1">x</p></div>
                <div id="sec"><p id="a">A</p><div id="nested"><p id="n">N</p></div></div>
                <div id="outro"><p id="o1">y</p></div>
            </body>"#,
        )
        .unwrap();
        let section = by_id(&doc, "sec");

        let plan = VisibilityPlanner::default().plan(&doc, doc.body(), &[section]);

        assert_eq!(ids(&doc, plan.hidden()), vec!["intro", "outro"]);
        for node in doc.descendants(section) {
            assert!(!plan.is_concealed(&doc, node), "{node:?} inside the selected container was hidden");
        }
        assert!(plan.is_concealed(&doc, by_id(&doc, "i1")));
    }

    #[test]
    fn test_dominance_covers_targets_nested_in_targets() {
        let doc = parse_document(
            r#"<body><div id="sec"><div id="inner"><p id="a">A</p><p id="b">B</p></div><p id="c">C</p></div><p id="x">X</p></body>"#,
        )
        .unwrap();

        let plan = VisibilityPlanner::default().plan(
            &doc,
            doc.body(),
            &[by_id(&doc, "sec"), by_id(&doc, "b")],
        );

        assert_eq!(ids(&doc, plan.hidden()), vec!["x"]);
    }

    #[test]
    fn test_three_hidden_between_visible_form_one_group() {
        let doc = parse_document(
            r#"<body><div id="sec">
                <p id="keep1">K</p><p id="h1">1</p><p id="h2">2</p><p id="h3">3</p><p id="keep2">K</p>
            </div></body>"#,
        )
        .unwrap();

        let plan = VisibilityPlanner::default().plan(
            &doc,
            doc.body(),
            &[by_id(&doc, "keep1"), by_id(&doc, "keep2")],
        );

        assert_eq!(plan.dividers().len(), 1);
        let group = &plan.dividers()[0];
        assert_eq!(group.count(), 3);
        assert_eq!(group.insert_before(), by_id(&doc, "h1"));
        assert_eq!(group.next_visible, Some(by_id(&doc, "keep2")));
        assert_eq!(group.container, by_id(&doc, "sec"));
    }

    #[test]
    fn test_trailing_run_is_anchored_at_its_start() {
        let doc = parse_document(
            r#"<body><p id="keep">K</p><p id="t1">1</p><p id="t2">2</p></body>"#,
        )
        .unwrap();

        let plan = VisibilityPlanner::default().plan(&doc, doc.body(), &[by_id(&doc, "keep")]);

        assert_eq!(plan.dividers().len(), 1);
        assert_eq!(plan.dividers()[0].start, by_id(&doc, "t1"));
        assert_eq!(plan.dividers()[0].count(), 2);
        assert_eq!(plan.dividers()[0].next_visible, None);
    }

    #[test]
    fn test_exclusions_are_never_hidden() {
        let doc = parse_document(
            r#"<body>
                <div class="notification-banner" id="banner">!</div>
                <nav id="nav">n</nav>
                <span aria-hidden="true" id="icon">i</span>
                <script id="js">x</script>
                <p id="keep">K</p>
                <p id="gone">G</p>
            </body>"#,
        )
        .unwrap();
        let rules = ExclusionRules {
            excluded_ids: BTreeSet::from(["nav".to_string()]),
            ..ExclusionRules::default()
        };

        let plan = VisibilityPlanner::new(rules).plan(&doc, doc.body(), &[by_id(&doc, "keep")]);

        assert_eq!(ids(&doc, plan.hidden()), vec!["gone"]);
    }

    #[test]
    fn test_metadata_does_not_split_runs() {
        let doc = parse_document(
            r#"<body><p id="keep">K</p><p id="h1">1</p><style>p{}</style><p id="h2">2</p><div class="toast" id="t">t</div><p id="h3">3</p></body>"#,
        )
        .unwrap();

        let plan = VisibilityPlanner::default().plan(&doc, doc.body(), &[by_id(&doc, "keep")]);

        let counts: Vec<usize> = plan.dividers().iter().map(DividerGroup::count).collect();
        assert_eq!(counts, vec![2, 1]);
    }

    #[test]
    fn test_expand_reveals_one_group() {
        let doc = parse_document(
            r#"<body><p id="h1">1</p><p id="keep">K</p><p id="h2">2</p><p id="h3">3</p></body>"#,
        )
        .unwrap();
        let mut plan = VisibilityPlanner::default().plan(&doc, doc.body(), &[by_id(&doc, "keep")]);
        assert_eq!(plan.dividers().len(), 2);

        let expanded = plan.expand(1).unwrap();

        assert_eq!(expanded.count(), 2);
        assert_eq!(ids(&doc, plan.hidden()), vec!["h1"]);
        assert_eq!(plan.dividers().len(), 1);
        assert!(plan.expand(5).is_none());
    }

    #[test]
    fn test_planning_is_idempotent() {
        let doc = parse_document(
            r#"<body><div id="a"><p id="x">x</p><p id="y">y</p></div><div id="b">b</div></body>"#,
        )
        .unwrap();
        let planner = VisibilityPlanner::default();
        let targets = [by_id(&doc, "x"), by_id(&doc, "b")];
        assert_eq!(
            planner.plan(&doc, doc.body(), &targets),
            planner.plan(&doc, doc.body(), &targets)
        );
    }

    #[test]
    fn test_empty_targets_hide_nothing() {
        let doc = parse_document(r#"<body><p>x</p></body>"#).unwrap();
        let plan = VisibilityPlanner::default().plan(&doc, doc.body(), &[]);
        assert!(plan.is_empty());
        assert!(plan.dividers().is_empty());
    }
}
