use crate::anchors::{AnchorDescriptor, AnchorResolver, deserialize, serialize};
use crate::dom::{Document, NodeId};

use super::{DividerGroup, VisibilityPlan, VisibilityPlanner};

/// One-line message sent when only some shared anchors resolved.
pub const PARTIAL_RESOLUTION_MESSAGE: &str = "Some shared sections could not be found";

/// Sink for user-visible notifications such as toasts.
pub trait Notifier {
    fn notify(&mut self, message: &str);
}

impl<F: FnMut(&str)> Notifier for F {
    fn notify(&mut self, message: &str) {
        self(message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusStatus {
    /// Every requested target was found.
    Complete,
    /// Some anchors did not resolve; focus was entered with the rest.
    Partial { missing: usize },
    /// Nothing resolved; the document is left unmodified.
    Failed,
}

/// What a renderer must do, in order: revert the old plan, apply the new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusTransition {
    pub revert: Option<VisibilityPlan>,
    pub apply: Option<VisibilityPlan>,
    pub status: FocusStatus,
}

#[derive(Debug, Clone)]
struct ActiveFocus {
    targets: Vec<NodeId>,
    plan: VisibilityPlan,
}

/// Owns the currently applied focus mode.
///
/// Entering a new mode always reverts the previous one first, so repeated or
/// duplicate triggers never compound hidden state.
#[derive(Debug, Clone, Default)]
pub struct FocusSession {
    resolver: AnchorResolver,
    planner: VisibilityPlanner,
    active: Option<ActiveFocus>,
}

impl FocusSession {
    pub fn new(resolver: AnchorResolver, planner: VisibilityPlanner) -> Self {
        Self {
            resolver,
            planner,
            active: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_plan(&self) -> Option<&VisibilityPlan> {
        self.active.as_ref().map(|active| &active.plan)
    }

    pub fn targets(&self) -> &[NodeId] {
        self.active
            .as_ref()
            .map(|active| active.targets.as_slice())
            .unwrap_or_default()
    }

    /// Focus on already-known elements.
    pub fn enter(&mut self, doc: &Document, root: NodeId, targets: &[NodeId]) -> FocusTransition {
        let revert = self.exit();
        if targets.is_empty() {
            return FocusTransition {
                revert,
                apply: None,
                status: FocusStatus::Failed,
            };
        }

        let plan = self.planner.plan(doc, root, targets);
        log::info!(
            "entering focus on {} element(s), hiding {}",
            targets.len(),
            plan.hidden().len()
        );
        self.active = Some(ActiveFocus {
            targets: targets.to_vec(),
            plan: plan.clone(),
        });
        FocusTransition {
            revert,
            apply: Some(plan),
            status: FocusStatus::Complete,
        }
    }

    /// Focus on the elements named by a shared anchor token.
    ///
    /// A partial resolution is reported through `notifier` and proceeds with
    /// whatever resolved. A total failure leaves no mode active.
    pub fn enter_from_token(
        &mut self,
        doc: &Document,
        root: NodeId,
        token: &str,
        notifier: &mut impl Notifier,
    ) -> FocusTransition {
        let descriptors = deserialize(token);
        let resolution = self.resolver.resolve_all(doc, root, &descriptors);

        if resolution.is_empty() {
            log::warn!(
                "none of {} shared anchor(s) resolved; leaving document unmodified",
                resolution.requested
            );
            return FocusTransition {
                revert: self.exit(),
                apply: None,
                status: FocusStatus::Failed,
            };
        }

        let mut transition = self.enter(doc, root, &resolution.elements);
        if !resolution.is_complete() {
            log::warn!(
                "{} of {} shared anchor(s) did not resolve",
                resolution.unresolved,
                resolution.requested
            );
            notifier.notify(PARTIAL_RESOLUTION_MESSAGE);
            transition.status = FocusStatus::Partial {
                missing: resolution.unresolved,
            };
        }
        transition
    }

    /// Leave focus mode, returning the plan the renderer must revert.
    pub fn exit(&mut self) -> Option<VisibilityPlan> {
        let previous = self.active.take()?;
        log::info!("leaving focus mode");
        Some(previous.plan)
    }

    /// Reveal one divider group of the active plan.
    pub fn expand(&mut self, group: usize) -> Option<DividerGroup> {
        self.active.as_mut()?.plan.expand(group)
    }

    /// Token describing the current targets. Empty when nothing is focused.
    pub fn share_token(&self, doc: &Document, root: NodeId) -> String {
        describe_selection(doc, root, self.targets())
    }
}

/// Serialize a selection of elements into an anchor token.
pub fn describe_selection(doc: &Document, root: NodeId, elements: &[NodeId]) -> String {
    let descriptors: Vec<AnchorDescriptor> = elements
        .iter()
        .filter_map(|&element| AnchorDescriptor::create(doc, element, root))
        .collect();
    serialize(&descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_document;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"<body><div id="sec"><p>First</p><p>Correct One</p></div><p>Tail</p></body>"#;

    #[test]
    fn test_entering_twice_reverts_the_first_plan() {
        let doc = parse_document(PAGE).unwrap();
        let paragraphs = doc.elements_by_tag(doc.body(), "p");
        let mut session = FocusSession::default();

        let first = session.enter(&doc, doc.body(), &paragraphs[..1]);
        assert!(first.revert.is_none());

        let second = session.enter(&doc, doc.body(), &paragraphs[2..]);
        assert_eq!(second.revert, first.apply);
        assert_eq!(session.targets(), &paragraphs[2..]);
    }

    #[test]
    fn test_partial_resolution_notifies_once() {
        let doc = parse_document(PAGE).unwrap();
        let target = doc.elements_by_tag(doc.body(), "p")[1];
        let good = AnchorDescriptor::create(&doc, target, doc.body()).unwrap();
        let token = serialize(&[good, AnchorDescriptor::id_only("missing")]);

        let mut messages = Vec::new();
        let mut notifier = |message: &str| messages.push(message.to_string());
        let mut session = FocusSession::default();
        let transition = session.enter_from_token(&doc, doc.body(), &token, &mut notifier);

        assert_eq!(transition.status, FocusStatus::Partial { missing: 1 });
        assert!(transition.apply.is_some());
        assert_eq!(messages, vec![PARTIAL_RESOLUTION_MESSAGE.to_string()]);
    }

    #[test]
    fn test_total_failure_reverts_and_stays_inactive() {
        let doc = parse_document(PAGE).unwrap();
        let mut session = FocusSession::default();
        let target = doc.elements_by_tag(doc.body(), "p")[0];
        let entered = session.enter(&doc, doc.body(), &[target]);

        let mut messages: Vec<String> = Vec::new();
        let mut notifier = |message: &str| messages.push(message.to_string());
        let transition = session.enter_from_token(&doc, doc.body(), "missing,gone", &mut notifier);

        assert!(messages.is_empty());
        assert_eq!(transition.status, FocusStatus::Failed);
        assert_eq!(transition.revert, entered.apply);
        assert!(transition.apply.is_none());
        assert!(!session.is_active());
    }

    #[test]
    fn test_share_token_round_trips_through_session() {
        let doc = parse_document(PAGE).unwrap();
        let target = doc.elements_by_tag(doc.body(), "p")[1];
        let mut session = FocusSession::default();
        session.enter(&doc, doc.body(), &[target]);

        let token = session.share_token(&doc, doc.body());
        let mut other = FocusSession::default();
        let transition = other.enter_from_token(&doc, doc.body(), &token, &mut |_: &str| {});

        assert_eq!(transition.status, FocusStatus::Complete);
        assert_eq!(other.targets(), &[target]);
    }

    #[test]
    fn test_empty_selection_shares_nothing() {
        let doc = parse_document(PAGE).unwrap();
        assert_eq!(FocusSession::default().share_token(&doc, doc.body()), "");
    }
}
