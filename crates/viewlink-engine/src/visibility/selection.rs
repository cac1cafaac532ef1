use crate::dom::{Document, NodeId};

/// Elements a user has marked for sharing.
///
/// No member is ever an ancestor or descendant of another member: selecting
/// an element inside an already-selected container is a no-op, and selecting a
/// container absorbs any members inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    members: Vec<NodeId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `element`. Returns `false` when an ancestor already covers it.
    pub fn insert(&mut self, doc: &Document, element: NodeId) -> bool {
        if self.members.contains(&element)
            || self
                .members
                .iter()
                .any(|&member| doc.is_ancestor_of(member, element))
        {
            return false;
        }
        self.members
            .retain(|&member| !doc.is_ancestor_of(element, member));
        self.members.push(element);
        true
    }

    pub fn remove(&mut self, element: NodeId) -> bool {
        let before = self.members.len();
        self.members.retain(|&member| member != element);
        self.members.len() != before
    }

    /// Select `element` if it is not selected, deselect it otherwise.
    pub fn toggle(&mut self, doc: &Document, element: NodeId) -> bool {
        if self.remove(element) {
            return false;
        }
        self.insert(doc, element)
    }

    pub fn contains(&self, element: NodeId) -> bool {
        self.members.contains(&element)
    }

    pub fn as_slice(&self) -> &[NodeId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }
}
