//! Resolve anchor descriptors against a live document.
//!
//! Resolution short-circuits on the first confident match:
//!
//! 1. **Id shortcut**: every element sharing the descriptor's id. An id-only
//!    descriptor whose id is gone fails here.
//! 2. **Scope narrowing**: search below the recorded id'd ancestor when it
//!    still exists.
//! 3. **Structural shortcut**: the same-tag element at the recorded position,
//!    if its text hash is unchanged.
//! 4. **Scored scan**: score every same-tag candidate by hash, snippet and
//!    position, and accept the best one only above the confidence floor.

use serde::{Deserialize, Serialize};

use super::{AnchorDescriptor, AnchorTag};
use crate::dom::text::{normalize_text, text_hash};
use crate::dom::{Document, NodeId};

/// Scores used by the fallback scan.
///
/// The defaults are empirically chosen; they are configurable policy rather
/// than derived constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPolicy {
    /// Awarded when the candidate's full text hash matches.
    pub hash_score: u32,
    /// Awarded instead of `hash_score` when only the snippet prefix matches.
    pub snippet_score: u32,
    /// Awarded additionally when the candidate sits at the recorded position.
    pub index_score: u32,
    /// A candidate reaching this score is returned without scanning further.
    pub certain_score: u32,
    /// The best candidate must score strictly above this to be returned.
    pub min_score: u32,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            hash_score: 50,
            snippet_score: 30,
            index_score: 10,
            certain_score: 60,
            min_score: 30,
        }
    }
}

/// Outcome of resolving a list of descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Resolved elements, de-duplicated, in the order they were first resolved.
    pub elements: Vec<NodeId>,
    /// Number of descriptors that were asked for.
    pub requested: usize,
    /// Number of descriptors that resolved to nothing.
    pub unresolved: usize,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.unresolved == 0
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnchorResolver {
    policy: MatchPolicy,
}

impl AnchorResolver {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    /// Find the live element(s) a descriptor refers to.
    ///
    /// Returns more than one element only through the id shortcut, when the
    /// document carries duplicate ids. An empty result means the descriptor
    /// could not be matched with enough confidence.
    pub fn resolve(&self, doc: &Document, root: NodeId, descriptor: &AnchorDescriptor) -> Vec<NodeId> {
        if let Some(id) = &descriptor.element_id {
            let matches = doc.elements_by_id(id);
            if !matches.is_empty() {
                return matches;
            }
        }

        let AnchorTag::Tag(tag) = &descriptor.tag else {
            return Vec::new();
        };

        let scope = descriptor
            .parent_id
            .as_deref()
            .and_then(|parent_id| {
                doc.find_by_id_within(root, parent_id)
                    .or_else(|| doc.elements_by_id(parent_id).first().copied())
            })
            .unwrap_or(root);

        let candidates = doc.elements_by_tag(scope, tag);

        if let Some(&candidate) = candidates.get(descriptor.index)
            && live_hash(doc, candidate) == descriptor.text_hash
        {
            return vec![candidate];
        }

        self.scan(doc, &candidates, descriptor)
            .map(|found| vec![found])
            .unwrap_or_default()
    }

    fn scan(
        &self,
        doc: &Document,
        candidates: &[NodeId],
        descriptor: &AnchorDescriptor,
    ) -> Option<NodeId> {
        let mut best: Option<(NodeId, u32)> = None;

        for (position, &candidate) in candidates.iter().enumerate() {
            let text = normalize_text(&doc.text_content(candidate));
            let mut score = 0;
            if text_hash(&text) == descriptor.text_hash {
                score += self.policy.hash_score;
            } else if text.starts_with(&descriptor.text_snippet) {
                score += self.policy.snippet_score;
            }
            if position == descriptor.index {
                score += self.policy.index_score;
            }

            if score >= self.policy.certain_score {
                return Some(candidate);
            }
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((candidate, score));
            }
        }

        best.filter(|&(_, score)| score > self.policy.min_score)
            .map(|(candidate, _)| candidate)
    }

    /// Resolve every descriptor, recording how many failed.
    pub fn resolve_all(
        &self,
        doc: &Document,
        root: NodeId,
        descriptors: &[AnchorDescriptor],
    ) -> Resolution {
        let mut resolution = Resolution {
            requested: descriptors.len(),
            ..Resolution::default()
        };
        for descriptor in descriptors {
            let found = self.resolve(doc, root, descriptor);
            if found.is_empty() {
                resolution.unresolved += 1;
                continue;
            }
            for element in found {
                if !resolution.elements.contains(&element) {
                    resolution.elements.push(element);
                }
            }
        }
        resolution
    }
}

fn live_hash(doc: &Document, element: NodeId) -> u32 {
    text_hash(&normalize_text(&doc.text_content(element)))
}
