pub mod anchors;
pub mod dom;
pub mod view_state;
pub mod visibility;

// Re-export key types for easier usage
pub use anchors::{AnchorDescriptor, AnchorResolver, AnchorTag, MatchPolicy, Resolution};
pub use dom::{Document, ElementKind, NodeId};
pub use view_state::{
    KeyValueStore, MemoryStore, PageElementRegistry, PlaceholderBindings, ToggleState,
    ViewState, ViewStateDelta, ViewStateStore,
};
pub use visibility::{
    DividerGroup, ExclusionRules, FocusSession, FocusStatus, FocusTransition, Notifier,
    SelectionSet, VisibilityPlan, VisibilityPlanner,
};
