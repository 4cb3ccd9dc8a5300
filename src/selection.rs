//! Click-to-pick range selection
//!
//! The user arms "set start" or "set end", then clicks a message. Boundaries
//! are node identities; resolving them against the current message list
//! yields the inclusive range in document order.

use crate::page::NodeId;

/// What the next message click means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    #[default]
    Idle,
    PickingStart,
    PickingEnd,
}

/// Inputs to the selection state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent {
    SetStart,
    SetEnd,
    Cancel,
    MessageClicked(NodeId),
}

/// Result of applying an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Now waiting for a message click
    Armed(SelectionMode),
    StartPicked(NodeId),
    EndPicked(NodeId),
    Cleared,
    /// A click while idle; the host should handle it normally
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionRange {
    start: Option<NodeId>,
    end: Option<NodeId>,
    mode: SelectionMode,
}

impl SelectionRange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) -> Option<NodeId> {
        self.start
    }

    pub fn end(&self) -> Option<NodeId> {
        self.end
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Both boundaries picked
    pub fn is_complete(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    pub fn apply(&mut self, event: SelectionEvent) -> Transition {
        match (event, self.mode) {
            (SelectionEvent::SetStart, _) => {
                self.mode = SelectionMode::PickingStart;
                Transition::Armed(self.mode)
            }
            (SelectionEvent::SetEnd, _) => {
                self.mode = SelectionMode::PickingEnd;
                Transition::Armed(self.mode)
            }
            (SelectionEvent::Cancel, _) => {
                *self = Self::default();
                Transition::Cleared
            }
            (SelectionEvent::MessageClicked(_), SelectionMode::Idle) => Transition::Ignored,
            (SelectionEvent::MessageClicked(node), SelectionMode::PickingStart) => {
                self.start = Some(node);
                self.mode = SelectionMode::Idle;
                Transition::StartPicked(node)
            }
            (SelectionEvent::MessageClicked(node), SelectionMode::PickingEnd) => {
                self.end = Some(node);
                self.mode = SelectionMode::Idle;
                Transition::EndPicked(node)
            }
        }
    }

    /// The picked range within `messages` (all message nodes in document
    /// order). Empty when incomplete or when a boundary is gone.
    pub fn resolve(&self, messages: &[NodeId]) -> Vec<NodeId> {
        match (self.start, self.end) {
            (Some(a), Some(b)) => elements_in_range(messages, a, b),
            _ => Vec::new(),
        }
    }

    /// Nodes to highlight: the full range when complete, else the one picked boundary
    pub fn highlighted(&self, messages: &[NodeId]) -> Vec<NodeId> {
        match (self.start, self.end) {
            (Some(_), Some(_)) => self.resolve(messages),
            (Some(node), None) | (None, Some(node)) => vec![node],
            (None, None) => Vec::new(),
        }
    }
}

/// Inclusive slice of `messages` between `a` and `b`, in either order.
pub fn elements_in_range(messages: &[NodeId], a: NodeId, b: NodeId) -> Vec<NodeId> {
    let (Some(i), Some(j)) = (
        messages.iter().position(|n| *n == a),
        messages.iter().position(|n| *n == b),
    ) else {
        return Vec::new();
    };
    messages[i.min(j)..=i.max(j)].to_vec()
}
