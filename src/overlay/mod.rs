// Page overlay: binds to prompt fields, debounces edits, renders suggestions.
//
// Everything runs on one task. Timers and service requests are spawned tasks
// that report back through the controller's event channel.

pub mod controller;
pub mod detect;
pub mod highlight;
pub mod panel;
pub mod store;

pub use controller::OverlayController;
pub use store::ElementMap;

use crate::dom::NodeId;
use crate::service::worker::HandleError;
use crate::service::ServiceReply;

/// Outcome of one message to the service worker.
pub type Reply = Result<ServiceReply, HandleError>;

/// Independent debounce concerns; each element has at most one timer per concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Concern {
    Suggestion,
    Highlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Debouncing,
    Loading,
    Displaying,
}

#[derive(Debug)]
pub enum OverlayEvent {
    /// Content of an element changed.
    Input { target: NodeId },
    /// The document structure changed.
    Mutated,
    Click { target: NodeId },
    Hover { target: NodeId },
    Scroll { target: NodeId, top: i32, left: i32 },
    /// Text selection inside an element, as byte offsets into its value.
    Select {
        target: NodeId,
        start: usize,
        end: usize,
    },

    /// Delayed re-scan after init.
    Rescan,
    TimerFired {
        element: NodeId,
        concern: Concern,
        token: u64,
    },
    Settled {
        element: NodeId,
        cycle: u64,
        suggestion: Reply,
        options: Option<Reply>,
    },
    FadeDone { element: NodeId, node: NodeId },
}
