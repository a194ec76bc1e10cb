//! Actions requested by the preview and consumed by the main loop.

use std::fmt;
use std::sync::mpsc::{channel, Receiver, Sender};

/// Discrete user request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Leave the interactive loop.
    Exit,
    /// Capture a full ray-traced picture from the current camera.
    TakePicture,
    /// Trace one diagnostic ray along the view direction.
    OneShot,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exit => write!(f, "exit"),
            Self::TakePicture => write!(f, "take picture"),
            Self::OneShot => write!(f, "one shot"),
        }
    }
}

/// Unbounded single-producer single-consumer FIFO of [`Action`]s.
///
/// The producer side is the preview's input handling, the consumer is the
/// orchestrator, which drains it completely once per frame.
pub struct ActionQueue {
    tx: Sender<Action>,
    rx: Receiver<Action>,
}

impl ActionQueue {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self { tx, rx }
    }

    pub fn push(&self, action: Action) {
        // Receiver lives in self, so the send cannot fail
        let _ = self.tx.send(action);
    }

    /// Oldest pending action, or `None` if the queue is empty.
    pub fn pop(&self) -> Option<Action> {
        self.rx.try_recv().ok()
    }
}

impl Default for ActionQueue {
    fn default() -> Self {
        Self::new()
    }
}
