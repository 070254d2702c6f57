//! Single-slot auto-revert deadline.
//!
//! Holding the deadline in one `Option` makes "at most one revert armed" a
//! property of the type: arming overwrites, firing empties the slot.

/// An armed auto-revert, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevertSlot {
    deadline_ns: Option<u64>,
}

impl RevertSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm for `deadline_ns`, replacing whatever was armed before.
    /// Returns the deadline that was replaced.
    pub fn arm(&mut self, deadline_ns: u64) -> Option<u64> {
        self.deadline_ns.replace(deadline_ns)
    }

    /// Disarm. Returns the deadline that was cancelled.
    pub fn cancel(&mut self) -> Option<u64> {
        self.deadline_ns.take()
    }

    pub fn deadline_ns(&self) -> Option<u64> {
        self.deadline_ns
    }

    pub fn is_armed(&self) -> bool {
        self.deadline_ns.is_some()
    }

    /// Fire if the deadline has passed. A fired slot is empty afterwards.
    pub fn take_due(&mut self, now_ns: u64) -> Option<u64> {
        match self.deadline_ns {
            Some(deadline) if now_ns >= deadline => self.deadline_ns.take(),
            _ => None,
        }
    }
}
