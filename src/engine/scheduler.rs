//! Cooperative timer queue for the control thread
//!
//! Controllers never spawn threads or hold callbacks. They schedule a plain
//! [`TimerAction`] against the render clock and cancel by owner. The engine drains
//! due entries from `poll()` and routes each back to its owner.

/// Which controller a timer belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerOwner {
    Sweep,
    Siren,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Apply sweep step `n`
    SweepStep(u32),
    /// End the siren instance with this generation
    SirenAutoStop { generation: u32 },
}

#[derive(Debug, Clone)]
struct TimerEntry {
    due: f64,
    owner: TimerOwner,
    action: TimerAction,
}

/// Timers ordered by due time, ties broken by scheduling order
#[derive(Debug, Default)]
pub struct TimerQueue {
    entries: Vec<TimerEntry>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` at `due` seconds on the render clock
    pub fn schedule(&mut self, owner: TimerOwner, due: f64, action: TimerAction) {
        let index = self.entries.partition_point(|e| e.due <= due);
        self.entries.insert(
            index,
            TimerEntry {
                due,
                owner,
                action,
            },
        );
    }

    /// Cancel every timer held by `owner`, returning how many were dropped
    pub fn cancel_owner(&mut self, owner: TimerOwner) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.owner != owner);
        before - self.entries.len()
    }

    /// Remove and return the earliest timer due at or before `now`
    pub fn pop_due(&mut self, now: f64) -> Option<(TimerOwner, TimerAction)> {
        match self.entries.first() {
            Some(entry) if entry.due <= now => {
                let entry = self.entries.remove(0);
                Some((entry.owner, entry.action))
            }
            _ => None,
        }
    }

    pub fn next_due(&self) -> Option<f64> {
        self.entries.first().map(|e| e.due)
    }

    pub fn pending_for(&self, owner: TimerOwner) -> usize {
        self.entries.iter().filter(|e| e.owner == owner).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
