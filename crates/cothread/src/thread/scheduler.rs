use crate::thread::table::ThreadTable;
use crate::types::ThreadId;

pub trait Scheduler {
    /// Select the next thread to run other than `current`.
    ///
    /// Returns `None` when no other thread is alive; the caller then decides
    /// between continuing `current` and draining the runtime.
    fn pick_next(&self, table: &ThreadTable, current: ThreadId) -> Option<ThreadId>;
}

/// Scans forward from the slot after `current`, wrapping at the end of the
/// table, and takes the first alive slot it meets.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoundRobinScheduler;

impl RoundRobinScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for RoundRobinScheduler {
    fn pick_next(&self, table: &ThreadTable, current: ThreadId) -> Option<ThreadId> {
        let capacity = table.capacity();
        (1..capacity)
            .map(|offset| ThreadId::new((current.index() + offset) % capacity))
            .find(|&id| table.state(id).is_some_and(|state| state.is_alive()))
    }
}
