use crate::stack::StackRegion;
use crate::thread::tcb::{ThreadControlBlock, ThreadState};
use crate::types::ThreadId;

/// Fixed-capacity array of thread control blocks. The slot index is the
/// thread id.
pub struct ThreadTable {
    slots: Box<[ThreadControlBlock]>,
}

impl ThreadTable {
    pub(crate) fn new(stacks: Vec<StackRegion>) -> Self {
        Self {
            slots: stacks.into_iter().map(ThreadControlBlock::new).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, id: ThreadId) -> Option<&ThreadControlBlock> {
        self.slots.get(id.index())
    }

    /// Panics if `id` is out of range; callers pass ids the table handed out.
    pub(crate) fn slot(&self, id: ThreadId) -> &ThreadControlBlock {
        &self.slots[id.index()]
    }

    pub fn state(&self, id: ThreadId) -> Option<ThreadState> {
        self.get(id).map(ThreadControlBlock::state)
    }

    /// Lowest-indexed unused slot.
    pub fn first_unused(&self) -> Option<ThreadId> {
        self.slots
            .iter()
            .position(|tcb| tcb.state().is_unused())
            .map(ThreadId::new)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ThreadId, &ThreadControlBlock)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, tcb)| (ThreadId::new(i), tcb))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{Config, MIN_STACK_SIZE};
    use crate::stack::StackBuffer;

    /// Table with the given states; the buffer must outlive the table.
    pub(crate) fn table_with(states: &[ThreadState]) -> (StackBuffer, ThreadTable) {
        let config = Config::new(states.len(), MIN_STACK_SIZE);
        let buffer = StackBuffer::from(config.allocate_stacks().unwrap());
        let table = ThreadTable::new(buffer.partition(&config).unwrap());
        for (i, state) in states.iter().enumerate() {
            table.slot(ThreadId::new(i)).set_state(*state);
        }
        (buffer, table)
    }

    #[test]
    fn fresh_table_is_unused() {
        let (_buffer, table) = table_with(&[ThreadState::Unused; 3]);
        assert_eq!(table.capacity(), 3);
        assert!(table.iter().all(|(_, tcb)| tcb.state().is_unused()));
        assert_eq!(table.first_unused(), Some(ThreadId::new(0)));
    }

    #[test]
    fn first_unused_picks_lowest_index() {
        let (_buffer, table) = table_with(&[
            ThreadState::Alive,
            ThreadState::Zombie { exit_value: 3 },
            ThreadState::Unused,
            ThreadState::Unused,
        ]);
        assert_eq!(table.first_unused(), Some(ThreadId::new(2)));

        table.slot(ThreadId::new(2)).set_state(ThreadState::Alive);
        table.slot(ThreadId::new(3)).set_state(ThreadState::Alive);
        assert_eq!(table.first_unused(), None);
    }

    #[test]
    fn out_of_range_lookups_are_none() {
        let (_buffer, table) = table_with(&[ThreadState::Alive; 2]);
        assert!(table.get(ThreadId::new(2)).is_none());
        assert_eq!(table.state(ThreadId::new(7)), None);
        assert_eq!(table.state(ThreadId::new(1)), Some(ThreadState::Alive));
    }
}
