use crate::arch::SavedContext;
use crate::stack::StackRegion;
use crate::thread::ThreadManager;
use core::cell::{Cell, UnsafeCell};

/// Body of a logical thread.
pub type ThreadEntry = Box<dyn FnOnce(&ThreadManager)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Unused,
    Alive,
    /// Finished but not yet joined.
    Zombie { exit_value: i32 },
}

impl ThreadState {
    pub fn is_alive(&self) -> bool {
        matches!(self, ThreadState::Alive)
    }

    pub fn is_unused(&self) -> bool {
        matches!(self, ThreadState::Unused)
    }
}

pub struct ThreadControlBlock {
    state: Cell<ThreadState>,
    context: UnsafeCell<SavedContext>,
    stack: StackRegion,
    entry: Cell<Option<ThreadEntry>>,
}

impl ThreadControlBlock {
    pub(crate) fn new(stack: StackRegion) -> Self {
        Self {
            state: Cell::new(ThreadState::Unused),
            context: UnsafeCell::new(SavedContext::default()),
            stack,
            entry: Cell::new(None),
        }
    }

    pub fn state(&self) -> ThreadState {
        self.state.get()
    }

    pub(crate) fn set_state(&self, state: ThreadState) {
        self.state.set(state);
    }

    pub fn stack(&self) -> &StackRegion {
        &self.stack
    }

    pub(crate) fn context_ptr(&self) -> *mut SavedContext {
        self.context.get()
    }

    pub(crate) fn set_entry(&self, entry: ThreadEntry) {
        self.entry.set(Some(entry));
    }

    pub(crate) fn take_entry(&self) -> Option<ThreadEntry> {
        self.entry.take()
    }
}
