use core::fmt;

/// Thread identifier. The value is the thread's slot index in the table.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ThreadId(usize);

impl ThreadId {
    /// Slot reserved for the thread that `Runtime::run` starts.
    pub const MAIN: ThreadId = ThreadId(0);

    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for ThreadId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}
