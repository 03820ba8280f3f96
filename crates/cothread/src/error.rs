use crate::types::ThreadId;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ThreadError {
    #[error("thread table is full")]
    TableFull,

    #[error("invalid join target: {0}")]
    InvalidJoinTarget(ThreadId),

    #[error("thread {0} was already joined")]
    AlreadyJoined(ThreadId),

    #[error("thread {0} cannot join itself")]
    JoinSelf(ThreadId),

    #[error("joining thread {0} would block while no thread is running")]
    NotRunning(ThreadId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    #[error("thread capacity must be at least 1")]
    NoThreads,

    #[error("stack size {size} is below the minimum of {min} bytes")]
    StackTooSmall { size: usize, min: usize },

    #[error("stack size {0} is not a multiple of 16")]
    MisalignedStack(usize),

    #[error("{max_threads} stacks of {stack_size} bytes overflow the address space")]
    BufferOverflow {
        max_threads: usize,
        stack_size: usize,
    },

    #[error("could not allocate a {0} byte stack buffer")]
    AllocationFailed(usize),

    #[error("stack buffer holds {actual} bytes, {required} required")]
    BufferTooSmall { required: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("runtime was already started")]
    AlreadyStarted,
}
