use crate::error::InitError;

/// Default thread table capacity.
pub const MAX_THREADS: usize = 16;

/// Default bytes per thread stack.
pub const STACK_SIZE: usize = 256 * 1024;

/// Smallest stack a thread may be given.
pub const MIN_STACK_SIZE: usize = 16 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub max_threads: usize,
    pub stack_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_threads: MAX_THREADS,
            stack_size: STACK_SIZE,
        }
    }
}

impl Config {
    pub fn new(max_threads: usize, stack_size: usize) -> Self {
        Self {
            max_threads,
            stack_size,
        }
    }

    /// Bytes a stack buffer must hold for this configuration.
    pub fn required_buffer_len(&self) -> Result<usize, InitError> {
        self.max_threads
            .checked_mul(self.stack_size)
            .filter(|&len| len <= isize::MAX as usize)
            .ok_or(InitError::BufferOverflow {
                max_threads: self.max_threads,
                stack_size: self.stack_size,
            })
    }

    /// Allocates a zeroed buffer large enough for every slot's stack.
    pub fn allocate_stacks(&self) -> Result<Box<[u8]>, InitError> {
        self.validate()?;
        let len = self.required_buffer_len()?;
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(len)
            .map_err(|_| InitError::AllocationFailed(len))?;
        buffer.resize(len, 0u8);
        Ok(buffer.into_boxed_slice())
    }

    pub fn validate(&self) -> Result<(), InitError> {
        if self.max_threads == 0 {
            return Err(InitError::NoThreads);
        }
        if self.stack_size < MIN_STACK_SIZE {
            return Err(InitError::StackTooSmall {
                size: self.stack_size,
                min: MIN_STACK_SIZE,
            });
        }
        if self.stack_size % 16 != 0 {
            return Err(InitError::MisalignedStack(self.stack_size));
        }
        self.required_buffer_len().map(|_| ())
    }
}
