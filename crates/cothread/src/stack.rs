use crate::config::Config;
use crate::error::InitError;
use core::ptr::NonNull;

const CANARY: u64 = 0x5AFE_C0DE_57AC_CA11;

/// Caller-supplied memory that backs every thread stack.
///
/// The buffer is carved into `max_threads` regions of `stack_size` bytes;
/// slot `i` owns the region at offset `i * stack_size`.
pub struct StackBuffer {
    ptr: NonNull<[u8]>,
}

impl StackBuffer {
    pub fn new(buffer: Box<[u8]>) -> Self {
        // Leaked into a raw pointer so that running threads may write through
        // their regions while the buffer is owned here. Reclaimed in Drop.
        let ptr = NonNull::from(Box::leak(buffer));
        Self { ptr }
    }

    pub fn len(&self) -> usize {
        self.ptr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Splits the buffer into one region per slot.
    pub(crate) fn partition(&self, config: &Config) -> Result<Vec<StackRegion>, InitError> {
        config.validate()?;
        let required = config.required_buffer_len()?;
        if self.len() < required {
            return Err(InitError::BufferTooSmall {
                required,
                actual: self.len(),
            });
        }

        let base = self.ptr.as_ptr() as *mut u8;
        let regions = (0..config.max_threads)
            .map(|i| {
                // SAFETY: i * stack_size + stack_size <= required <= len
                let region = StackRegion {
                    base: unsafe { base.add(i * config.stack_size) },
                    len: config.stack_size,
                };
                region.plant_canary();
                region
            })
            .collect();
        Ok(regions)
    }
}

impl From<Box<[u8]>> for StackBuffer {
    fn from(buffer: Box<[u8]>) -> Self {
        Self::new(buffer)
    }
}

impl From<Vec<u8>> for StackBuffer {
    fn from(buffer: Vec<u8>) -> Self {
        Self::new(buffer.into_boxed_slice())
    }
}

impl Drop for StackBuffer {
    fn drop(&mut self) {
        // SAFETY: ptr came from Box::leak in new() and is dropped once.
        drop(unsafe { Box::from_raw(self.ptr.as_ptr()) });
    }
}

/// One slot's stack: `len` bytes starting at `base`, growing down from `top()`.
#[derive(Debug, Clone, Copy)]
pub struct StackRegion {
    base: *mut u8,
    len: usize,
}

impl StackRegion {
    pub fn base(&self) -> *mut u8 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the highest byte of the region, aligned down to 16.
    pub fn top(&self) -> *mut u8 {
        let end = self.base as usize + self.len;
        (end & !0xF) as *mut u8
    }

    fn plant_canary(&self) {
        // SAFETY: regions are at least MIN_STACK_SIZE bytes long.
        unsafe { (self.base as *mut u64).write_unaligned(CANARY) }
    }

    /// False once a thread has run past the bottom of its stack.
    pub fn canary_intact(&self) -> bool {
        // SAFETY: see plant_canary.
        unsafe { (self.base as *const u64).read_unaligned() == CANARY }
    }
}
