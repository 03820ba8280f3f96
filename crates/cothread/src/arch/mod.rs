//! Saving and activating execution contexts.
//!
//! A [`SavedContext`] holds the callee-saved register state of a suspended
//! thread. [`switch`] stores the running state into one context and resumes
//! another; control comes back to the caller of `switch` only when some later
//! `switch` activates the context it saved.

/// Assembly symbol for `name`, versioned so that semver-incompatible copies
/// of this crate linked into one binary do not collide.
macro_rules! asm_symbol {
    ($name:literal) => {
        concat!(
            "cothread_",
            $name,
            "_v",
            env!("CARGO_PKG_VERSION_MAJOR"),
            "_",
            env!("CARGO_PKG_VERSION_MINOR"),
        )
    };
}

cfg_if::cfg_if! {
    if #[cfg(all(target_arch = "x86_64", unix, not(target_vendor = "apple")))] {
        mod x86_64;
        pub use self::x86_64::SavedContext;
        use self::x86_64 as current;
    } else if #[cfg(all(target_arch = "aarch64", unix, not(target_vendor = "apple")))] {
        mod aarch64;
        pub use self::aarch64::SavedContext;
        use self::aarch64 as current;
    } else {
        compile_error!("cothread supports x86_64 and aarch64 ELF targets only");
    }
}

use crate::stack::StackRegion;

/// First function a fresh context executes. Receives the `arg` given to
/// [`SavedContext::prepare`] and must never return.
pub type EntryFn = unsafe extern "C" fn(usize) -> !;

impl SavedContext {
    /// Builds a context that, once switched to, calls `entry(arg)` on `stack`.
    ///
    /// # Safety
    /// `stack` must be valid for writes and unused by any live context.
    pub unsafe fn prepare(stack: &StackRegion, entry: EntryFn, arg: usize) -> Self {
        current::prepare(stack.top(), entry, arg)
    }
}

/// Saves the running state into `from` and activates `to`.
///
/// # Safety
/// Both pointers must be valid. `to` must hold either a context produced by
/// [`SavedContext::prepare`] or one saved by an earlier `switch` that has not
/// been resumed since.
#[inline]
pub unsafe fn switch(from: *mut SavedContext, to: *const SavedContext) {
    current::switch(from, to)
}
