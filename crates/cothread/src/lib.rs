pub mod arch;
pub mod config;
pub mod error;
pub mod stack;
pub mod thread;
pub mod types;

pub use crate::config::Config;
pub use crate::error::{InitError, RuntimeError, ThreadError};
pub use crate::stack::StackBuffer;
pub use crate::thread::tcb::ThreadState;
pub use crate::thread::{EntryPoint, ThreadManager};
pub use crate::types::ThreadId;

use core::cell::Cell;
use log::info;
use std::panic;

/// Cooperative runtime: a fixed thread table multiplexed onto the calling
/// OS thread.
///
/// [`init`](Runtime::init) partitions the stack buffer and reserves slot 0;
/// [`run`](Runtime::run) starts slot 0 and returns once no thread is left
/// alive.
pub struct Runtime {
    config: Config,
    threads: ThreadManager,
    // Declared after `threads` so the stacks outlive every control block.
    _stacks: StackBuffer,
    started: Cell<bool>,
}

impl Runtime {
    pub fn init(config: Config, stacks: impl Into<StackBuffer>) -> Result<Self, InitError> {
        let stacks = stacks.into();
        let regions = stacks.partition(&config)?;
        info!(
            "cothread runtime: {} threads, {} byte stacks",
            config.max_threads, config.stack_size
        );
        Ok(Self {
            config,
            threads: ThreadManager::new(regions),
            _stacks: stacks,
            started: Cell::new(false),
        })
    }

    /// `init` with a freshly allocated buffer sized for `config`.
    pub fn with_config(config: Config) -> Result<Self, InitError> {
        let stacks = config.allocate_stacks()?;
        Self::init(config, stacks)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn threads(&self) -> &ThreadManager {
        &self.threads
    }

    /// Runs `main` as thread 0 until every thread has finished.
    ///
    /// Threads created through [`threads`](Runtime::threads) beforehand are
    /// runnable as soon as `main` yields. A panic in any thread stops the
    /// runtime and is resumed here.
    ///
    /// Stacks have no guard pages. Overflow detection is best-effort: a
    /// canary word at the base of each stack is checked whenever its thread
    /// is switched out, so an overflow that skips the canary, or that has
    /// already clobbered the neighbouring stack, can go unnoticed.
    pub fn run<F>(&self, main: F) -> Result<(), RuntimeError>
    where
        F: FnOnce(&ThreadManager) + 'static,
    {
        if self.started.replace(true) {
            return Err(RuntimeError::AlreadyStarted);
        }

        info!("starting main thread");
        self.threads.start(Box::new(main));

        if let Some(payload) = self.threads.take_panic() {
            panic::resume_unwind(payload);
        }
        info!("no runnable threads left, runtime drained");
        Ok(())
    }
}
