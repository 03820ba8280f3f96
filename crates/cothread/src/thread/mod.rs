pub mod scheduler;
pub mod table;
pub mod tcb;

use crate::arch::{self, SavedContext};
use crate::error::ThreadError;
use crate::stack::StackRegion;
use crate::types::ThreadId;
use core::cell::{Cell, UnsafeCell};
use log::{debug, error, trace, warn};
use scheduler::{RoundRobinScheduler, Scheduler};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use table::ThreadTable;
use tcb::{ThreadEntry, ThreadState};

/// Plain-function entry point taking the argument passed to `create`.
pub type EntryPoint = fn(&ThreadManager, i32);

/// Owns the thread table and the scheduler cursor, and moves the single
/// execution stream between logical threads.
///
/// Every method is called from whichever logical thread currently runs;
/// because only one ever runs, state lives in `Cell`s and no method holds a
/// borrow across a context switch.
pub struct ThreadManager {
    table: ThreadTable,
    scheduler: Box<dyn Scheduler>,
    current_thread: Cell<ThreadId>,
    /// Context of the driver that called `Runtime::run`.
    host: UnsafeCell<SavedContext>,
    running: Cell<bool>,
    panic: Cell<Option<Box<dyn Any + Send>>>,
}

impl ThreadManager {
    pub(crate) fn new(stacks: Vec<StackRegion>) -> Self {
        let table = ThreadTable::new(stacks);
        table.slot(ThreadId::MAIN).set_state(ThreadState::Alive);
        Self {
            table,
            scheduler: Box::new(RoundRobinScheduler::new()),
            current_thread: Cell::new(ThreadId::MAIN),
            host: UnsafeCell::new(SavedContext::default()),
            running: Cell::new(false),
            panic: Cell::new(None),
        }
    }

    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn current_id(&self) -> ThreadId {
        self.current_thread.get()
    }

    /// State of slot `id`, or `None` if `id` is out of range.
    pub fn state(&self, id: ThreadId) -> Option<ThreadState> {
        self.table.state(id)
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Makes `entry(arg)` runnable in the lowest unused slot.
    ///
    /// The new thread does not run until the scheduler selects it.
    pub fn create(&self, entry: EntryPoint, arg: i32) -> Result<ThreadId, ThreadError> {
        self.spawn(move |threads| entry(threads, arg))
    }

    /// Closure flavour of [`create`](Self::create).
    pub fn spawn<F>(&self, f: F) -> Result<ThreadId, ThreadError>
    where
        F: FnOnce(&ThreadManager) + 'static,
    {
        let id = self.table.first_unused().ok_or(ThreadError::TableFull)?;
        self.prepare_slot(id, Box::new(f));
        debug!("created thread {}", id);
        Ok(id)
    }

    fn prepare_slot(&self, id: ThreadId, entry: ThreadEntry) {
        let tcb = self.table.slot(id);
        tcb.set_state(ThreadState::Alive);
        tcb.set_entry(entry);
        self.prepare_context(id);
    }

    fn prepare_context(&self, id: ThreadId) {
        let tcb = self.table.slot(id);
        // SAFETY: the slot has not started running and its stack region is
        // reserved for it, so nothing else lives on that stack.
        unsafe {
            *tcb.context_ptr() =
                SavedContext::prepare(tcb.stack(), thread_start, self as *const Self as usize);
        }
    }

    /// Hands the execution stream to the next alive thread, if any.
    ///
    /// Returns immediately when the caller is the only alive thread.
    pub fn yield_now(&self) {
        if !self.running.get() {
            warn!("yield_now called outside of a running thread");
            return;
        }
        self.reschedule();
    }

    /// Waits for thread `id` to finish and reaps it, returning its exit value.
    pub fn join(&self, id: ThreadId) -> Result<i32, ThreadError> {
        let tcb = self
            .table
            .get(id)
            .filter(|tcb| !tcb.state().is_unused())
            .ok_or(ThreadError::InvalidJoinTarget(id))?;

        if tcb.state().is_alive() {
            if !self.running.get() {
                return Err(ThreadError::NotRunning(id));
            }
            if id == self.current_id() {
                return Err(ThreadError::JoinSelf(id));
            }
        }

        while tcb.state().is_alive() {
            self.reschedule();
        }

        match tcb.state() {
            ThreadState::Zombie { exit_value } => {
                tcb.set_state(ThreadState::Unused);
                debug!(
                    "thread {} joined {} (exit value {})",
                    self.current_id(),
                    id,
                    exit_value
                );
                Ok(exit_value)
            }
            _ => {
                debug!("thread {} lost the join race for {}", self.current_id(), id);
                Err(ThreadError::AlreadyJoined(id))
            }
        }
    }

    /// Ends the calling thread with `result` as its exit value.
    pub fn finish(&self, result: i32) -> ! {
        assert!(self.running.get(), "finish called outside of a running thread");
        let current = self.current_id();
        debug!("thread {} finished with {}", current, result);
        self.table
            .slot(current)
            .set_state(ThreadState::Zombie { exit_value: result });
        self.reschedule();
        unreachable!("finished thread {} was resumed", current);
    }

    /// Switches to the next alive thread; drains back to the driver when the
    /// current thread is no longer alive and nothing else is.
    fn reschedule(&self) {
        let current = self.current_id();
        match self.scheduler.pick_next(&self.table, current) {
            Some(next) => self.switch_to(current, next),
            None if self.table.slot(current).state().is_alive() => {}
            None => self.drain(current),
        }
    }

    fn switch_to(&self, from: ThreadId, to: ThreadId) {
        let from_tcb = self.table.slot(from);
        self.check_stack(from, from_tcb.stack());
        trace!("switch {} -> {}", from, to);
        self.current_thread.set(to);
        // SAFETY: `to` is alive, so its context was prepared by create or
        // saved by its own last switch. No borrow of the table is held.
        unsafe { arch::switch(from_tcb.context_ptr(), self.table.slot(to).context_ptr()) }
    }

    fn drain(&self, from: ThreadId) {
        self.check_stack(from, self.table.slot(from).stack());
        debug!("no alive thread left after {}", from);
        self.return_to_host();
    }

    fn return_to_host(&self) {
        self.running.set(false);
        let mut discarded = SavedContext::default();
        // SAFETY: the host context was saved by `start`, which is suspended
        // until exactly this switch.
        unsafe { arch::switch(&mut discarded, self.host.get()) }
    }

    /// Panics, inside the thread's own unwind boundary, once the canary at
    /// the base of its stack has been overwritten.
    fn check_stack(&self, id: ThreadId, stack: &StackRegion) {
        if !stack.canary_intact() {
            error!("thread {} overflowed its stack", id);
            panic!("thread {} overflowed its stack", id);
        }
    }

    /// Runs `main` as slot 0 and returns once every thread has finished or
    /// one of them panicked. Called once by the driver.
    pub(crate) fn start(&self, main: ThreadEntry) {
        let main_tcb = self.table.slot(ThreadId::MAIN);
        debug_assert!(main_tcb.state().is_alive());
        main_tcb.set_entry(main);
        // Threads created before run captured wherever the runtime lived at
        // the time; rebuild every pending context against this address.
        for (id, _) in self.table.iter().filter(|(_, tcb)| tcb.state().is_alive()) {
            self.prepare_context(id);
        }
        self.current_thread.set(ThreadId::MAIN);
        self.running.set(true);
        // SAFETY: both contexts are valid; control returns here from drain.
        unsafe { arch::switch(self.host.get(), main_tcb.context_ptr()) }
    }

    pub(crate) fn take_panic(&self) -> Option<Box<dyn Any + Send>> {
        self.panic.take()
    }

    fn run_current(&self) -> ! {
        let id = self.current_id();
        let entry = self.table.slot(id).take_entry();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            if let Some(entry) = entry {
                entry(self);
            }
            self.finish(0);
        }));
        if let Err(payload) = outcome {
            error!("thread {} panicked", id);
            self.table
                .slot(id)
                .set_state(ThreadState::Zombie { exit_value: -1 });
            self.panic.set(Some(payload));
            self.return_to_host();
        }
        unreachable!("thread {} was resumed after it ended", id);
    }
}

extern "C" fn thread_start(manager: usize) -> ! {
    // SAFETY: `manager` is the address of the ThreadManager that prepared
    // this context; it is borrowed by `Runtime::run` for as long as any
    // thread can be running.
    let manager = unsafe { &*(manager as *const ThreadManager) };
    manager.run_current()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, MIN_STACK_SIZE};
    use crate::stack::StackBuffer;

    fn manager(max_threads: usize) -> (StackBuffer, ThreadManager) {
        let config = Config::new(max_threads, MIN_STACK_SIZE);
        let buffer = StackBuffer::from(config.allocate_stacks().unwrap());
        let manager = ThreadManager::new(buffer.partition(&config).unwrap());
        (buffer, manager)
    }

    fn noop(_: &ThreadManager, _: i32) {}

    #[test]
    fn main_slot_starts_alive() {
        let (_buffer, threads) = manager(4);
        assert_eq!(threads.current_id(), ThreadId::MAIN);
        assert_eq!(threads.state(ThreadId::MAIN), Some(ThreadState::Alive));
        assert_eq!(threads.state(ThreadId::new(1)), Some(ThreadState::Unused));
        assert!(!threads.is_running());
    }

    #[test]
    fn create_fills_lowest_slots_then_fails() {
        let (_buffer, threads) = manager(3);
        assert_eq!(threads.create(noop, 1), Ok(ThreadId::new(1)));
        assert_eq!(threads.create(noop, 2), Ok(ThreadId::new(2)));
        assert_eq!(threads.create(noop, 3), Err(ThreadError::TableFull));
        assert_eq!(threads.current_id(), ThreadId::MAIN);
    }

    #[test]
    fn join_rejects_bad_targets_without_blocking() {
        let (_buffer, threads) = manager(3);
        assert_eq!(
            threads.join(ThreadId::new(3)),
            Err(ThreadError::InvalidJoinTarget(ThreadId::new(3)))
        );
        assert_eq!(
            threads.join(ThreadId::new(2)),
            Err(ThreadError::InvalidJoinTarget(ThreadId::new(2)))
        );
    }

    #[test]
    fn host_join_reaps_zombie_but_never_blocks() {
        let (_buffer, threads) = manager(3);
        let id = threads.create(noop, 0).unwrap();
        assert_eq!(threads.join(id), Err(ThreadError::NotRunning(id)));

        threads
            .table
            .slot(id)
            .set_state(ThreadState::Zombie { exit_value: 42 });
        assert_eq!(threads.join(id), Ok(42));
        assert_eq!(threads.state(id), Some(ThreadState::Unused));
        assert_eq!(threads.join(id), Err(ThreadError::InvalidJoinTarget(id)));
        assert_eq!(threads.create(noop, 0), Ok(id));
    }

    #[test]
    #[should_panic(expected = "finish called outside of a running thread")]
    fn finish_outside_run_panics() {
        let (_buffer, threads) = manager(2);
        threads.finish(1);
    }

    #[test]
    fn overflow_of_the_last_thread_is_reported() {
        let config = Config::new(2, crate::config::STACK_SIZE);
        let buffer = StackBuffer::from(config.allocate_stacks().unwrap());
        let threads = ThreadManager::new(buffer.partition(&config).unwrap());
        threads.start(Box::new(|threads: &ThreadManager| {
            let stack = threads.table.slot(threads.current_id()).stack();
            unsafe { stack.base().write(0) };
        }));

        assert!(!threads.is_running());
        let payload = threads.take_panic().expect("overflow was not reported");
        let message = payload.downcast_ref::<String>().unwrap();
        assert_eq!(message, "thread 0 overflowed its stack");
    }

    #[test]
    fn yield_outside_run_is_a_noop() {
        let (_buffer, threads) = manager(2);
        threads.create(noop, 0).unwrap();
        threads.yield_now();
        assert_eq!(threads.current_id(), ThreadId::MAIN);
    }
}
