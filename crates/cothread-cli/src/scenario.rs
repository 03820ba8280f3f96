use clap::ValueEnum;
use cothread::{ThreadError, ThreadId, ThreadManager};
use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Main joins a worker that yields before finishing
    Join,
    /// Every free slot runs a worker that prints and yields each round
    RoundRobin,
    /// Two workers race to join the same target
    DoubleJoin,
    /// Create threads until the table is full, then reap them all
    Fill,
}

impl Scenario {
    pub fn run(self, threads: &ThreadManager, rounds: u32) {
        match self {
            Scenario::Join => join(threads),
            Scenario::RoundRobin => round_robin(threads, rounds),
            Scenario::DoubleJoin => double_join(threads),
            Scenario::Fill => fill(threads),
        }
    }
}

fn worker(threads: &ThreadManager, arg: i32) {
    println!("Thread {}: started with {}", threads.current_id(), arg);
    threads.yield_now();
    println!("Thread {}: finishing with {}", threads.current_id(), arg * 10);
    threads.finish(arg * 10);
}

fn join(threads: &ThreadManager) {
    let first = report_create(threads, worker, 1);
    let second = report_create(threads, worker, 2);

    for id in [first, second].into_iter().flatten() {
        report_join(threads, id);
    }
}

fn round_robin(threads: &ThreadManager, rounds: u32) {
    let mut spawned = 0;
    loop {
        let result = threads.spawn(move |threads| {
            for round in 0..rounds {
                println!("Thread {}: round {}", threads.current_id(), round);
                threads.yield_now();
            }
        });
        match result {
            Ok(_) => spawned += 1,
            Err(ThreadError::TableFull) => break,
            Err(e) => {
                println!("spawn failed: {}", e);
                break;
            }
        }
    }
    info!("spawned {} round-robin workers", spawned);
    // Main returns here; the workers keep the runtime alive.
}

fn double_join(threads: &ThreadManager) {
    let Some(target) = report_create(threads, worker, 42) else {
        return;
    };
    for _ in 0..2 {
        let result = threads.spawn(move |threads| {
            match threads.join(target) {
                Ok(value) => println!(
                    "Thread {}: reaped {} with {}",
                    threads.current_id(),
                    target,
                    value
                ),
                Err(e) => println!("Thread {}: {}", threads.current_id(), e),
            }
        });
        if let Err(e) = result {
            println!("spawn failed: {}", e);
        }
    }
}

fn fill(threads: &ThreadManager) {
    let mut created = Vec::new();
    let mut arg = 1;
    while let Some(id) = report_create(threads, worker, arg) {
        created.push(id);
        arg += 1;
    }
    for id in created {
        report_join(threads, id);
    }
}

fn report_create(
    threads: &ThreadManager,
    entry: fn(&ThreadManager, i32),
    arg: i32,
) -> Option<ThreadId> {
    match threads.create(entry, arg) {
        Ok(id) => {
            println!("Thread {}: created thread {}", threads.current_id(), id);
            Some(id)
        }
        Err(e) => {
            println!("Thread {}: create failed: {}", threads.current_id(), e);
            None
        }
    }
}

fn report_join(threads: &ThreadManager, id: ThreadId) {
    match threads.join(id) {
        Ok(value) => println!(
            "Thread {}: joined thread {} with exit value {}",
            threads.current_id(),
            id,
            value
        ),
        Err(e) => println!("Thread {}: join failed: {}", threads.current_id(), e),
    }
}
