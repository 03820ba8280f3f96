mod scenario;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cothread::{Config, Runtime};
use scenario::Scenario;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a demo workload on the cooperative runtime
    Run {
        /// Workload to run
        #[arg(value_enum, default_value_t = Scenario::Join)]
        scenario: Scenario,

        /// Thread table capacity
        #[arg(long, default_value_t = cothread::config::MAX_THREADS)]
        max_threads: usize,

        /// Stack size in bytes for each thread
        #[arg(long, default_value_t = cothread::config::STACK_SIZE)]
        stack_size: usize,

        /// Yields performed by each worker in the round-robin workload
        #[arg(long, default_value_t = 3)]
        rounds: u32,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scenario,
            max_threads,
            stack_size,
            rounds,
        } => {
            let config = Config::new(max_threads, stack_size);
            println!(
                "Starting cothread runtime: {} threads, {} byte stacks",
                max_threads, stack_size
            );

            let runtime = Runtime::with_config(config)?;
            runtime.run(move |threads| scenario.run(threads, rounds))?;

            println!("All threads finished.");
        }
    }

    Ok(())
}
