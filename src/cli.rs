use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use rwgate::{
    bench::BenchConfig, cache::CacheDemoConfig, critical_section::DEFAULT_SPIN_BUDGET, Strategy,
};

/// Drives the writer-preferring rwlock: a load test and a shared cache workload.
#[derive(Parser)]
#[command(name = "rwgate", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// error, warn, info, debug, trace or off (falls back to RWGATE_LOG, then warn)
    #[arg(long, global = true)]
    pub log_level: Option<LevelFilter>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Readers and writers race over a shared counter, acquire/release times are reported.
    Bench(BenchArgs),
    /// Writers fill a shared map while readers look up random keys.
    Cache(CacheArgs),
}

#[derive(Args)]
pub struct BenchArgs {
    #[arg(long, default_value_t = 40)]
    pub readers: usize,

    #[arg(long, default_value_t = 4)]
    pub writers: usize,

    /// Counter value to stop at.
    #[arg(long, default_value_t = 100_000)]
    pub target: u64,

    /// Critical section under the rwlock: spin or blocking.
    #[arg(long, default_value_t = Strategy::Spin)]
    pub strategy: Strategy,

    /// Failed attempts before the spin section yields.
    #[arg(long, default_value_t = DEFAULT_SPIN_BUDGET)]
    pub spin_budget: u32,
}

impl From<BenchArgs> for BenchConfig {
    fn from(args: BenchArgs) -> Self {
        Self {
            readers: args.readers,
            writers: args.writers,
            target: args.target,
            strategy: args.strategy,
            spin_budget: args.spin_budget,
        }
    }
}

#[derive(Args)]
pub struct CacheArgs {
    #[arg(long, default_value_t = 8)]
    pub readers: usize,

    #[arg(long, default_value_t = 2)]
    pub writers: usize,

    /// Keys to write, 0..entries.
    #[arg(long, default_value_t = 1_000)]
    pub entries: u32,

    /// Lookups per reader.
    #[arg(long, default_value_t = 10_000)]
    pub reads: u32,

    #[arg(long, default_value_t = Strategy::Spin)]
    pub strategy: Strategy,
}

impl From<&CacheArgs> for CacheDemoConfig {
    fn from(args: &CacheArgs) -> Self {
        Self {
            readers: args.readers,
            writers: args.writers,
            entries: args.entries,
            reads: args.reads,
        }
    }
}
