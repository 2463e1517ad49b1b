mod cli;

use anyhow::{bail, Result};
use clap::Parser;
use log::info;

use rwgate::{
    bench::{self, BenchConfig},
    cache::{self, CacheDemoConfig, SynchronizedCache},
    logging, BlockingSection, Strategy,
};

use cli::{CacheArgs, Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level)?;

    match cli.command {
        Command::Bench(args) => cmd_bench(args.into()),
        Command::Cache(ref args) => cmd_cache(args),
    }
}

fn cmd_bench(config: BenchConfig) -> Result<()> {
    let report = bench::run(&config)?;
    if report.final_count != report.writer_entries {
        bail!(
            "lost updates: counter is {} after {} writer entries",
            report.final_count,
            report.writer_entries
        );
    }
    println!("{report}");
    Ok(())
}

fn cmd_cache(args: &CacheArgs) -> Result<()> {
    let config = CacheDemoConfig::from(args);
    let report = match args.strategy {
        Strategy::Spin => cache::exercise(&SynchronizedCache::new(), &config)?,
        Strategy::Blocking => cache::exercise(
            &SynchronizedCache::with_section(BlockingSection::new()),
            &config,
        )?,
    };
    info!("cache workload on {} finished", args.strategy);
    println!(
        "{} entries cached: {} added, {} updated; {} hits, {} misses",
        report.final_len, report.added, report.updated, report.hits, report.misses
    );
    Ok(())
}
