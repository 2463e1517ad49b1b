//! # Load test
//!
//! Readers and writers hammer one shared counter until it reaches the target:
//! - a reader takes the read lock, looks at the counter, leaves
//! - a writer takes the write lock, bumps the counter, leaves
//!
//! Taking and releasing the lock is timed per role. The numbers mostly show how long threads spend parked,
//! e.g. with a lot of writers the readers wait most of the time, as any waiting writer closes the door.
//!
//! The counter is also a correctness check: it has to end up equal to the number of writer entries.

use std::{
    fmt,
    thread,
    time::{Duration, Instant},
};

use log::{debug, info};

use crate::{
    critical_section::{BlockingSection, CriticalSection, SpinSection, Strategy, DEFAULT_SPIN_BUDGET},
    error::{BenchError, LockError},
    rwlock::RwCell,
};

#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub readers: usize,
    pub writers: usize,
    /// the counter value to stop at, needs at least one writer unless it's 0
    pub target: u64,
    pub strategy: Strategy,
    /// only used by [`Strategy::Spin`]
    pub spin_budget: u32,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            readers: 40,
            writers: 4,
            target: 100_000,
            strategy: Strategy::Spin,
            spin_budget: DEFAULT_SPIN_BUDGET,
        }
    }
}

/// What one thread measured
#[derive(Debug, Default, Clone, Copy)]
struct Timings {
    entries: u64,
    enter: Duration,
    exit: Duration,
}

impl Timings {
    fn add(mut self, other: Timings) -> Self {
        self.entries += other.entries;
        self.enter += other.enter;
        self.exit += other.exit;
        self
    }
}

#[derive(Debug, Clone)]
pub struct BenchReport {
    pub strategy: Strategy,
    pub readers: usize,
    pub writers: usize,
    pub final_count: u64,
    /// how many times a writer actually bumped the counter
    pub writer_entries: u64,
    pub reader_entries: u64,
    pub elapsed: Duration,
    pub read_wait: Duration,
    pub write_wait: Duration,
    pub read_exit: Duration,
    pub write_exit: Duration,
}

fn per_thread(total: Duration, threads: usize) -> Duration {
    total / threads.max(1) as u32
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "strategy {}, {} readers, {} writers",
            self.strategy, self.readers, self.writers
        )?;
        writeln!(
            f,
            "counter {} ({} writer entries, {} reader entries) in {:?}",
            self.final_count, self.writer_entries, self.reader_entries, self.elapsed
        )?;
        writeln!(
            f,
            "waiting: readers {:?} total, {:?} per thread; writers {:?} total, {:?} per thread",
            self.read_wait,
            per_thread(self.read_wait, self.readers),
            self.write_wait,
            per_thread(self.write_wait, self.writers)
        )?;
        write!(
            f,
            "exiting: readers {:?} total, {:?} per thread; writers {:?} total, {:?} per thread",
            self.read_exit,
            per_thread(self.read_exit, self.readers),
            self.write_exit,
            per_thread(self.write_exit, self.writers)
        )
    }
}

/// Runs the load test on the section the config asks for
pub fn run(config: &BenchConfig) -> Result<BenchReport, BenchError> {
    info!(
        "benchmarking {} readers / {} writers up to {} on {}",
        config.readers, config.writers, config.target, config.strategy
    );
    match config.strategy {
        Strategy::Spin => run_with(config, SpinSection::with_budget(config.spin_budget)),
        Strategy::Blocking => run_with(config, BlockingSection::new()),
    }
}

pub fn run_with<C: CriticalSection>(
    config: &BenchConfig,
    section: C,
) -> Result<BenchReport, BenchError> {
    let target = config.target;
    if config.writers == 0 && target > 0 {
        return Err(BenchError::NoWriters { target });
    }
    let counter = RwCell::with_section(0u64, section);
    let started = Instant::now();

    let (reads, writes) = thread::scope(|s| {
        let readers = (0..config.readers)
            .map(|_| s.spawn(|| reader(&counter, target)))
            .collect::<Vec<_>>();
        let writers = (0..config.writers)
            .map(|_| s.spawn(|| writer(&counter, target)))
            .collect::<Vec<_>>();

        let reads = readers
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .fold(Timings::default(), Timings::add);
        let writes = writers
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .try_fold(Timings::default(), |acc, t| t.map(|t| acc.add(t)))?;
        Ok::<_, BenchError>((reads, writes))
    })?;

    let report = BenchReport {
        strategy: config.strategy,
        readers: config.readers,
        writers: config.writers,
        final_count: counter.into_inner(),
        writer_entries: writes.entries,
        reader_entries: reads.entries,
        elapsed: started.elapsed(),
        read_wait: reads.enter,
        write_wait: writes.enter,
        read_exit: reads.exit,
        write_exit: writes.exit,
    };
    debug!("{report:?}");
    Ok(report)
}

fn reader<C: CriticalSection>(counter: &RwCell<u64, C>, target: u64) -> Timings {
    let mut timings = Timings::default();
    loop {
        let t = Instant::now();
        let value = counter.read();
        timings.enter += t.elapsed();
        if *value >= target {
            return timings;
        }
        timings.entries += 1;
        let t = Instant::now();
        drop(value);
        timings.exit += t.elapsed();
    }
}

fn writer<C: CriticalSection>(counter: &RwCell<u64, C>, target: u64) -> Result<Timings, LockError> {
    let mut timings = Timings::default();
    loop {
        let t = Instant::now();
        let mut value = counter.write()?;
        timings.enter += t.elapsed();
        if *value >= target {
            return Ok(timings);
        }
        *value += 1;
        timings.entries += 1;
        let t = Instant::now();
        drop(value);
        timings.exit += t.elapsed();
    }
}
