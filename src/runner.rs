//! Run lifecycle and worker pool sizing.
//!
//! Every command that fans work out over repositories goes through a
//! `RunContext`: an explicit idle → running → completed | failed state
//! machine, so progress and outcome are inspectable instead of living in
//! ambient globals. Pool sizing is deliberately conservative: the workers
//! spend their time waiting on `git` subprocesses, and past a handful of
//! concurrent clones of history the disk is the bottleneck.

use rayon::ThreadPool;
use std::thread;
use tracing::debug;

/// Upper bound on workers for large machines.
const WIDE_CAP: usize = 6;
/// Upper bound for machines with fewer than 8 cores.
const NARROW_CAP: usize = 4;

/// `min(available cores, tasks, cap)`, never below 1.
pub fn worker_count(tasks: usize, requested: Option<usize>) -> usize {
    if let Some(n) = requested {
        return n.max(1).min(tasks.max(1));
    }
    let cores = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let cap = if cores >= 8 { WIDE_CAP } else { NARROW_CAP };
    cores.min(cap).min(tasks.max(1))
}

/// Build the bounded pool for this run.
pub fn build_pool(tasks: usize, requested: Option<usize>) -> anyhow::Result<ThreadPool> {
    let workers = worker_count(tasks, requested);
    debug!(workers, tasks, "sizing worker pool");
    Ok(rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Counters for the degraded paths a run is allowed to take: repos whose
/// log could not be read, files whose blame timed out. These never fail the
/// run; they are reported at the end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub tasks_done: usize,
    pub repos_skipped: usize,
    pub files_skipped: usize,
}

#[derive(Debug)]
pub struct RunContext {
    name: &'static str,
    state: RunState,
    report: RunReport,
}

impl RunContext {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: RunState::Idle,
            report: RunReport::default(),
        }
    }

    pub fn start(&mut self) {
        debug_assert_eq!(self.state, RunState::Idle);
        self.state = RunState::Running;
        debug!(run = self.name, "run started");
    }

    pub fn task_done(&mut self) {
        self.report.tasks_done += 1;
    }

    pub fn repo_skipped(&mut self) {
        self.report.repos_skipped += 1;
    }

    pub fn files_skipped(&mut self, count: usize) {
        self.report.files_skipped += count;
    }

    pub fn complete(&mut self) -> RunReport {
        debug_assert_eq!(self.state, RunState::Running);
        self.state = RunState::Completed;
        debug!(run = self.name, tasks = self.report.tasks_done, "run completed");
        self.report
    }

    pub fn fail(&mut self) -> RunReport {
        self.state = RunState::Failed;
        self.report
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn report(&self) -> RunReport {
        self.report
    }
}
