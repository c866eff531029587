//! Driving disposable worker machines, one per matrix cell
//!
//! Each [`BuildTarget`][] gets its own isolated Vagrant machine: boot it,
//! run its build steps, tear it down. The teardown attempt is
//! unconditional -- even when provisioning itself failed -- because
//! `vagrant destroy --force` is safe to point at a half-created machine
//! and leaking one would poison the next run.
//!
//! The pool is bounded and carries a cancellation flag, but there is no
//! cancellation point *inside* a worker: once provisioning has started,
//! that session runs to completion. Cancellation only stops idle pool
//! threads from claiming further targets.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use axoprocess::Cmd;
use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::errors::{DistError, DistResult};
use crate::platform::BuildTarget;

/// The states a worker session moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionState {
    /// The worker machine is booting
    Provisioning,
    /// The worker is executing its build steps
    Running,
    /// The worker is being destroyed
    TearingDown,
    /// The session finished and the worker is gone
    Done,
    /// Some step failed (the teardown was still attempted)
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Provisioning => "provisioning",
            SessionState::Running => "running",
            SessionState::TearingDown => "tearing-down",
            SessionState::Done => "done",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How the matrix is walked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPolicy {
    /// One target at a time, in generator order
    Sequential,
    /// A bounded pool of OS threads pulling targets off the matrix
    Concurrent {
        /// Upper bound on simultaneously provisioned workers
        max_workers: usize,
    },
}

/// What happens to the rest of the matrix when a target fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop handing out targets as soon as one fails
    FailFast,
    /// Run every target to completion and report all failures together
    CollectAll,
}

/// The outcome of one target's session, for reporting
#[derive(Debug, Clone, Serialize)]
pub struct TargetOutcome {
    /// The worker id this outcome belongs to
    pub id: String,
    /// The session's final state
    pub state: SessionState,
}

/// The capability to provision, build on, and destroy workers
///
/// The production implementation shells out to `vagrant`; tests
/// substitute a deterministic fake.
pub trait WorkerRuntime: Sync {
    /// Boot the isolated worker machine named by this target
    fn provision(&self, target: &BuildTarget) -> DistResult<()>;
    /// Run the target's build steps inside its worker
    fn run_build(&self, target: &BuildTarget) -> DistResult<()>;
    /// Tear this target's worker down
    fn destroy(&self, target: &BuildTarget) -> DistResult<()>;
    /// Force-destroy every worker this pipeline's host dir knows about
    fn destroy_all(&self) -> DistResult<()>;
}

/// The real worker runtime: `vagrant` invoked from the pipeline's host
/// directory, whose Vagrantfile defines one machine per matrix cell
pub struct VagrantRuntime {
    host_dir: Utf8PathBuf,
}

impl VagrantRuntime {
    /// A runtime rooted at the given pipeline host directory
    pub fn new(host_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            host_dir: host_dir.into(),
        }
    }
}

impl WorkerRuntime for VagrantRuntime {
    fn provision(&self, target: &BuildTarget) -> DistResult<()> {
        let id = target.id();
        Cmd::new("vagrant", format!("boot worker {id}"))
            .arg("up")
            .arg("--no-provision")
            .arg(&id)
            .current_dir(&self.host_dir)
            .run()?;
        Ok(())
    }

    fn run_build(&self, target: &BuildTarget) -> DistResult<()> {
        let id = target.id();
        Cmd::new("vagrant", format!("run build steps on worker {id}"))
            .arg("provision")
            .arg(&id)
            .current_dir(&self.host_dir)
            .run()?;
        Ok(())
    }

    fn destroy(&self, target: &BuildTarget) -> DistResult<()> {
        let id = target.id();
        Cmd::new("vagrant", format!("destroy worker {id}"))
            .arg("destroy")
            .arg("--force")
            .arg(&id)
            .current_dir(&self.host_dir)
            .run()?;
        Ok(())
    }

    fn destroy_all(&self) -> DistResult<()> {
        Cmd::new("vagrant", "destroy leftover workers")
            .arg("destroy")
            .arg("--force")
            .current_dir(&self.host_dir)
            .run()?;
        Ok(())
    }
}

/// One target's session, owned by the thread driving it
#[derive(Debug)]
pub struct WorkerSession {
    /// The matrix cell this session builds
    pub target: BuildTarget,
    /// Where the session currently is in its lifecycle
    pub state: SessionState,
}

impl WorkerSession {
    /// A fresh session for a target
    pub fn new(target: BuildTarget) -> Self {
        Self {
            target,
            state: SessionState::Provisioning,
        }
    }

    /// The worker id this session drives
    pub fn id(&self) -> String {
        self.target.id()
    }

    /// Drive the session through provision -> build -> destroy
    ///
    /// On return the state is `Done` or `Failed`. The destroy step runs
    /// no matter what happened before it; a teardown failure that
    /// follows an earlier failure is logged rather than masking it.
    pub fn drive(&mut self, runtime: &dyn WorkerRuntime) -> DistResult<()> {
        let id = self.id();

        self.state = SessionState::Provisioning;
        info!("provisioning worker {id}");
        let provisioned = runtime.provision(&self.target);

        let built = if provisioned.is_ok() {
            self.state = SessionState::Running;
            info!("running build steps on worker {id}");
            runtime.run_build(&self.target)
        } else {
            Ok(())
        };

        self.state = SessionState::TearingDown;
        info!("destroying worker {id}");
        let destroyed = runtime.destroy(&self.target);

        let result = match (provisioned.and(built), destroyed) {
            (Ok(()), Ok(())) => Ok(()),
            (Ok(()), Err(teardown)) => Err(teardown),
            (Err(failure), Ok(())) => Err(failure),
            (Err(failure), Err(teardown)) => {
                warn!("teardown of failed worker {id} also failed: {teardown}");
                Err(failure)
            }
        };
        self.state = if result.is_ok() {
            SessionState::Done
        } else {
            SessionState::Failed
        };
        result
    }
}

/// Run every target in the matrix under the given policies
///
/// Starts by force-destroying any pre-existing workers (clean-slate
/// precondition: a rerun after a failed pipeline must not trip over
/// leftovers). Returns outcomes in matrix order; if any target failed,
/// returns an error naming all of them -- except sequential fail-fast,
/// which aborts with the first failure and leaves later targets
/// untouched.
pub fn run_matrix(
    runtime: &dyn WorkerRuntime,
    targets: &[BuildTarget],
    execution: ExecutionPolicy,
    failure: FailurePolicy,
) -> DistResult<Vec<TargetOutcome>> {
    runtime.destroy_all()?;
    match execution {
        ExecutionPolicy::Sequential => run_sequential(runtime, targets, failure),
        ExecutionPolicy::Concurrent { max_workers } => {
            run_concurrent(runtime, targets, failure, max_workers)
        }
    }
}

fn run_sequential(
    runtime: &dyn WorkerRuntime,
    targets: &[BuildTarget],
    failure: FailurePolicy,
) -> DistResult<Vec<TargetOutcome>> {
    let mut results = vec![];
    for target in targets {
        let mut session = WorkerSession::new(target.clone());
        match session.drive(runtime) {
            Err(cause) if failure == FailurePolicy::FailFast => {
                error!("build for {} failed, aborting the matrix", session.id());
                return Err(cause);
            }
            result => results.push((session.id(), result)),
        }
    }
    collect_outcomes(results, targets.len())
}

fn run_concurrent(
    runtime: &dyn WorkerRuntime,
    targets: &[BuildTarget],
    failure: FailurePolicy,
    max_workers: usize,
) -> DistResult<Vec<TargetOutcome>> {
    let pool_size = max_workers.max(1).min(targets.len());
    let next_target = AtomicUsize::new(0);
    let cancelled = AtomicBool::new(false);
    let results: Mutex<Vec<(usize, String, DistResult<()>)>> = Mutex::new(vec![]);

    std::thread::scope(|scope| {
        for _ in 0..pool_size {
            scope.spawn(|| loop {
                if failure == FailurePolicy::FailFast && cancelled.load(Ordering::SeqCst) {
                    break;
                }
                let index = next_target.fetch_add(1, Ordering::SeqCst);
                let Some(target) = targets.get(index) else {
                    break;
                };
                let mut session = WorkerSession::new(target.clone());
                let result = session.drive(runtime);
                if result.is_err() {
                    cancelled.store(true, Ordering::SeqCst);
                }
                results
                    .lock()
                    .unwrap()
                    .push((index, session.id(), result));
            });
        }
    });
    // the scope is the join barrier: every in-flight session has finished

    let mut results = results.into_inner().unwrap();
    results.sort_by_key(|(index, ..)| *index);
    let results = results
        .into_iter()
        .map(|(_, id, result)| (id, result))
        .collect();
    collect_outcomes(results, targets.len())
}

fn collect_outcomes(
    results: Vec<(String, DistResult<()>)>,
    total: usize,
) -> DistResult<Vec<TargetOutcome>> {
    let mut outcomes = vec![];
    let mut failed = vec![];
    for (id, result) in results {
        match result {
            Ok(()) => outcomes.push(TargetOutcome {
                id,
                state: SessionState::Done,
            }),
            Err(cause) => {
                error!("build for {id} failed: {cause:?}");
                failed.push(id);
            }
        }
    }
    if failed.is_empty() {
        Ok(outcomes)
    } else {
        Err(DistError::WorkerBuildsFailed {
            count: failed.len(),
            total,
            failed: failed.join(", "),
        })
    }
}
