//! Execution engine - applies planned changes with bounded parallelism

use crate::context::{AutoConfirm, ConfirmCallback, NoProgress, ProgressCallback};
use crate::planner::{Change, Plan, PlannedChange, State};
use crate::resource::Provider;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary, ResourceData};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::sync::{Mutex, PoisonError};

/// What an applied change does to recorded state
#[derive(Debug)]
enum StateUpdate {
    /// Record new data for the address
    Set(ResourceData),
    /// Forget the address
    Remove,
    /// Leave whatever the refresh produced
    Keep,
}

/// Result of [`execute`]
#[derive(Debug, Clone, Default)]
pub struct ExecuteOutcome {
    /// Counts per result kind
    pub summary: ExecuteSummary,
    /// State to persist
    pub state: State,
    /// Failed addresses with their error messages
    pub failures: Vec<(String, String)>,
}

/// Apply every pending change of `plan`.
///
/// Changes run on a thread pool of `opts.jobs` threads. A failed create
/// records nothing; a failed update or delete keeps the refreshed state.
/// The returned state always starts from `plan.refreshed`, so vanished
/// resources stay dropped even when nothing is applied.
pub fn execute<P, C>(
    provider: &Provider,
    plan: &Plan,
    opts: &ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteOutcome>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let pending: Vec<&PlannedChange> = plan.pending().collect();
    let mut outcome = ExecuteOutcome {
        state: plan.refreshed.clone(),
        ..Default::default()
    };
    outcome.summary.no_change = plan.changes.len() - pending.len();

    if pending.is_empty() {
        return Ok(outcome);
    }

    if opts.dry_run {
        outcome.summary.skipped = pending.len();
        return Ok(outcome);
    }

    // Confirm before proceeding
    if !confirm.confirm("Apply changes?")? {
        outcome.summary.skipped = pending.len();
        return Ok(outcome);
    }

    progress.on_batch_start(pending.len());
    let results = if opts.jobs <= 1 || pending.len() == 1 {
        let mut results = Vec::with_capacity(pending.len());
        for change in &pending {
            progress.on_change_start(&change.address, change.change);
            let (result, update) = apply_change(provider, change);
            progress.on_change_complete(&change.address, &result);
            results.push((change.address.clone(), result, update));
        }
        results
    } else {
        let results = execute_parallel(provider, &pending, opts.jobs)?;
        // Progress callbacks are not thread-safe; report after the batch
        for (address, result, _) in &results {
            progress.on_change_complete(address, result);
        }
        results
    };
    progress.on_batch_complete();

    for (address, result, update) in results {
        outcome.summary.add_result(&result);
        if let ApplyResult::Failed { error } = &result {
            outcome.failures.push((address.clone(), error.clone()));
        }
        match update {
            StateUpdate::Set(data) => {
                outcome.state.insert(address, data);
            }
            StateUpdate::Remove => {
                outcome.state.remove(&address);
            }
            StateUpdate::Keep => {}
        }
    }

    Ok(outcome)
}

/// Execute without callbacks, auto-confirming
pub fn execute_simple(provider: &Provider, plan: &Plan, opts: &ExecuteOptions) -> Result<ExecuteOutcome> {
    execute(provider, plan, opts, &mut NoProgress, &mut AutoConfirm)
}

/// Execute changes in parallel using rayon
fn execute_parallel(
    provider: &Provider,
    pending: &[&PlannedChange],
    jobs: usize,
) -> Result<Vec<(String, ApplyResult, StateUpdate)>> {
    let results = Mutex::new(Vec::with_capacity(pending.len()));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {}", e))?;

    pool.install(|| {
        pending.par_iter().for_each(|change| {
            let (result, update) = apply_change(provider, change);
            results
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((change.address.clone(), result, update));
        });
    });

    let mut results = results.into_inner().unwrap_or_else(PoisonError::into_inner);
    results.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(results)
}

/// Apply one change, converting errors into a failed result
fn apply_change(provider: &Provider, planned: &PlannedChange) -> (ApplyResult, StateUpdate) {
    log::debug!("{} {}", planned.change, planned.address);
    match try_apply(provider, planned) {
        Ok(done) => done,
        Err(e) => {
            log::warn!("{} {} failed: {e:#}", planned.change, planned.address);
            let update = match planned.change {
                // The old object is already gone at this point
                Change::Replace if e.is::<Replaced>() => StateUpdate::Remove,
                _ => StateUpdate::Keep,
            };
            (
                ApplyResult::Failed {
                    error: format!("{e:#}"),
                },
                update,
            )
        }
    }
}

/// Marker for a replace whose delete succeeded but create failed
#[derive(Debug, thiserror::Error)]
#[error("destroyed, but creating the replacement failed: {0:#}")]
struct Replaced(anyhow::Error);

fn try_apply(provider: &Provider, planned: &PlannedChange) -> Result<(ApplyResult, StateUpdate)> {
    let config = || {
        planned
            .config
            .as_ref()
            .with_context(|| format!("{} has no configuration", planned.address))
    };
    let current = || {
        planned
            .current
            .as_ref()
            .with_context(|| format!("{} has no recorded state", planned.address))
    };

    match planned.change {
        Change::NoOp => Ok((ApplyResult::NoChange, StateUpdate::Keep)),
        Change::Create => {
            let data = provider.get(&planned.resource_type)?.create(config()?)?;
            Ok((ApplyResult::Created, StateUpdate::Set(data)))
        }
        Change::Update => {
            let data = provider
                .get(&planned.resource_type)?
                .update(current()?, config()?)?;
            Ok((ApplyResult::Modified, StateUpdate::Set(data)))
        }
        Change::Replace => {
            let current = current()?;
            provider.get(&current.resource_type)?.delete(current)?;
            let data = provider
                .get(&planned.resource_type)
                .and_then(|rt| rt.create(config()?))
                .map_err(Replaced)?;
            Ok((ApplyResult::Replaced, StateUpdate::Set(data)))
        }
        Change::Delete => {
            let current = current()?;
            provider.get(&current.resource_type)?.delete(current)?;
            Ok((ApplyResult::Removed, StateUpdate::Remove))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AutoDecline;
    use crate::planner::plan;
    use crate::testing::{MemoryType, attrs};
    use crate::types::Declared;

    fn setup() -> (MemoryType, Provider) {
        let memory = MemoryType::new("note").with_force_new(&["kind"]);
        let provider = Provider::new().with(memory.clone());
        (memory, provider)
    }

    fn opts(jobs: usize) -> ExecuteOptions {
        ExecuteOptions {
            dry_run: false,
            jobs,
        }
    }

    #[derive(Default)]
    struct Recorder {
        started: Vec<String>,
        completed: Vec<(String, ApplyResult)>,
        batches: usize,
    }

    impl ProgressCallback for Recorder {
        fn on_batch_start(&mut self, _count: usize) {
            self.batches += 1;
        }
        fn on_change_start(&mut self, address: &str, _change: Change) {
            self.started.push(address.to_string());
        }
        fn on_change_complete(&mut self, address: &str, result: &ApplyResult) {
            self.completed.push((address.to_string(), result.clone()));
        }
        fn on_batch_complete(&mut self) {}
    }

    #[test]
    fn test_execute_empty_plan() {
        let (_, provider) = setup();
        let outcome = execute_simple(&provider, &Plan::default(), &opts(4)).unwrap();
        assert_eq!(outcome.summary.total(), 0);
        assert!(outcome.state.is_empty());
    }

    #[test]
    fn test_create_records_state() {
        let (memory, provider) = setup();
        let declared = vec![
            Declared::new("note", "a", attrs(&[("title", "x")])),
            Declared::new("note", "b", attrs(&[("title", "y")])),
        ];
        let first = plan(&provider, &declared, &State::new(), 4).unwrap();

        let outcome = execute_simple(&provider, &first, &opts(4)).unwrap();
        assert_eq!(outcome.summary.created, 2);
        assert_eq!(memory.len(), 2);
        assert_eq!(outcome.state["note.b"].get_str("title"), Some("y"));

        // Second round is a no-op
        let again = plan(&provider, &declared, &outcome.state, 4).unwrap();
        assert!(!again.has_changes());
    }

    #[test]
    fn test_update_replace_delete() {
        let (memory, provider) = setup();
        let first = vec![
            Declared::new("note", "a", attrs(&[("title", "x"), ("kind", "k1")])),
            Declared::new("note", "b", attrs(&[("title", "y"), ("kind", "k1")])),
            Declared::new("note", "c", attrs(&[("title", "z")])),
        ];
        let created = execute_simple(
            &provider,
            &plan(&provider, &first, &State::new(), 1).unwrap(),
            &opts(1),
        )
        .unwrap();
        let old_b = created.state["note.b"].id.clone();

        let second = vec![
            Declared::new("note", "a", attrs(&[("title", "x2"), ("kind", "k1")])),
            Declared::new("note", "b", attrs(&[("title", "y"), ("kind", "k2")])),
        ];
        let plan = plan(&provider, &second, &created.state, 1).unwrap();
        let outcome = execute_simple(&provider, &plan, &opts(1)).unwrap();

        assert_eq!(outcome.summary.modified, 1);
        assert_eq!(outcome.summary.replaced, 1);
        assert_eq!(outcome.summary.removed, 1);
        assert_eq!(outcome.state["note.a"].get_str("title"), Some("x2"));
        assert_ne!(outcome.state["note.b"].id, old_b);
        assert!(memory.get(&old_b).is_none());
        assert!(!outcome.state.contains_key("note.c"));
        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn test_failed_create_records_nothing() {
        let (memory, provider) = setup();
        memory.fail_writes(true);
        let declared = vec![Declared::new("note", "a", attrs(&[("title", "x")]))];
        let plan = plan(&provider, &declared, &State::new(), 1).unwrap();

        let outcome = execute_simple(&provider, &plan, &opts(1)).unwrap();
        assert_eq!(outcome.summary.failed, 1);
        assert!(outcome.state.is_empty());
        assert_eq!(outcome.failures[0].0, "note.a");
    }

    #[test]
    fn test_failed_update_keeps_state() {
        let (memory, provider) = setup();
        let declared = vec![Declared::new("note", "a", attrs(&[("title", "x")]))];
        let created = execute_simple(
            &provider,
            &plan(&provider, &declared, &State::new(), 1).unwrap(),
            &opts(1),
        )
        .unwrap();

        memory.fail_writes(true);
        let changed = vec![Declared::new("note", "a", attrs(&[("title", "y")]))];
        let plan = plan(&provider, &changed, &created.state, 1).unwrap();
        let outcome = execute_simple(&provider, &plan, &opts(1)).unwrap();

        assert!(!outcome.summary.is_success());
        assert_eq!(outcome.state["note.a"].get_str("title"), Some("x"));
    }

    #[test]
    fn test_dry_run_and_decline_change_nothing() {
        let (memory, provider) = setup();
        let declared = vec![Declared::new("note", "a", attrs(&[("title", "x")]))];
        let plan = plan(&provider, &declared, &State::new(), 1).unwrap();

        let dry = ExecuteOptions {
            dry_run: true,
            jobs: 1,
        };
        let outcome = execute_simple(&provider, &plan, &dry).unwrap();
        assert_eq!(outcome.summary.skipped, 1);

        let outcome = execute(&provider, &plan, &opts(1), &mut NoProgress, &mut AutoDecline).unwrap();
        assert_eq!(outcome.summary.skipped, 1);
        assert_eq!(memory.len(), 0);
    }

    #[test]
    fn test_parallel_execution_reports_progress() {
        let (memory, provider) = setup();
        let declared: Vec<_> = (0..8)
            .map(|i| Declared::new("note", &format!("n{i}"), attrs(&[("title", "t")])))
            .collect();
        let plan = plan(&provider, &declared, &State::new(), 4).unwrap();

        let mut recorder = Recorder::default();
        let outcome = execute(&provider, &plan, &opts(4), &mut recorder, &mut AutoConfirm).unwrap();

        assert_eq!(outcome.summary.created, 8);
        assert_eq!(memory.len(), 8);
        assert_eq!(recorder.completed.len(), 8);
        assert_eq!(recorder.batches, 1);
        assert!(recorder.started.is_empty());
    }

    #[test]
    fn test_sequential_execution_reports_start() {
        let (_, provider) = setup();
        let declared = vec![
            Declared::new("note", "a", attrs(&[("title", "x")])),
            Declared::new("note", "b", attrs(&[("title", "y")])),
        ];
        let plan = plan(&provider, &declared, &State::new(), 1).unwrap();

        let mut recorder = Recorder::default();
        execute(&provider, &plan, &opts(1), &mut recorder, &mut AutoConfirm).unwrap();
        assert_eq!(recorder.started, vec!["note.a", "note.b"]);
    }
}
