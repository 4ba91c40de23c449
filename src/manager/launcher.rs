//! The task launcher: starts the tasks of a [`LaunchPlan`] on their
//! execution contexts and applies the plan's await policy.
//!
//! Each task runs under a task-local name and reports in by publishing
//! `"<name> is executing on thread: <thread>"` to the session's status slot.
//! Tasks share one result cell each, so a dependent task can read what its
//! producer stored, or the initial `0.0` if it looks too early.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{error, info, warn};
use tokio::task::JoinHandle;

use crate::config::PlaygroundConfig;
use crate::error::{PlaygroundError, Result};
use crate::models::{
    scenario::{AwaitPolicy, ExecutionContext, LaunchOutcome, LaunchPlan, Scenario},
    status::StatusSlot,
    task::{TaskReport, TaskSpec, TaskStatus},
};
use crate::worker::{
    contexts::{current_thread_label, ContextHandles, ExecutionContexts},
    processor::HeavyProcessor,
};

tokio::task_local! {
    static TASK_NAME: String;
}

type ResultCells = Arc<Mutex<Vec<Option<f64>>>>;

/// One launcher session. Dropping it tears down the session's `Main` and
/// `Pool` contexts; `Global` tasks keep running.
pub struct TaskLauncher {
    contexts: ExecutionContexts,
    processor: HeavyProcessor,
    status: StatusSlot,
    config: PlaygroundConfig,
}

impl TaskLauncher {
    pub fn new(config: &PlaygroundConfig) -> Result<Self> {
        let contexts = ExecutionContexts::new(config.pool_threads(), config.global_threads())
            .map_err(PlaygroundError::Runtime)?;
        Ok(Self {
            contexts,
            processor: HeavyProcessor::new(config.work_unit),
            status: StatusSlot::new(),
            config: config.clone(),
        })
    }

    pub fn status(&self) -> &StatusSlot {
        &self.status
    }

    pub fn run(&self, scenario: Scenario) -> JoinHandle<Result<LaunchOutcome>> {
        self.launch(scenario.plan(&self.config))
    }

    /// Starts `plan` from its caller context. The returned handle resolves
    /// once the await policy is satisfied; dropping it detaches the launch.
    pub fn launch(&self, plan: LaunchPlan) -> JoinHandle<Result<LaunchOutcome>> {
        info!("Launching '{}' from the {} context", plan.label, plan.caller);
        let launch = Launch {
            handles: self.contexts.handles().clone(),
            processor: self.processor,
            status: self.status.clone(),
        };
        self.contexts.handle(plan.caller).spawn(async move {
            let label = plan.label.clone();
            let outcome = launch.drive(plan).await;
            if let Err(err) = &outcome {
                error!("'{}' did not complete: {}", label, err);
            }
            outcome
        })
    }
}

struct Launch {
    handles: ContextHandles,
    processor: HeavyProcessor,
    status: StatusSlot,
}

impl Launch {
    async fn drive(self, plan: LaunchPlan) -> Result<LaunchOutcome> {
        let cells: ResultCells = Arc::new(Mutex::new(vec![None; plan.tasks.len()]));
        let mut reports = Vec::new();
        let tasks = plan.tasks.iter().cloned().enumerate();

        match plan.await_policy {
            AwaitPolicy::Detach => {
                for (index, spec) in tasks {
                    drop(self.dispatch(plan.caller, index, spec, &cells).await);
                }
                self.caller_note(&plan);
            }
            AwaitPolicy::AwaitFirst => {
                let mut handles = Vec::with_capacity(plan.tasks.len());
                for (index, spec) in tasks {
                    handles.push(self.dispatch(plan.caller, index, spec, &cells).await);
                }
                self.caller_note(&plan);
                if !handles.is_empty() {
                    reports.push(handles.remove(0).await?);
                }
            }
            AwaitPolicy::AwaitAll => {
                let mut handles = Vec::with_capacity(plan.tasks.len());
                for (index, spec) in tasks {
                    handles.push(self.dispatch(plan.caller, index, spec, &cells).await);
                }
                self.caller_note(&plan);
                for handle in handles {
                    reports.push(handle.await?);
                }
            }
            AwaitPolicy::Sequential => {
                let last = plan.tasks.len().saturating_sub(1);
                for (index, spec) in tasks {
                    let handle = self.dispatch(plan.caller, index, spec, &cells).await;
                    if index == last {
                        self.caller_note(&plan);
                    }
                    reports.push(handle.await?);
                }
            }
        }

        let results = lock_cells(&cells).clone();
        let outcome = LaunchOutcome {
            label: plan.label,
            reports,
            results,
            report: plan.report,
        };
        for report in &outcome.reports {
            match (report.is_completed(), report.observed_dependency) {
                (true, Some(seen)) => info!("  {} on {}: {:?} (read {})", report.name, report.thread, report.value, seen),
                (true, None) => info!("  {} on {}: {:?}", report.name, report.thread, report.value),
                (false, _) => warn!("  {} on {}: failed, error contained", report.name, report.thread),
            }
        }
        match outcome.summary() {
            Some(summary) => info!("'{}' finished. {}", outcome.label, summary),
            None => info!("'{}' returned without waiting", outcome.label),
        }
        Ok(outcome)
    }

    /// Starts a task. A `Main` task launched from `Main` runs up to its
    /// first suspension before the caller continues.
    async fn dispatch(
        &self,
        caller: ExecutionContext,
        index: usize,
        spec: TaskSpec,
        cells: &ResultCells,
    ) -> JoinHandle<TaskReport> {
        let immediate = caller == ExecutionContext::Main && spec.context == ExecutionContext::Main;
        let handle = self.start(index, spec, cells);
        if immediate {
            tokio::task::yield_now().await;
        }
        handle
    }

    fn start(&self, index: usize, spec: TaskSpec, cells: &ResultCells) -> JoinHandle<TaskReport> {
        let handle = self.handles.get(spec.context);
        let name = spec.name.clone();
        let body = run_task(index, spec, Arc::clone(cells), self.processor, self.status.clone());
        handle.spawn(TASK_NAME.scope(name, body))
    }

    fn caller_note(&self, plan: &LaunchPlan) {
        if let Some(note) = &plan.note {
            info!("{} [{}]", note, current_thread_label());
        }
    }
}

async fn run_task(
    index: usize,
    spec: TaskSpec,
    cells: ResultCells,
    processor: HeavyProcessor,
    status: StatusSlot,
) -> TaskReport {
    info!("Task '{}' started on the {} context", spec.name, spec.context);
    if let Some(pause) = spec.pause {
        tokio::time::sleep(pause).await;
    }

    let thread = current_thread_label();
    let message = status_line(&thread);
    info!("{}", message);
    status.publish(message);

    let mut value = processor.process_double_values(spec.iterations);
    if spec.iterations > 0 {
        info!("{} workload finished. Result: {}", spec.name, value);
    }

    let observed_dependency = spec.depends_on.map(|producer| {
        let seen = lock_cells(&cells).get(producer).copied().flatten().unwrap_or(0.0);
        info!("Dependent data from previous process: {}", seen);
        seen
    });
    if let Some(seen) = observed_dependency {
        value += seen;
    }

    if spec.fails {
        if let Err(err) = fail_on_purpose(&spec.name) {
            warn!("{}; sibling tasks keep running", err);
            return TaskReport {
                name: spec.name,
                thread,
                status: TaskStatus::Failed,
                value: None,
                observed_dependency,
            };
        }
    }

    if let Some(cell) = lock_cells(&cells).get_mut(index) {
        *cell = Some(value);
    }
    info!("{} execution completed. Result: {}", spec.name, value);

    TaskReport {
        name: spec.name,
        thread,
        status: TaskStatus::Completed,
        value: Some(value),
        observed_dependency,
    }
}

fn status_line(thread: &str) -> String {
    let name = TASK_NAME
        .try_with(|name| name.clone())
        .unwrap_or_else(|_| "unnamed task".to_string());
    format!("{} is executing on thread: {}", name, thread)
}

fn fail_on_purpose(name: &str) -> Result<()> {
    Err(PlaygroundError::Simulated(name.to_string()))
}

fn lock_cells(cells: &ResultCells) -> MutexGuard<'_, Vec<Option<f64>>> {
    cells.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scenario::ExecutionContext::{Global, Main, Pool};
    use crate::models::scenario::ResultReport;
    use crate::worker::contexts::{GLOBAL_THREAD_PREFIX, MAIN_THREAD_NAME, POOL_THREAD_PREFIX};
    use futures::executor::block_on;
    use std::{thread, time::Duration};

    const UNIT: u64 = 1000;
    const PAUSE: Duration = Duration::from_millis(300);

    fn test_config() -> PlaygroundConfig {
        PlaygroundConfig {
            work_unit: UNIT,
            pool_threads: Some(2),
            global_threads: Some(2),
            pause_ms: 200,
            ..Default::default()
        }
    }

    fn one_iteration() -> f64 {
        HeavyProcessor::new(UNIT).process_double_values(1)
    }

    fn launch(launcher: &TaskLauncher, plan: LaunchPlan) -> LaunchOutcome {
        block_on(launcher.launch(plan)).unwrap().unwrap()
    }

    fn report_for<'a>(outcome: &'a LaunchOutcome, name: &str) -> &'a TaskReport {
        outcome.reports.iter().find(|report| report.name == name).unwrap()
    }

    fn thread_of(message: &str) -> &str {
        message.split("is executing on thread: ").nth(1).unwrap_or("")
    }

    #[test]
    fn launch_on_main_reports_main_loop() {
        let launcher = TaskLauncher::new(&test_config()).unwrap();
        let mut sub = launcher.status().subscribe();

        let outcome = block_on(launcher.run(Scenario::LaunchOnMain)).unwrap().unwrap();
        assert!(outcome.reports.is_empty());

        let message = block_on(sub.next()).unwrap();
        assert!(message.starts_with("Luke is executing on thread: "), "{message}");
        assert!(thread_of(&message).starts_with(MAIN_THREAD_NAME));
    }

    #[test]
    fn pool_and_global_tasks_report_their_workers() {
        let launcher = TaskLauncher::new(&test_config()).unwrap();
        let mut sub = launcher.status().subscribe();

        block_on(launcher.run(Scenario::LaunchOnPool)).unwrap().unwrap();
        let message = block_on(sub.next()).unwrap();
        assert!(message.starts_with("Leia"));
        assert!(thread_of(&message).starts_with(POOL_THREAD_PREFIX), "{message}");

        block_on(launcher.run(Scenario::LaunchGlobal)).unwrap().unwrap();
        let message = block_on(sub.next()).unwrap();
        assert!(message.starts_with("Jyn"));
        assert!(thread_of(&message).starts_with(GLOBAL_THREAD_PREFIX), "{message}");
    }

    #[test]
    fn background_caller_still_launches_into_main() {
        let launcher = TaskLauncher::new(&test_config()).unwrap();
        let mut sub = launcher.status().subscribe();

        block_on(launcher.run(Scenario::LaunchFromBackground)).unwrap().unwrap();
        let message = block_on(sub.next()).unwrap();
        assert!(message.starts_with("Snowy"));
        assert!(thread_of(&message).starts_with(MAIN_THREAD_NAME), "{message}");
    }

    #[test]
    fn delayed_task_reports_after_its_sibling() {
        let launcher = TaskLauncher::new(&test_config()).unwrap();
        let mut sub = launcher.status().subscribe();

        block_on(launcher.run(Scenario::TwoOnMainWithDelay)).unwrap().unwrap();
        assert!(block_on(sub.next()).unwrap().starts_with("Second"));
        assert!(block_on(sub.next()).unwrap().starts_with("First"));
    }

    #[test]
    fn simple_await_returns_the_workload_result() {
        let launcher = TaskLauncher::new(&test_config()).unwrap();
        let outcome = block_on(launcher.run(Scenario::AsyncAwait)).unwrap().unwrap();

        let report = report_for(&outcome, "Async await simple");
        assert!(report.is_completed());
        assert!(report.thread.starts_with(MAIN_THREAD_NAME));
        assert_eq!(outcome.last(), Some(one_iteration()));
    }

    #[test]
    fn awaiting_both_always_yields_the_full_sum() {
        let launcher = TaskLauncher::new(&test_config()).unwrap();
        let plan = LaunchPlan::new("both", AwaitPolicy::AwaitAll)
            .task(TaskSpec::new("slow", Pool).iterations(1).pause(PAUSE))
            .task(TaskSpec::new("fast", Pool).iterations(1))
            .report(ResultReport::Sum);

        let outcome = launch(&launcher, plan);
        assert_eq!(outcome.reports.len(), 2);
        assert_eq!(outcome.combined(), 2.0 * one_iteration());
    }

    #[test]
    fn awaiting_only_the_fast_task_can_miss_the_slow_one() {
        let launcher = TaskLauncher::new(&test_config()).unwrap();
        let plan = LaunchPlan::new("first only", AwaitPolicy::AwaitFirst)
            .task(TaskSpec::new("fast", Pool).iterations(1))
            .task(TaskSpec::new("slow", Pool).iterations(1).pause(PAUSE))
            .report(ResultReport::Sum);

        let outcome = launch(&launcher, plan);
        assert_eq!(outcome.reports.len(), 1);
        assert_eq!(outcome.results[1], None);
        assert_ne!(outcome.combined(), 2.0 * one_iteration());
    }

    #[test]
    fn dependent_task_started_after_producer_sees_its_value() {
        let launcher = TaskLauncher::new(&test_config()).unwrap();
        let plan = LaunchPlan::new("right way", AwaitPolicy::Sequential)
            .task(TaskSpec::new("producer", Pool).iterations(1).pause(PAUSE))
            .task(TaskSpec::new("consumer", Pool).depends_on(0))
            .report(ResultReport::Last);

        let outcome = launch(&launcher, plan);
        let consumer = report_for(&outcome, "consumer");
        assert_eq!(consumer.observed_dependency, Some(one_iteration()));
        assert_eq!(outcome.last(), Some(HeavyProcessor::seed() + one_iteration()));
    }

    #[test]
    fn dependent_task_started_alongside_producer_can_read_stale_value() {
        let launcher = TaskLauncher::new(&test_config()).unwrap();
        let plan = LaunchPlan::new("wrong way", AwaitPolicy::AwaitAll)
            .task(TaskSpec::new("producer", Pool).iterations(1).pause(PAUSE))
            .task(TaskSpec::new("consumer", Pool).depends_on(0))
            .report(ResultReport::Last);

        let outcome = launch(&launcher, plan);
        let consumer = report_for(&outcome, "consumer");
        assert_eq!(consumer.observed_dependency, Some(0.0));
        assert_eq!(outcome.last(), Some(HeavyProcessor::seed()));
        assert_eq!(outcome.results[0], Some(one_iteration()));
    }

    #[test]
    fn failing_task_does_not_abort_its_sibling() {
        let launcher = TaskLauncher::new(&test_config()).unwrap();
        let outcome = block_on(launcher.run(Scenario::IsolatedFailure)).unwrap().unwrap();

        assert_eq!(report_for(&outcome, "Failing task").status, TaskStatus::Failed);
        assert!(report_for(&outcome, "Sibling task").is_completed());
        assert_eq!(outcome.results, vec![None, Some(one_iteration())]);
    }

    #[test]
    fn global_tasks_outlive_the_session() {
        let launcher = TaskLauncher::new(&test_config()).unwrap();
        let status = launcher.status().clone();
        let mut sub = status.subscribe();
        let collector = thread::spawn(move || {
            let mut seen = Vec::new();
            while let Some(message) = block_on(sub.next()) {
                seen.push(message);
            }
            seen
        });

        let plan = LaunchPlan::new("teardown", AwaitPolicy::Detach)
            .task(TaskSpec::new("Abandoned", Pool).pause(PAUSE * 2))
            .task(TaskSpec::new("Survivor", Global).pause(PAUSE));
        launch(&launcher, plan);
        drop(launcher);
        thread::sleep(PAUSE * 4);
        drop(status);

        let seen = collector.join().unwrap();
        assert!(seen.iter().all(|m| !m.starts_with("Abandoned")), "{seen:?}");
        let survivor = seen.iter().find(|m| m.starts_with("Survivor")).expect("survivor reported");
        assert!(thread_of(survivor).starts_with(GLOBAL_THREAD_PREFIX));
    }

    #[test]
    fn main_task_runs_before_main_caller_continues() {
        let launcher = TaskLauncher::new(&test_config()).unwrap();
        let outcome = block_on(launcher.run(Scenario::HeavyOnMain)).unwrap().unwrap();

        assert!(outcome.reports.is_empty());
        assert_eq!(outcome.results, vec![Some(one_iteration())]);
    }

    #[test]
    fn pool_task_does_not_hold_up_main_caller() {
        let launcher = TaskLauncher::new(&test_config()).unwrap();
        let plan = LaunchPlan::new("pool detach", AwaitPolicy::Detach)
            .task(TaskSpec::new("later", Pool).iterations(1).pause(PAUSE));

        let outcome = launch(&launcher, plan);
        assert_eq!(outcome.results, vec![None]);
    }

    #[test]
    fn heavy_main_task_holds_other_main_tasks_back() {
        let config = PlaygroundConfig { work_unit: 2_000_000, ..test_config() };
        let launcher = TaskLauncher::new(&config).unwrap();
        let heavy = HeavyProcessor::new(config.work_unit).process_double_values(1);
        let plan = LaunchPlan::new("blocked main", AwaitPolicy::AwaitAll)
            .caller(Pool)
            .task(TaskSpec::new("heavy", Main).iterations(1))
            .task(TaskSpec::new("light", Main).depends_on(0));

        let outcome = launch(&launcher, plan);
        let light = report_for(&outcome, "light");
        assert!(light.thread.starts_with(MAIN_THREAD_NAME));
        assert_eq!(light.observed_dependency, Some(heavy));
    }

    #[test]
    fn task_name_is_scoped_per_task() {
        let launcher = TaskLauncher::new(&test_config()).unwrap();
        let plan = LaunchPlan::new("names", AwaitPolicy::AwaitAll)
            .task(TaskSpec::new("alpha", Main))
            .task(TaskSpec::new("beta", Main));

        let outcome = launch(&launcher, plan);
        let names: Vec<_> = outcome.reports.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["alpha", "beta"]);
        assert!(launcher.status().current().starts_with("beta"));
    }

    #[test]
    fn status_line_outside_a_task_is_unnamed() {
        assert_eq!(status_line("t"), "unnamed task is executing on thread: t");
    }
}
