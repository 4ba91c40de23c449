use std::fmt;

use super::task::{TaskReport, TaskSpec};
use crate::config::PlaygroundConfig;
use crate::error::PlaygroundError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionContext {
    /// The session's single-threaded loop, `main-loop`.
    Main,
    /// The session's CPU-sized worker pool.
    Pool,
    /// Process-wide pool that outlives every session.
    Global,
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionContext::Main => "main",
            ExecutionContext::Pool => "pool",
            ExecutionContext::Global => "global",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwaitPolicy {
    /// Fire-and-forget.
    Detach,
    /// Start everything, join only the first task.
    AwaitFirst,
    /// Start everything, then join every task.
    AwaitAll,
    /// Join each task before starting the next one.
    Sequential,
}

/// How a finished launch summarises its result cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultReport {
    None,
    Sum,
    Last,
}

/// Configuration record of one launch.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchPlan {
    pub label: String,
    /// Where the launching code itself runs.
    pub caller: ExecutionContext,
    pub tasks: Vec<TaskSpec>,
    pub await_policy: AwaitPolicy,
    pub report: ResultReport,
    /// Logged by the caller right after its tasks are started.
    pub note: Option<String>,
}

impl LaunchPlan {
    pub fn new(label: impl Into<String>, await_policy: AwaitPolicy) -> Self {
        Self {
            label: label.into(),
            caller: ExecutionContext::Main,
            tasks: Vec::new(),
            await_policy,
            report: ResultReport::None,
            note: None,
        }
    }

    pub fn caller(mut self, caller: ExecutionContext) -> Self {
        self.caller = caller;
        self
    }

    pub fn task(mut self, task: TaskSpec) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn report(mut self, report: ResultReport) -> Self {
        self.report = report;
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaunchOutcome {
    pub label: String,
    /// Reports of the tasks that were joined, in plan order.
    pub reports: Vec<TaskReport>,
    /// Every task's result cell as seen right after the await policy was met.
    pub results: Vec<Option<f64>>,
    pub report: ResultReport,
}

impl LaunchOutcome {
    /// Sum of the result cells, counting unfinished tasks as `0.0`.
    pub fn combined(&self) -> f64 {
        self.results.iter().map(|value| value.unwrap_or(0.0)).sum()
    }

    pub fn last(&self) -> Option<f64> {
        self.results.last().copied().flatten()
    }

    pub fn summary(&self) -> Option<String> {
        match self.report {
            ResultReport::None => None,
            ResultReport::Sum => Some(format!("Result : {}", self.combined())),
            ResultReport::Last => Some(match self.last() {
                Some(value) => format!("Result : {}", value),
                None => "Result : <not ready>".to_string(),
            }),
        }
    }
}

/// The menu of demonstrations, one trigger each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    LaunchOnMain,
    LaunchOnPool,
    LaunchGlobal,
    HeavyOnMain,
    HeavyOnPool,
    TwoOnMainWithDelay,
    LaunchFromBackground,
    AsyncAwait,
    AwaitLongOnly,
    AwaitShortOnly,
    AwaitBoth,
    DependentWrongWay,
    DependentRightWay,
    IsolatedFailure,
}

impl Scenario {
    pub const ALL: [Scenario; 14] = [
        Scenario::LaunchOnMain,
        Scenario::LaunchOnPool,
        Scenario::LaunchGlobal,
        Scenario::HeavyOnMain,
        Scenario::HeavyOnPool,
        Scenario::TwoOnMainWithDelay,
        Scenario::LaunchFromBackground,
        Scenario::AsyncAwait,
        Scenario::AwaitLongOnly,
        Scenario::AwaitShortOnly,
        Scenario::AwaitBoth,
        Scenario::DependentWrongWay,
        Scenario::DependentRightWay,
        Scenario::IsolatedFailure,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Scenario::LaunchOnMain => "Launch on Main Thread",
            Scenario::LaunchOnPool => "Launch on Worker Pool",
            Scenario::LaunchGlobal => "Launch Global task without dispatcher",
            Scenario::HeavyOnMain => "Heavy processing on Main thread",
            Scenario::HeavyOnPool => "Heavy processing on Worker thread",
            Scenario::TwoOnMainWithDelay => "Two tasks on Main thread with delay",
            Scenario::LaunchFromBackground => "Launch from background caller into session scope",
            Scenario::AsyncAwait => "Simple async with await",
            Scenario::AwaitLongOnly => "Multiple async with await on long process",
            Scenario::AwaitShortOnly => "Multiple async with await on short process",
            Scenario::AwaitBoth => "Multiple async with await on both process",
            Scenario::DependentWrongWay => "Multiple dependent async - wrong way",
            Scenario::DependentRightWay => "Multiple dependent async - right way",
            Scenario::IsolatedFailure => "Failing task does not abort its sibling",
        }
    }

    /// 1-based position in the menu.
    pub fn number(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).map_or(0, |i| i + 1)
    }

    pub fn from_number(number: usize) -> Result<Self, PlaygroundError> {
        number
            .checked_sub(1)
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or_else(|| PlaygroundError::UnknownScenario(number.to_string()))
    }

    pub fn plan(&self, config: &PlaygroundConfig) -> LaunchPlan {
        use ExecutionContext::{Global, Main, Pool};

        let long = config.long_iterations;
        let pause = config.pause();
        let plan = LaunchPlan::new(self.label(), AwaitPolicy::Detach);

        match self {
            Scenario::LaunchOnMain => plan.task(TaskSpec::new("Luke", Main)),
            Scenario::LaunchOnPool => plan.task(TaskSpec::new("Leia", Pool)),
            Scenario::LaunchGlobal => plan.task(TaskSpec::new("Jyn", Global)),
            Scenario::HeavyOnMain => plan
                .task(TaskSpec::new("Heavy Process on Main thread", Main).iterations(1))
                .note("This will be printed only after the execution of what's inside launch"),
            Scenario::HeavyOnPool => plan
                .task(TaskSpec::new("Heavy Process on worker thread", Pool).iterations(1))
                .note("This will be printed in parallel with the launched task"),
            Scenario::TwoOnMainWithDelay => plan
                .task(TaskSpec::new("First", Main).pause(pause))
                .task(TaskSpec::new("Second", Main)),
            Scenario::LaunchFromBackground => plan.caller(Pool).task(TaskSpec::new("Snowy", Main)),
            Scenario::AsyncAwait => LaunchPlan::new(self.label(), AwaitPolicy::AwaitAll)
                .task(TaskSpec::new("Async await simple", Main).iterations(1))
                .report(ResultReport::Last)
                .note("Caller now waits for the async result"),
            Scenario::AwaitLongOnly => LaunchPlan::new(self.label(), AwaitPolicy::AwaitFirst)
                .task(TaskSpec::new("Async await 1", Pool).iterations(long))
                .task(TaskSpec::new("Async await 2", Pool).iterations(1))
                .report(ResultReport::Sum)
                .note("Hi from main thread"),
            Scenario::AwaitShortOnly => LaunchPlan::new(self.label(), AwaitPolicy::AwaitFirst)
                .task(TaskSpec::new("Async await 1", Pool).iterations(1))
                .task(TaskSpec::new("Async await 2", Pool).iterations(long))
                .report(ResultReport::Sum)
                .note("Hi from main thread"),
            Scenario::AwaitBoth => LaunchPlan::new(self.label(), AwaitPolicy::AwaitAll)
                .task(TaskSpec::new("Async await 1", Pool).iterations(1))
                .task(TaskSpec::new("Async await 2", Pool).iterations(long))
                .report(ResultReport::Sum)
                .note("Hi from main thread"),
            Scenario::DependentWrongWay => LaunchPlan::new(self.label(), AwaitPolicy::AwaitAll)
                .task(TaskSpec::new("Async await 1", Pool).iterations(long))
                .task(TaskSpec::new("Async await 2", Pool).iterations(1).depends_on(0))
                .report(ResultReport::Last)
                .note("Hi from main thread"),
            Scenario::DependentRightWay => LaunchPlan::new(self.label(), AwaitPolicy::Sequential)
                .task(TaskSpec::new("Async await 1", Pool).iterations(long))
                .task(TaskSpec::new("Async await 2", Pool).iterations(1).depends_on(0))
                .report(ResultReport::Last)
                .note("Hi from main thread"),
            Scenario::IsolatedFailure => LaunchPlan::new(self.label(), AwaitPolicy::AwaitAll)
                .task(TaskSpec::new("Failing task", Pool).iterations(1).failing())
                .task(TaskSpec::new("Sibling task", Pool).iterations(1))
                .report(ResultReport::Sum),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
