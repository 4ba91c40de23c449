use std::time::Duration;

use super::scenario::ExecutionContext;

/// One named task of a launch plan.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSpec {
    pub name: String,
    pub context: ExecutionContext,
    /// Workload repetitions. Zero skips the workload.
    pub iterations: u32,
    /// Suspends before reporting in.
    pub pause: Option<Duration>,
    /// Index of an earlier task whose result is added to this one.
    pub depends_on: Option<usize>,
    /// Raises (and catches) a deliberate error after reporting in.
    pub fails: bool,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, context: ExecutionContext) -> Self {
        Self {
            name: name.into(),
            context,
            iterations: 0,
            pause: None,
            depends_on: None,
            fails: false,
        }
    }

    pub fn iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn pause(mut self, pause: Duration) -> Self {
        self.pause = Some(pause);
        self
    }

    pub fn depends_on(mut self, producer: usize) -> Self {
        self.depends_on = Some(producer);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fails = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskStatus {
    Completed,
    Failed,
}

/// What an awaited task handed back.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskReport {
    pub name: String,
    pub thread: String,
    pub status: TaskStatus,
    pub value: Option<f64>,
    /// Producer value read by a dependent task; `0.0` if it read too early.
    pub observed_dependency: Option<f64>,
}

impl TaskReport {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}
