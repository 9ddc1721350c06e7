use crate::builder::GrowthReport;
use std::cell::Cell;
use std::time::Duration;

/// Work budget for incremental generation.
pub struct StepBudget {
    /// Function that returns true if the builder should continue working.
    should_continue: Box<dyn Fn() -> bool>,
}

impl StepBudget {
    pub fn new<F: Fn() -> bool + 'static>(should_continue: F) -> Self {
        StepBudget {
            should_continue: Box::new(should_continue),
        }
    }

    /// Returns true if there is budget remaining to continue work.
    pub fn has_budget(&self) -> bool {
        (self.should_continue)()
    }

    /// Unlimited budget (for offline use and tests).
    pub fn unlimited() -> Self {
        StepBudget {
            should_continue: Box::new(|| true),
        }
    }

    /// Allow `count` budget checks to pass, then report exhaustion.
    pub fn steps(count: u32) -> Self {
        let remaining = Cell::new(count);
        StepBudget::new(move || {
            let left = remaining.get();
            if left == 0 {
                false
            } else {
                remaining.set(left - 1);
                true
            }
        })
    }
}

/// Result of a single call to a builder's step function.
#[derive(Clone, Debug, PartialEq)]
pub enum StepResult {
    /// Budget ran out; call again.
    Running,
    /// Suspended; call again at or after the given session time.
    Waiting(Duration),
    /// The pass is over.
    Complete(GrowthReport),
}

impl StepResult {
    pub fn is_complete(&self) -> bool {
        matches!(self, StepResult::Complete(_))
    }
}
