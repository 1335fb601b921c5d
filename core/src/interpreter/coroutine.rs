//! Coroutine: one execution stack plus its run state

use std::time::Instant;
use tracing::debug;

use super::stack::ExecStack;
use super::types::{CoState, Completion, CoroutineId, Outcome, WaitReason};

#[derive(Debug)]
pub struct Coroutine {
    pub id: CoroutineId,
    pub stack: ExecStack,
    pub state: CoState,

    /// Outstanding waits; the coroutine becomes ready again at zero
    pub waits: u32,

    /// Wait requests not yet collected by the scheduler
    pub(crate) pending: Vec<WaitReason>,

    /// Latest delivered completion, consumed by the element on rerun
    pub(crate) resume: Option<Completion>,

    pub outcome: Option<Outcome>,

    waiting_since: Option<Instant>,
}

impl Coroutine {
    pub fn new(id: CoroutineId, stack: ExecStack) -> Self {
        Coroutine {
            id,
            stack,
            state: CoState::Ready,
            waits: 0,
            pending: Vec::new(),
            resume: None,
            outcome: None,
            waiting_since: None,
        }
    }

    /// Suspend until `reason` completes
    ///
    /// Called by element operations; the element must also set a next step
    /// that handles the resumption.
    pub fn suspend(&mut self, reason: WaitReason) {
        debug!(coroutine = %self.id, ?reason, "coroutine suspending");
        self.pending.push(reason);
        self.waits += 1;
        self.state = CoState::Waiting;
        self.waiting_since.get_or_insert_with(Instant::now);
    }

    /// Record a delivered completion; returns true if the coroutine is ready again
    pub(crate) fn resume_with(&mut self, completion: Completion) -> bool {
        self.resume = Some(completion);
        self.waits = self.waits.saturating_sub(1);
        if self.waits > 0 {
            return false;
        }

        if let Some(since) = self.waiting_since.take() {
            self.stack.stats_mut().time_idle += since.elapsed();
        }
        self.state = CoState::Ready;
        true
    }

    pub fn take_resume(&mut self) -> Option<Completion> {
        self.resume.take()
    }

    pub(crate) fn take_pending(&mut self) -> Vec<WaitReason> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn finish(&mut self, outcome: Outcome) {
        self.state = CoState::Terminated;
        self.waits = 0;
        self.pending.clear();
        self.outcome = Some(outcome);
    }

    pub fn is_terminated(&self) -> bool {
        self.state == CoState::Terminated
    }
}
