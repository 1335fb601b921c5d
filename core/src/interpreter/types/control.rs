//! Coroutine run state, suspension and completion types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::interpreter::errors::Exception;
use crate::interpreter::rdr::{RdrRequest, RdrResponse};
use crate::variant::Val;

/* ===================== Coroutine State ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CoroutineId(pub u64);

impl fmt::Display for CoroutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "co-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoState {
    Ready,
    Running,
    Waiting,
    Terminated,
}

/// How a coroutine ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Outcome {
    /// Stack emptied normally; carries the root element's result
    Return(Val),
    /// Stack emptied with an unhandled exception
    Throw(Exception),
    /// Aborted by a structural fault or allocation failure
    Fatal(String),
    Cancelled,
}

/* ===================== Suspension ===================== */

/// External event a suspended coroutine waits for
#[derive(Debug, Clone, PartialEq)]
pub enum WaitReason {
    Timer { fire_at: DateTime<Utc> },
    Renderer(RdrRequest),
}

/// Wait request handed to the host by the scheduler
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWait {
    pub coroutine: CoroutineId,
    pub reason: WaitReason,
}

/// Delivered result of an external event
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    TimerFired,
    Renderer(RdrResponse),
    Failed(Exception),
}

/* ===================== Step Result ===================== */

/// Result of one scheduler step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A coroutine ran
    Ran(CoroutineId),
    /// Nothing is ready; some coroutines wait on external events
    Idle,
    /// Every coroutine has terminated
    Done,
}
