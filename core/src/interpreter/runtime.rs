//! Async driver
//!
//! Runs the scheduler until idle, then services its outbox: timers become
//! `tokio::time::sleep` tasks that report back over a channel, renderer
//! requests go through the bridge with a bounded timeout. Completions are
//! delivered and the loop repeats until no coroutine is ready or waiting.

use chrono::Utc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::atoms::Except;
use super::errors::Exception;
use super::rdr::{BridgeError, RendererBridge};
use super::scheduler::{Finished, Scheduler};
use super::types::{Completion, CoroutineId, PendingWait, WaitReason};
use crate::config::RendererConfig;

pub struct Runtime<R: RendererBridge> {
    scheduler: Scheduler,
    renderer: R,
    timeout: Duration,
    tx: mpsc::UnboundedSender<(CoroutineId, Completion)>,
    rx: mpsc::UnboundedReceiver<(CoroutineId, Completion)>,
    /// Timer tasks that have not reported yet
    in_flight: usize,
}

impl<R: RendererBridge> Runtime<R> {
    pub fn new(mut scheduler: Scheduler, renderer: R, config: &RendererConfig) -> Self {
        scheduler.set_renderer_target(config.dom_handle);
        let (tx, rx) = mpsc::unbounded_channel();
        Runtime {
            scheduler,
            renderer,
            timeout: Duration::from_millis(config.timeout_ms),
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Drive every coroutine to termination and return their outcomes
    pub async fn run(&mut self) -> Vec<Finished> {
        let mut finished = Vec::new();

        loop {
            self.scheduler.run_until_idle();
            self.service_outbox();
            finished.extend(self.scheduler.reap());

            if self.scheduler.has_ready() {
                continue;
            }
            if self.in_flight == 0 {
                if self.scheduler.has_waiting() {
                    warn!("coroutines left waiting with no event in flight");
                }
                break;
            }

            let Some((id, completion)) = self.rx.recv().await else {
                break;
            };
            self.complete(id, completion);
            while let Ok((id, completion)) = self.rx.try_recv() {
                self.complete(id, completion);
            }
        }

        finished
    }

    fn complete(&mut self, id: CoroutineId, completion: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if let Err(err) = self.scheduler.deliver(id, completion) {
            warn!(coroutine = %id, error = %err, "completion dropped");
        }
    }

    fn service_outbox(&mut self) {
        for PendingWait { coroutine, reason } in self.scheduler.take_outbox() {
            match reason {
                WaitReason::Timer { fire_at } => {
                    let delay = (fire_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                    debug!(coroutine = %coroutine, ?delay, "timer scheduled");

                    let tx = self.tx.clone();
                    self.in_flight += 1;
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = tx.send((coroutine, Completion::TimerFired));
                    });
                }
                WaitReason::Renderer(request) => {
                    let completion = match self
                        .renderer
                        .send_request_and_wait(&request, self.timeout)
                    {
                        Ok(response) => Completion::Renderer(response),
                        Err(err) => Completion::Failed(bridge_exception(&err)),
                    };
                    if let Err(err) = self.scheduler.deliver(coroutine, completion) {
                        warn!(coroutine = %coroutine, error = %err, "renderer response dropped");
                    }
                }
            }
        }
    }
}

fn bridge_exception(err: &BridgeError) -> Exception {
    let kind = match err {
        BridgeError::Timeout(_) => Except::Timeout,
        BridgeError::Disconnected(_) | BridgeError::Refused(_) => Except::ServerRefused,
    };
    Exception::builtin(kind, err.to_string())
}
