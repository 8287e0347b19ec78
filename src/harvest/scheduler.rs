//! Worker pool that drains the target queue
//!
//! A fixed number of workers pull targets from one shared queue until it is empty.
//! Each target runs in its own task, so a panic while processing one target becomes
//! a failed attempt instead of taking the worker down.

use crate::source::Target;
use crate::state::{AttemptResult, Strategy};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};

pub struct WorkerPool {
    concurrency: usize,
}

impl WorkerPool {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Processes every target and sends each outcome to `sink`
    ///
    /// Returns once the queue is empty and every worker has finished. Outcomes
    /// arrive at the sink in completion order, not queue order.
    pub async fn run<F, Fut>(
        &self,
        targets: Vec<Target>,
        process: F,
        sink: mpsc::Sender<AttemptResult>,
    ) where
        F: Fn(Target) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AttemptResult> + Send + 'static,
    {
        let queue = Arc::new(Mutex::new(VecDeque::from(targets)));
        let process = Arc::new(process);
        let mut workers = Vec::with_capacity(self.concurrency);

        for worker_id in 0..self.concurrency {
            let queue = queue.clone();
            let process = process.clone();
            let sink = sink.clone();

            workers.push(tokio::spawn(async move {
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some(target) = next else {
                        break;
                    };

                    let started = Instant::now();
                    let task = tokio::spawn((*process)(target.clone()));

                    let result = match task.await {
                        Ok(result) => result,
                        Err(e) => {
                            tracing::error!(
                                "Worker {}: processing {} aborted: {}",
                                worker_id,
                                target.id,
                                e
                            );
                            AttemptResult::failed(
                                &target,
                                Strategy::None,
                                None,
                                format!("worker task failed: {}", e),
                                started.elapsed().as_millis() as u64,
                            )
                        }
                    };

                    if sink.send(result).await.is_err() {
                        tracing::error!("Worker {}: recorder channel closed", worker_id);
                        break;
                    }
                }
                tracing::trace!("Worker {} finished", worker_id);
            }));
        }

        drop(sink);

        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!("Worker task failed: {}", e);
            }
        }
    }
}
