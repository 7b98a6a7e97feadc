// src/scheduler.rs

use std::future::Future;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Handle to a periodic background task.
///
/// `cancel` stops the task and waits for it to finish; dropping the handle
/// aborts it instead.
pub struct TaskHandle {
    name: String,
    cancel_tx: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl TaskHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |j| j.is_finished())
    }

    pub async fn cancel(mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            // Receiver is gone only if the task already ended.
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                warn!("Task '{}' ended abnormally: {}", self.name, e);
            }
        }
        info!("Stopped periodic task '{}'", self.name);
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        if let Some(join) = self.join.take() {
            debug!("Aborting periodic task '{}'", self.name);
            join.abort();
        }
    }
}

pub struct PeriodicTask;

impl PeriodicTask {
    /// Runs `tick` every `period`, starting immediately. A tick that overruns
    /// skips the missed ticks rather than bursting to catch up.
    pub fn spawn<F, Fut>(name: &str, period: Duration, mut tick: F) -> TaskHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let task_name = name.to_string();

        let join = tokio::spawn(async move {
            info!("Starting periodic task '{}' every {:?}", task_name, period);
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = &mut cancel_rx => break,
                    _ = interval.tick() => tick().await,
                }
            }
            debug!("Periodic task '{}' loop exited", task_name);
        });

        TaskHandle {
            name: name.to_string(),
            cancel_tx: Some(cancel_tx),
            join: Some(join),
        }
    }
}

/// Owns the periodic tasks of one view. Shutting it down (or dropping it)
/// stops every task it started.
#[derive(Default)]
pub struct Scheduler {
    tasks: Vec<TaskHandle>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn every<F, Fut>(&mut self, name: &str, period: Duration, tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.tasks.push(PeriodicTask::spawn(name, period, tick));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub async fn shutdown(mut self) {
        for task in self.tasks.drain(..) {
            task.cancel().await;
        }
    }
}
