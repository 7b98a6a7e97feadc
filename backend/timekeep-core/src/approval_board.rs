// src/approval_board.rs

use std::sync::Arc;
use tracing::info;

use crate::api_client::TimeTrackingApi;
use crate::clock::Clock;
use crate::error::Result;
use crate::overtime::{ApprovalQueue, ApprovalStatus, ApprovalSummary, OvertimeRequest};
use crate::policy::PolicyConfig;

/// Administrator view of overtime requests awaiting a decision.
pub struct ApprovalBoard {
    api: Arc<dyn TimeTrackingApi>,
    clock: Arc<dyn Clock>,
    policy: PolicyConfig,
    queue: ApprovalQueue,
}

impl ApprovalBoard {
    pub fn new(api: Arc<dyn TimeTrackingApi>, clock: Arc<dyn Clock>, policy: PolicyConfig) -> Self {
        Self {
            api,
            clock,
            policy,
            queue: ApprovalQueue::default(),
        }
    }

    pub async fn refresh(&mut self) -> Result<usize> {
        let records = self.api.overtime_requests().await?;
        let requests: Vec<OvertimeRequest> = records
            .into_iter()
            .map(|r| OvertimeRequest::from_record(r, self.clock.as_ref()))
            .collect();
        self.queue.replace(requests);
        Ok(self.queue.pending().count())
    }

    /// Records a decision. A request that is unknown or already decided is
    /// refused locally and never reaches the collaborator.
    pub async fn decide(&mut self, id: u64, approved: bool) -> Result<ApprovalStatus> {
        self.queue.ensure_pending(id)?;
        self.api.decide_overtime(id, approved).await?;
        let status = self.queue.decide(id, approved)?;
        info!(id, %status, "Decision sent");
        Ok(status)
    }

    pub fn pending(&self) -> Vec<&OvertimeRequest> {
        self.queue.pending().collect()
    }

    pub fn summary(&self) -> ApprovalSummary {
        self.queue.summary(&self.policy)
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }
}
