//! QoS Buffer Manager - buffer pool and profile reconciliation

use serde::Serialize;
use sonic_rest_common::{execute_sequentially, RestRequest, Transport};
use tracing::{info, instrument, warn};

use crate::compile::compile;
use crate::config::QosBufferConfig;
use crate::diff::{diff, ChangeRecord};
use crate::error::QosBufferResult;
use crate::facts::fetch_buffer_config;
use crate::types::{BufferConfig, DesiredConfig, Mode};

/// Requests needed to move the device to the desired state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcilePlan {
    pub mode: Mode,
    pub changed: bool,
    /// The change records behind the requests.
    pub commands: Vec<ChangeRecord>,
    /// Requests to execute, strictly in this order.
    pub requests: Vec<RestRequest>,
}

/// Result of a full fetch, plan and apply cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileOutcome {
    pub mode: Mode,
    pub changed: bool,
    /// True when requests were planned but not sent.
    pub check_mode: bool,
    pub commands: Vec<ChangeRecord>,
    pub requests: Vec<RestRequest>,
    /// Device state before the run.
    pub before: BufferConfig,
    /// Device state after the run, when something was applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<BufferConfig>,
}

/// QoS Buffer Manager
///
/// Reconciles desired buffer pools and profiles against the device.
/// Holds configuration only; every call is independent.
#[derive(Debug, Clone, Default)]
pub struct QosBufferMgr {
    config: QosBufferConfig,
}

impl QosBufferMgr {
    pub fn new(config: QosBufferConfig) -> Self {
        info!("QosBufferMgr initialized with {:?}", config);
        Self { config }
    }

    pub fn config(&self) -> &QosBufferConfig {
        &self.config
    }

    /// Plans the requests that move `existing` to `desired` under `mode`.
    ///
    /// Pure: no I/O. Fails with a validation error, before any diffing,
    /// when the desired configuration is inconsistent.
    pub fn plan(
        &self,
        desired: &DesiredConfig,
        existing: &BufferConfig,
        mode: Mode,
    ) -> QosBufferResult<ReconcilePlan> {
        let validated = desired.validate()?;
        let commands = diff(&validated, existing, mode);
        let requests = compile(&commands, self.config.batching);

        info!(
            "Planned {} requests from {} changes ({} mode)",
            requests.len(),
            commands.len(),
            mode
        );

        Ok(ReconcilePlan {
            mode,
            changed: !requests.is_empty(),
            commands,
            requests,
        })
    }

    /// Fetches device state, plans, and applies the plan in order.
    ///
    /// In check mode nothing is sent. Execution stops at the first
    /// rejected request and the error reports which one it was; requests
    /// already applied are not rolled back.
    #[instrument(skip_all, fields(mode = %mode))]
    pub async fn reconcile<T>(
        &self,
        transport: &T,
        desired: &DesiredConfig,
        mode: Mode,
    ) -> QosBufferResult<ReconcileOutcome>
    where
        T: Transport + ?Sized,
    {
        let before = fetch_buffer_config(transport).await?;
        let plan = self.plan(desired, &before, mode)?;

        if !plan.changed {
            info!("Buffer configuration already in desired state");
        } else if self.config.check_mode {
            info!("Check mode, not sending {} requests", plan.requests.len());
        } else {
            if let Err(e) = execute_sequentially(transport, &plan.requests).await {
                warn!(
                    "Stopped after {} of {} requests",
                    e.applied(),
                    plan.requests.len()
                );
                return Err(e.into());
            }
            info!("Applied {} requests", plan.requests.len());
        }

        let applied = plan.changed && !self.config.check_mode;
        let after = if applied && self.config.refresh_after_apply {
            Some(fetch_buffer_config(transport).await?)
        } else {
            None
        };

        Ok(ReconcileOutcome {
            mode,
            changed: plan.changed,
            check_mode: self.config.check_mode,
            commands: plan.commands,
            requests: plan.requests,
            before,
            after,
        })
    }
}
