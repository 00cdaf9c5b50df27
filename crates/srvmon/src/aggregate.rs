//! Folding checker results into one service verdict.
//!
//! Both transports evaluate through [`evaluate_health`] and
//! [`evaluate_readiness`], which share a single sequential sweep over the
//! registered checkers. There is no fan-out: the latency of one evaluation
//! is the sum of all checker latencies.

use crate::checker::{CheckContext, Checker};
use crate::error::EvaluationError;
use crate::types::{
    AggregationPolicy, CheckResult, HealthResponse, ReadinessResponse, Status,
};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, error, warn};

/// Results of one pass over every checker.
#[derive(Debug, Default)]
struct Sweep {
    checks: Vec<CheckResult>,
    /// Criticality of the first DOWN checker
    first_down: Option<bool>,
    /// Index of the first DOWN result from a critical checker
    first_critical_down: Option<usize>,
}

impl Sweep {
    fn status(&self, policy: AggregationPolicy) -> Status {
        match policy {
            AggregationPolicy::FirstDown => match self.first_down {
                None => Status::Up,
                Some(true) => Status::Down,
                Some(false) => Status::Degraded,
            },
            AggregationPolicy::Classify => {
                if self.first_critical_down.is_some() {
                    Status::Down
                } else if self.first_down.is_some() {
                    Status::Degraded
                } else {
                    Status::Up
                }
            }
        }
    }
}

async fn sweep(checkers: &[Arc<dyn Checker>], ctx: &CheckContext) -> Result<Sweep, EvaluationError> {
    let mut sweep = Sweep {
        checks: Vec::with_capacity(checkers.len()),
        ..Sweep::default()
    };

    for checker in checkers {
        let result = checker.check(ctx).await.map_err(|e| {
            error!(error = %e, "Dependency check failed to run");
            EvaluationError::from(e)
        })?;

        if result.is_down() {
            let critical = checker.is_critical(ctx);
            warn!(
                dependency = %result.name,
                critical,
                message = %result.message,
                error = result.error.as_deref().unwrap_or(""),
                "Dependency is down"
            );

            if sweep.first_down.is_none() {
                sweep.first_down = Some(critical);
            }
            if critical && sweep.first_critical_down.is_none() {
                sweep.first_critical_down = Some(sweep.checks.len());
            }
        } else {
            debug!(dependency = %result.name, status = %result.status, "Dependency checked");
        }

        sweep.checks.push(result);
    }

    Ok(sweep)
}

/// Run every checker in registration order and fold the results.
///
/// Under [`AggregationPolicy::FirstDown`] the first DOWN result decides the
/// verdict once: DOWN for a critical checker, DEGRADED otherwise. Later DOWN
/// results are still listed but do not change it.
pub async fn evaluate_health(
    checkers: &[Arc<dyn Checker>],
    version: &str,
    policy: AggregationPolicy,
    ctx: &CheckContext,
) -> Result<HealthResponse, EvaluationError> {
    let sweep = sweep(checkers, ctx).await?;

    Ok(HealthResponse {
        status: sweep.status(policy),
        version: version.to_string(),
        checks: sweep.checks,
        timestamp: SystemTime::now(),
    })
}

/// Readiness: not ready until `ready` is set, then not ready while any
/// critical checker is DOWN. The reason is the message of the first
/// critical DOWN result. Non-critical DOWN results are only listed.
pub async fn evaluate_readiness(
    checkers: &[Arc<dyn Checker>],
    ready: bool,
    ctx: &CheckContext,
) -> Result<ReadinessResponse, EvaluationError> {
    if !ready {
        return Ok(ReadinessResponse::not_ready());
    }

    let sweep = sweep(checkers, ctx).await?;
    let reason = sweep
        .first_critical_down
        .map(|index| sweep.checks[index].message.clone());

    Ok(ReadinessResponse {
        ready: reason.is_none(),
        reason: reason.unwrap_or_default(),
        checks: sweep.checks,
        timestamp: SystemTime::now(),
    })
}
