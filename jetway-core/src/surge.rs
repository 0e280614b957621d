use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::UserKey;
use crate::repository::AttemptLog;
use crate::CoreResult;

/// Repeat-attempt throttle: `threshold` or more prior attempts by the same
/// requester on the same flight inside `window` triggers `multiplier`.
#[derive(Debug, Clone, PartialEq)]
pub struct SurgePolicy {
    pub window: Duration,
    pub threshold: u32,
    pub multiplier: Decimal,
}

impl Default for SurgePolicy {
    fn default() -> Self {
        Self {
            window: Duration::minutes(5),
            threshold: 3,
            multiplier: Decimal::new(110, 2),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SurgeDecision {
    pub applied: bool,
    pub multiplier: Decimal,
    pub prior_attempts: u32,
}

impl SurgeDecision {
    pub fn none(prior_attempts: u32) -> Self {
        Self {
            applied: false,
            multiplier: Decimal::ONE,
            prior_attempts,
        }
    }
}

impl SurgePolicy {
    pub fn decide(&self, prior_attempts: u32) -> SurgeDecision {
        if prior_attempts >= self.threshold {
            SurgeDecision {
                applied: true,
                multiplier: self.multiplier,
                prior_attempts,
            }
        } else {
            SurgeDecision::none(prior_attempts)
        }
    }
}

pub struct SurgeEvaluator {
    log: Arc<dyn AttemptLog>,
    policy: SurgePolicy,
}

impl SurgeEvaluator {
    pub fn new(log: Arc<dyn AttemptLog>, policy: SurgePolicy) -> Self {
        Self { log, policy }
    }

    pub fn policy(&self) -> &SurgePolicy {
        &self.policy
    }

    /// Must run before the current attempt is recorded.
    pub async fn evaluate(&self, flight_id: Uuid, user_key: &UserKey, now: DateTime<Utc>) -> CoreResult<SurgeDecision> {
        let prior = self
            .log
            .count_recent_attempts(flight_id, user_key, self.policy.window, now)
            .await?;
        let decision = self.policy.decide(prior);
        if decision.applied {
            tracing::info!(%flight_id, %user_key, prior, "Surge multiplier applied");
        }
        Ok(decision)
    }

    pub async fn record(&self, flight_id: Uuid, user_key: &UserKey, at: DateTime<Utc>) -> CoreResult<()> {
        self.log.record_attempt(flight_id, user_key, at).await
    }
}
