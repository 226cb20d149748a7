//! Token carryover across tier changes.
//!
//! When a user buys a new tier while an active subscription still has unused
//! budget, the remainder is added on top of the new tier's limit as a one-time
//! override. Unlimited budgets (no numeric limit) neither carry over nor
//! receive an override.

use serde::{Deserialize, Serialize};

/// Budget state of the subscription being replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviousBudget {
    /// Effective limit (`override ?? tier.token_limit`); `None` = unlimited.
    pub limit: Option<i64>,
    /// Tokens used in the current period.
    pub used: i64,
}

impl PreviousBudget {
    /// Builds the previous budget from the stored override and tier limit.
    #[must_use]
    pub fn new(token_limit_override: Option<i64>, tier_token_limit: Option<i64>, used: i64) -> Self {
        Self {
            limit: token_limit_override.or(tier_token_limit),
            used,
        }
    }

    /// Unused budget, clamped at zero. Unlimited budgets have nothing to carry.
    #[must_use]
    pub fn remaining(&self) -> i64 {
        self.limit
            .map_or(0, |limit| limit.saturating_sub(self.used).max(0))
    }
}

/// Outcome of the carryover calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carryover {
    /// Unused tokens taken from the previous subscription.
    pub carried_tokens: i64,
    /// Override to store on the new subscription (`None` = plain tier limit).
    pub token_limit_override: Option<i64>,
}

/// Computes the token limit override for a tier change.
///
/// `previous` is `None` when the user has no active subscription.
/// `new_limit` is `None` for unlimited tiers.
#[must_use]
pub fn compute_carryover(previous: Option<PreviousBudget>, new_limit: Option<i64>) -> Carryover {
    let remaining = previous.map_or(0, |p| p.remaining());

    let Some(new_limit) = new_limit else {
        return Carryover {
            carried_tokens: 0,
            token_limit_override: None,
        };
    };

    if remaining > 0 {
        Carryover {
            carried_tokens: remaining,
            token_limit_override: Some(new_limit.saturating_add(remaining)),
        }
    } else {
        Carryover {
            carried_tokens: 0,
            token_limit_override: None,
        }
    }
}
