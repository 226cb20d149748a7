//! Effective token budget of a subscription.

use serde::{Deserialize, Serialize};

/// Token budget for the current billing period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBudget {
    /// Effective limit; `None` means unlimited.
    pub limit: Option<i64>,
    /// Tokens consumed so far.
    pub used: i64,
}

impl TokenBudget {
    /// Resolves the effective limit: the carried-over override wins over the tier limit.
    #[must_use]
    pub fn new(token_limit_override: Option<i64>, tier_token_limit: Option<i64>, used: i64) -> Self {
        Self {
            limit: token_limit_override.or(tier_token_limit),
            used,
        }
    }

    /// Budget used when a user has no subscription at all.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            limit: Some(0),
            used: 0,
        }
    }

    /// Remaining tokens, `None` when unlimited.
    #[must_use]
    pub fn remaining(&self) -> Option<i64> {
        self.limit.map(|limit| limit.saturating_sub(self.used).max(0))
    }

    /// Whether `requested` more tokens fit in the budget.
    #[must_use]
    pub fn allows(&self, requested: i64) -> bool {
        self.remaining().is_none_or(|remaining| requested <= remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_takes_precedence() {
        let budget = TokenBudget::new(Some(2600), Some(2000), 100);
        assert_eq!(budget.limit, Some(2600));
        assert_eq!(budget.remaining(), Some(2500));
    }

    #[test]
    fn test_unlimited_budget_allows_everything() {
        let budget = TokenBudget::new(None, None, 1_000_000);
        assert_eq!(budget.remaining(), None);
        assert!(budget.allows(i64::MAX));
    }

    #[test]
    fn test_allows_up_to_remaining() {
        let budget = TokenBudget::new(None, Some(1000), 900);
        assert!(budget.allows(100));
        assert!(!budget.allows(101));
    }

    #[test]
    fn test_empty_budget_allows_nothing() {
        let budget = TokenBudget::empty();
        assert_eq!(budget.remaining(), Some(0));
        assert!(!budget.allows(1));
    }
}
