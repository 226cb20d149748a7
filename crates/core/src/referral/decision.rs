//! Award decision for a subscription activation.
//!
//! The decision is split so the persistence layer can stop early: `screen`
//! covers the checks that need only the subscription's tier, `decide` adds the
//! pending-referral gate and the configured points.

use studyhub_shared::types::ReferralId;

use super::types::AwardReason;

/// What the award engine knows about the activated subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardSubject {
    /// Name of the subscription's tier.
    pub tier_name: String,
    /// Points the tier awards to the referrer.
    pub referral_points_awarded: i32,
}

/// Result of the award decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwardDecision {
    /// Nothing to award; log as skipped.
    Skip(AwardReason),
    /// Award `points` for `referral_id`.
    Award {
        /// Referral to complete.
        referral_id: ReferralId,
        /// Points to credit.
        points: i32,
    },
}

/// Rules deciding whether an activation earns referral points.
#[derive(Debug, Clone)]
pub struct AwardPolicy {
    free_tier_name: String,
}

impl AwardPolicy {
    /// Creates a policy treating `free_tier_name` as the free tier.
    #[must_use]
    pub fn new(free_tier_name: impl Into<String>) -> Self {
        Self {
            free_tier_name: free_tier_name.into(),
        }
    }

    /// Returns true if `tier_name` is the free tier (case-insensitive).
    #[must_use]
    pub fn is_free_tier(&self, tier_name: &str) -> bool {
        tier_name.eq_ignore_ascii_case(&self.free_tier_name)
    }

    /// Checks that only need the subscription and its tier.
    ///
    /// # Errors
    ///
    /// Returns the skip reason when the subscription is unresolved or on the free tier.
    pub fn screen(&self, subject: Option<&AwardSubject>) -> Result<(), AwardReason> {
        let Some(subject) = subject else {
            return Err(AwardReason::SubscriptionNotFound);
        };
        if self.is_free_tier(&subject.tier_name) {
            return Err(AwardReason::FreeTier);
        }
        Ok(())
    }

    /// Full decision, in order: subscription, free tier, pending referral, points.
    #[must_use]
    pub fn decide(
        &self,
        subject: Option<&AwardSubject>,
        pending_referral: Option<ReferralId>,
    ) -> AwardDecision {
        if let Err(reason) = self.screen(subject) {
            return AwardDecision::Skip(reason);
        }
        let Some(referral_id) = pending_referral else {
            return AwardDecision::Skip(AwardReason::NoPendingReferral);
        };
        let points = subject.map_or(0, |s| s.referral_points_awarded);
        if points <= 0 {
            return AwardDecision::Skip(AwardReason::NoPointsConfigured);
        }
        AwardDecision::Award {
            referral_id,
            points,
        }
    }
}

impl Default for AwardPolicy {
    fn default() -> Self {
        Self::new("free")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(tier: &str, points: i32) -> AwardSubject {
        AwardSubject {
            tier_name: tier.to_string(),
            referral_points_awarded: points,
        }
    }

    #[test]
    fn test_missing_subscription_is_skipped_first() {
        let policy = AwardPolicy::default();
        assert_eq!(
            policy.decide(None, Some(ReferralId::new())),
            AwardDecision::Skip(AwardReason::SubscriptionNotFound)
        );
    }

    #[test]
    fn test_free_tier_never_awards() {
        let policy = AwardPolicy::default();
        let free = subject("Free", 500);
        assert_eq!(
            policy.decide(Some(&free), Some(ReferralId::new())),
            AwardDecision::Skip(AwardReason::FreeTier)
        );
    }

    #[test]
    fn test_no_pending_referral() {
        let policy = AwardPolicy::default();
        let pro = subject("pro", 250);
        assert_eq!(
            policy.decide(Some(&pro), None),
            AwardDecision::Skip(AwardReason::NoPendingReferral)
        );
    }

    #[test]
    fn test_zero_points_checked_after_referral_gate() {
        let policy = AwardPolicy::default();
        let basic = subject("basic", 0);
        assert_eq!(
            policy.decide(Some(&basic), None),
            AwardDecision::Skip(AwardReason::NoPendingReferral)
        );
        assert_eq!(
            policy.decide(Some(&basic), Some(ReferralId::new())),
            AwardDecision::Skip(AwardReason::NoPointsConfigured)
        );
    }

    #[test]
    fn test_award() {
        let policy = AwardPolicy::default();
        let pro = subject("pro", 250);
        let referral_id = ReferralId::new();
        assert_eq!(
            policy.decide(Some(&pro), Some(referral_id)),
            AwardDecision::Award {
                referral_id,
                points: 250
            }
        );
    }

    #[test]
    fn test_custom_free_tier_name() {
        let policy = AwardPolicy::new("starter");
        assert!(policy.is_free_tier("STARTER"));
        assert!(!policy.is_free_tier("free"));
    }
}
