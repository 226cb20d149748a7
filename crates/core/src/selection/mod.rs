//! Grade/subject selection entitlements.
//!
//! Tiers flagged `can_select_grade` / `can_select_subjects` may change their
//! selection after purchase. Violations are user-facing, so they surface as a
//! structured `(success, message)` result rather than an error.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Selection permissions of a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRules {
    /// Tier may pick a grade.
    pub can_select_grade: bool,
    /// Tier may pick subjects.
    pub can_select_subjects: bool,
    /// Maximum number of subjects.
    pub max_subjects: i32,
}

/// Requested selection change. `None` leaves that part untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRequest {
    /// New grade.
    pub grade_id: Option<Uuid>,
    /// New subject set.
    pub subject_ids: Option<Vec<Uuid>>,
}

/// A validated selection, subjects de-duplicated in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSelection {
    /// Grade to store, if changed.
    pub grade_id: Option<Uuid>,
    /// Subjects to store, if changed.
    pub subject_ids: Option<Vec<Uuid>>,
}

/// Reasons a selection change is rejected. Messages are shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionViolation {
    /// No active subscription to update.
    #[error("No active subscription found")]
    NoActiveSubscription,

    /// Request changes nothing.
    #[error("Nothing to update: provide a grade or a list of subjects")]
    NothingToUpdate,

    /// Tier does not allow grade selection.
    #[error("Your plan does not allow selecting a grade")]
    GradeSelectionNotAllowed,

    /// Tier does not allow subject selection.
    #[error("Your plan does not allow selecting subjects")]
    SubjectSelectionNotAllowed,

    /// Grade id unknown.
    #[error("Invalid grade: {0} does not exist")]
    GradeNotFound(Uuid),

    /// Empty subject list.
    #[error("Select at least one subject")]
    NoSubjects,

    /// Too many subjects for the tier.
    #[error("You can select at most {max} subjects on your plan, got {requested}")]
    TooManySubjects {
        /// Tier maximum.
        max: i32,
        /// Distinct subjects requested.
        requested: usize,
    },

    /// Some subject ids are unknown.
    #[error("Invalid subject: {} does not exist", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    UnknownSubjects(Vec<Uuid>),
}

/// Structured outcome returned to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionUpdateResult {
    /// Whether the selection was stored.
    pub success: bool,
    /// Human-readable message.
    pub message: String,
}

impl SelectionUpdateResult {
    /// Successful update.
    #[must_use]
    pub fn updated() -> Self {
        Self {
            success: true,
            message: "Selection updated".to_string(),
        }
    }

    /// Rejected update.
    #[must_use]
    pub fn rejected(violation: &SelectionViolation) -> Self {
        Self {
            success: false,
            message: violation.to_string(),
        }
    }
}

/// Validates a selection change against the tier rules and the catalog.
///
/// Checks run in order: permissions, grade existence, subject count, subject
/// existence.
///
/// # Errors
///
/// Returns the first `SelectionViolation` found.
pub fn validate_selection<G, S>(
    rules: &SelectionRules,
    request: &SelectionRequest,
    grade_exists: G,
    subject_exists: S,
) -> Result<ValidSelection, SelectionViolation>
where
    G: Fn(Uuid) -> bool,
    S: Fn(Uuid) -> bool,
{
    if request.grade_id.is_none() && request.subject_ids.is_none() {
        return Err(SelectionViolation::NothingToUpdate);
    }
    if request.grade_id.is_some() && !rules.can_select_grade {
        return Err(SelectionViolation::GradeSelectionNotAllowed);
    }
    if request.subject_ids.is_some() && !rules.can_select_subjects {
        return Err(SelectionViolation::SubjectSelectionNotAllowed);
    }

    if let Some(grade_id) = request.grade_id {
        if !grade_exists(grade_id) {
            return Err(SelectionViolation::GradeNotFound(grade_id));
        }
    }

    let subject_ids = match &request.subject_ids {
        None => None,
        Some(ids) => {
            let mut distinct: Vec<Uuid> = Vec::with_capacity(ids.len());
            for id in ids {
                if !distinct.contains(id) {
                    distinct.push(*id);
                }
            }
            if distinct.is_empty() {
                return Err(SelectionViolation::NoSubjects);
            }
            let max = usize::try_from(rules.max_subjects.max(0)).unwrap_or(0);
            if distinct.len() > max {
                return Err(SelectionViolation::TooManySubjects {
                    max: rules.max_subjects,
                    requested: distinct.len(),
                });
            }
            let unknown: Vec<Uuid> = distinct
                .iter()
                .copied()
                .filter(|id| !subject_exists(*id))
                .collect();
            if !unknown.is_empty() {
                return Err(SelectionViolation::UnknownSubjects(unknown));
            }
            Some(distinct)
        }
    };

    Ok(ValidSelection {
        grade_id: request.grade_id,
        subject_ids,
    })
}
