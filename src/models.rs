//! Domain types: review/submission statuses, file variants, activity actions.

/// Review status of a single photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Some(ReviewStatus::Pending),
            "approved" => Some(ReviewStatus::Approved),
            "rejected" => Some(ReviewStatus::Rejected),
            _ => None,
        }
    }

    /// Human-readable label used in notification emails.
    pub fn label(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "Pending review",
            ReviewStatus::Approved => "Approved",
            ReviewStatus::Rejected => "Rejected",
        }
    }
}

/// Lifecycle status of a submission, derived from its photos' review statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Some(SubmissionStatus::Pending),
            "approved" => Some(SubmissionStatus::Approved),
            "rejected" => Some(SubmissionStatus::Rejected),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "Pending review",
            SubmissionStatus::Approved => "Approved",
            SubmissionStatus::Rejected => "Rejected",
        }
    }
}

/// Derive a submission's overall status from its photos' review statuses.
///
/// Non-empty and all approved wins; otherwise any rejection rejects the
/// submission; the empty set and any pending/mixed set without a rejection
/// stay pending. Deterministic and idempotent.
pub fn aggregate_status(statuses: &[ReviewStatus]) -> SubmissionStatus {
    if !statuses.is_empty() && statuses.iter().all(|s| *s == ReviewStatus::Approved) {
        SubmissionStatus::Approved
    } else if statuses.iter().any(|s| *s == ReviewStatus::Rejected) {
        SubmissionStatus::Rejected
    } else {
        SubmissionStatus::Pending
    }
}

/// What a stored file is: a reviewable photo or an as-is original.
///
/// Originals carry no review state; photos carry no parent link. Modeling the
/// two as variants keeps an "original with a review status" unrepresentable.
#[derive(Debug, Clone)]
pub enum FileKind {
    Photo {
        review_status: ReviewStatus,
        review_comment: String,
        thumb_path: Option<String>,
    },
    Original {
        /// None: attached to the submission itself.
        /// Some: linked to one approved photo.
        parent_photo_id: Option<i64>,
    },
}

/// One stored file row.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub id: i64,
    pub submission_id: i64,
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub kind: FileKind,
}

impl StoredFile {
    pub fn is_original(&self) -> bool {
        matches!(self.kind, FileKind::Original { .. })
    }

    pub fn parent_photo_id(&self) -> Option<i64> {
        match self.kind {
            FileKind::Original { parent_photo_id } => parent_photo_id,
            FileKind::Photo { .. } => None,
        }
    }
}

/// One submission row. Identity is the unique, lowercased email.
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: i64,
    pub name: String,
    pub district: String,
    pub email: String,
    pub phone: String,
    pub comment: String,
    pub status: SubmissionStatus,
    pub admin_comment: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Activity log action types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    SubmissionCreated,
    SubmissionUpdated,
    ProfileCreated,
    ProfileUpdated,
    PhotosUploaded,
    PhotoOriginalUploaded,
    PhotoOriginalDeleted,
    PhotoDeleted,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::SubmissionCreated => "submission_created",
            ActionType::SubmissionUpdated => "submission_updated",
            ActionType::ProfileCreated => "profile_created",
            ActionType::ProfileUpdated => "profile_updated",
            ActionType::PhotosUploaded => "photos_uploaded",
            ActionType::PhotoOriginalUploaded => "photo_original_uploaded",
            ActionType::PhotoOriginalDeleted => "photo_original_deleted",
            ActionType::PhotoDeleted => "photo_deleted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReviewStatus::{Approved, Pending, Rejected};

    #[test]
    fn empty_set_is_pending() {
        assert_eq!(aggregate_status(&[]), SubmissionStatus::Pending);
    }

    #[test]
    fn all_approved_is_approved() {
        assert_eq!(
            aggregate_status(&[Approved, Approved, Approved]),
            SubmissionStatus::Approved
        );
        assert_eq!(aggregate_status(&[Approved]), SubmissionStatus::Approved);
    }

    #[test]
    fn any_rejection_rejects_unless_all_approved() {
        assert_eq!(
            aggregate_status(&[Rejected, Approved, Approved]),
            SubmissionStatus::Rejected
        );
        assert_eq!(
            aggregate_status(&[Pending, Rejected]),
            SubmissionStatus::Rejected
        );
    }

    #[test]
    fn mixed_without_rejection_stays_pending() {
        assert_eq!(
            aggregate_status(&[Approved, Pending]),
            SubmissionStatus::Pending
        );
        assert_eq!(
            aggregate_status(&[Pending, Pending, Pending]),
            SubmissionStatus::Pending
        );
    }

    #[test]
    fn aggregation_is_deterministic() {
        let set = [Approved, Pending, Approved];
        assert_eq!(aggregate_status(&set), aggregate_status(&set));
    }

    #[test]
    fn review_scenario_transitions() {
        // Three photos: approve one by one, then reject one.
        let mut statuses = vec![Pending, Pending, Pending];
        assert_eq!(aggregate_status(&statuses), SubmissionStatus::Pending);

        statuses[0] = Approved;
        assert_eq!(aggregate_status(&statuses), SubmissionStatus::Pending);

        statuses[1] = Approved;
        statuses[2] = Approved;
        assert_eq!(aggregate_status(&statuses), SubmissionStatus::Approved);

        statuses[0] = Rejected;
        assert_eq!(aggregate_status(&statuses), SubmissionStatus::Rejected);
    }

    #[test]
    fn status_parsing_round_trips_and_rejects_unknown() {
        for status in ["pending", "approved", "rejected"] {
            assert_eq!(SubmissionStatus::parse(status).unwrap().as_str(), status);
            assert_eq!(ReviewStatus::parse(status).unwrap().as_str(), status);
        }
        assert_eq!(SubmissionStatus::parse(" Approved "), Some(SubmissionStatus::Approved));
        assert!(SubmissionStatus::parse("archived").is_none());
        assert!(ReviewStatus::parse("").is_none());
    }
}
