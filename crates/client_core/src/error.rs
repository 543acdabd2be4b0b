use shared::domain::ReviewId;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Create,
    Update,
    Delete,
}

impl WriteAction {
    pub fn as_str(self) -> &'static str {
        match self {
            WriteAction::Create => "create",
            WriteAction::Update => "update",
            WriteAction::Delete => "delete",
        }
    }
}

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("failed to load reviews for {owner}: {source}")]
    LoadFailure {
        owner: String,
        source: anyhow::Error,
    },
    #[error("image upload failed: {0}")]
    UploadFailure(#[source] anyhow::Error),
    #[error("review {} failed: {source}", action.as_str())]
    WriteFailure {
        action: WriteAction,
        source: anyhow::Error,
    },
    #[error("place search failed: {0}")]
    SearchFailure(#[source] anyhow::Error),
    #[error("no places found for '{keyword}'")]
    SearchZeroResult { keyword: String },
    #[error("search keyword is empty")]
    EmptyKeyword,
    #[error("no signed-in user")]
    NotSignedIn,
    #[error("a review form is already open")]
    SessionAlreadyOpen,
    #[error("no review form is open")]
    NoOpenSession,
    #[error("the review form is already being submitted")]
    SubmitInProgress,
    #[error("invalid visit date '{0}'")]
    InvalidVisitDate(String),
    #[error("review {0} is not in the cache")]
    UnknownReview(ReviewId),
    #[error("no reviews at {0}")]
    EmptyCluster(String),
}

impl ReviewError {
    /// Text shown to the user when the error reaches an alert.
    pub fn alert_message(&self) -> String {
        match self {
            ReviewError::LoadFailure { .. } => "Could not load your reviews.".to_string(),
            ReviewError::UploadFailure(_) => "Image upload failed.".to_string(),
            ReviewError::WriteFailure { action, .. } => match action {
                WriteAction::Create => "Saving the review failed.".to_string(),
                WriteAction::Update => "Updating the review failed.".to_string(),
                WriteAction::Delete => "Deleting the review failed.".to_string(),
            },
            ReviewError::SearchFailure(_) => "Place search failed.".to_string(),
            ReviewError::SearchZeroResult { .. } => "No search results.".to_string(),
            ReviewError::EmptyKeyword => "Enter a search keyword.".to_string(),
            ReviewError::NotSignedIn => "Sign in to write a review.".to_string(),
            ReviewError::SessionAlreadyOpen => "Finish or close the open review first.".to_string(),
            ReviewError::NoOpenSession => "No review is being edited.".to_string(),
            ReviewError::SubmitInProgress => "The review is already being saved.".to_string(),
            ReviewError::InvalidVisitDate(raw) => format!("'{raw}' is not a valid visit date."),
            ReviewError::UnknownReview(id) => format!("Review {id} was not found."),
            ReviewError::EmptyCluster(_) => "There are no reviews at this spot.".to_string(),
        }
    }

    /// Load failures are diagnostics only and never reach an alert.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, ReviewError::LoadFailure { .. })
    }
}
