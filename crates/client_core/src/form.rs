//! Create/edit session for a single review.
//!
//! The session is a pure state machine: it never talks to the store. The
//! engine asks it for a [`SubmitPlan`], performs the upload and the write, and
//! reports back. Price text is coerced and the visit date is parsed only when
//! a plan is built.

use chrono::{DateTime, NaiveDate, Utc};
use shared::{
    domain::{PlaceCandidate, Rating, Review, ReviewId, UserId},
    protocol::{CreateReviewRequest, UpdateReviewRequest},
};

use crate::{
    dates::{format_visit_date, DateNormalizer},
    error::ReviewError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create(PlaceCandidate),
    Edit {
        review_id: ReviewId,
        place_name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PendingMedia {
    #[default]
    None,
    LocalFile(LocalFile),
    /// The edited review's current image, shown but never re-sent.
    Retained(Option<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    Opened,
    Submitting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDraft {
    pub rating: Rating,
    pub content: String,
    pub menu: String,
    /// Raw text as typed; see [`coerce_price`].
    pub price: String,
    /// `YYYY-MM-DD` as typed.
    pub visit_date: String,
}

impl ReviewDraft {
    fn blank(today: NaiveDate) -> Self {
        Self {
            rating: Rating::default(),
            content: String::new(),
            menu: String::new(),
            price: String::new(),
            visit_date: format_visit_date(today),
        }
    }

    fn from_review(review: &Review) -> Self {
        Self {
            rating: review.rating,
            content: review.content.clone(),
            menu: review.menu.clone(),
            price: review.price.to_string(),
            visit_date: review.visit_date_label(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftField {
    Rating(Rating),
    Content(String),
    Menu(String),
    Price(String),
    VisitDate(String),
}

#[derive(Debug, Clone)]
pub struct ReviewFormSession {
    mode: FormMode,
    draft: ReviewDraft,
    media: PendingMedia,
    phase: FormPhase,
}

impl ReviewFormSession {
    pub fn open_for_create(candidate: PlaceCandidate, today: NaiveDate) -> Self {
        Self {
            mode: FormMode::Create(candidate),
            draft: ReviewDraft::blank(today),
            media: PendingMedia::None,
            phase: FormPhase::Opened,
        }
    }

    pub fn open_for_edit(review: &Review) -> Self {
        Self {
            mode: FormMode::Edit {
                review_id: review.id,
                place_name: review.name.clone(),
            },
            draft: ReviewDraft::from_review(review),
            media: PendingMedia::Retained(review.image_url.clone()),
            phase: FormPhase::Opened,
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn draft(&self) -> &ReviewDraft {
        &self.draft
    }

    pub fn media(&self) -> &PendingMedia {
        &self.media
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn is_create(&self) -> bool {
        matches!(self.mode, FormMode::Create(_))
    }

    pub fn place_name(&self) -> &str {
        match &self.mode {
            FormMode::Create(place) => &place.name,
            FormMode::Edit { place_name, .. } => place_name,
        }
    }

    pub fn set_field(&mut self, field: DraftField) -> Result<(), ReviewError> {
        self.ensure_editable()?;
        match field {
            DraftField::Rating(rating) => self.draft.rating = rating,
            DraftField::Content(content) => self.draft.content = content,
            DraftField::Menu(menu) => self.draft.menu = menu,
            DraftField::Price(price) => self.draft.price = price,
            DraftField::VisitDate(visit_date) => self.draft.visit_date = visit_date,
        }
        Ok(())
    }

    /// In edit mode the file is still uploaded on submit, but the update
    /// carries no image so the stored photo stays as it was.
    pub fn attach_local_file(&mut self, file: LocalFile) -> Result<(), ReviewError> {
        self.ensure_editable()?;
        self.media = PendingMedia::LocalFile(file);
        Ok(())
    }

    /// Validates the draft and moves the session to `Submitting`.
    pub fn begin_submit(&mut self, dates: &DateNormalizer) -> Result<SubmitPlan, ReviewError> {
        self.ensure_editable()?;
        let visit_date = dates
            .to_submission_timestamp(&self.draft.visit_date)
            .map_err(|_| ReviewError::InvalidVisitDate(self.draft.visit_date.clone()))?;

        let (upload, retained_image) = match &self.media {
            PendingMedia::None => (None, None),
            PendingMedia::LocalFile(file) => (Some(file.clone()), None),
            PendingMedia::Retained(url) => (None, url.clone()),
        };
        let target = match &self.mode {
            FormMode::Create(place) => WriteTarget::Create(place.clone()),
            FormMode::Edit { review_id, .. } => WriteTarget::Update(*review_id),
        };

        self.phase = FormPhase::Submitting;
        Ok(SubmitPlan {
            upload,
            retained_image,
            target,
            fields: SubmitFields {
                rating: self.draft.rating,
                content: self.draft.content.clone(),
                menu: self.draft.menu.clone(),
                price: coerce_price(&self.draft.price),
                visit_date,
            },
        })
    }

    /// Upload failed: the write never happens and the form stays open.
    pub fn abort_submit(&mut self) {
        self.phase = FormPhase::Opened;
    }

    fn ensure_editable(&self) -> Result<(), ReviewError> {
        match self.phase {
            FormPhase::Opened => Ok(()),
            FormPhase::Submitting => Err(ReviewError::SubmitInProgress),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteTarget {
    Create(PlaceCandidate),
    Update(ReviewId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitFields {
    pub rating: Rating,
    pub content: String,
    pub menu: String,
    pub price: u64,
    pub visit_date: DateTime<Utc>,
}

/// Everything needed to run the two submit phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitPlan {
    pub upload: Option<LocalFile>,
    retained_image: Option<String>,
    pub target: WriteTarget,
    pub fields: SubmitFields,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReviewWrite {
    Create(CreateReviewRequest),
    Update {
        review_id: ReviewId,
        request: UpdateReviewRequest,
    },
}

impl SubmitPlan {
    /// Uploaded reference if phase one uploaded a file, otherwise the
    /// retained one.
    pub fn effective_image(&self, uploaded: Option<String>) -> Option<String> {
        uploaded.or_else(|| self.retained_image.clone())
    }

    pub fn into_write(self, user_id: UserId, effective_image: Option<String>) -> ReviewWrite {
        let SubmitFields {
            rating,
            content,
            menu,
            price,
            visit_date,
        } = self.fields;

        match self.target {
            WriteTarget::Create(place) => ReviewWrite::Create(CreateReviewRequest {
                user_id,
                address: place.display_address().to_string(),
                kakao_id: place.id,
                name: place.name,
                category: place.category.unwrap_or_default(),
                x: place.coordinate.x,
                y: place.coordinate.y,
                rating,
                visit_date,
                content,
                menu_name: menu,
                price,
                image_url: effective_image,
            }),
            WriteTarget::Update(review_id) => ReviewWrite::Update {
                review_id,
                request: UpdateReviewRequest {
                    rating,
                    content,
                    menu_name: menu,
                    price,
                    visit_date,
                },
            },
        }
    }
}

/// Leading-integer parse: surrounding whitespace and an optional `+` are
/// accepted, trailing junk is ignored, anything else (including negatives
/// and empty input) is 0.
pub fn coerce_price(raw: &str) -> u64 {
    let trimmed = raw.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits_end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    unsigned[..digits_end].parse().unwrap_or(0)
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
