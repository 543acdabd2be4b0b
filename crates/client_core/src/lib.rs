use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{
    domain::{Coordinate, PlaceCandidate, ReviewId, UserProfile},
    protocol::{CreateReviewRequest, ReviewRecord, UpdateReviewRequest},
};
use tracing::{debug, error, info, warn};

pub mod cache;
mod credentials;
pub mod dates;
pub mod error;
pub mod form;
pub mod markers;
pub mod scene;
pub mod selection;
pub mod transport;

pub use cache::ReviewCache;
pub use credentials::FileCredentialStore;
pub use dates::DateNormalizer;
pub use error::{ReviewError, WriteAction};
pub use form::{DraftField, LocalFile, ReviewFormSession};
pub use scene::MapScene;
pub use selection::{Overlay, Selection, SelectionController};
pub use transport::HttpReviewStore;

/// Zoom level used when a broadened search jumps the map to its first hit.
const BROADENED_SEARCH_ZOOM_LEVEL: u8 = 3;

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn list_reviews(&self, owner: &str) -> Result<Vec<ReviewRecord>>;
    async fn create_review(&self, request: &CreateReviewRequest) -> Result<Option<ReviewId>>;
    async fn update_review(&self, review_id: ReviewId, request: &UpdateReviewRequest)
        -> Result<()>;
    async fn delete_review(&self, review_id: ReviewId) -> Result<()>;
}

#[async_trait]
pub trait ImageUploader: Send + Sync {
    /// Returns the stored image reference.
    async fn upload_image(&self, file: &LocalFile) -> Result<String>;
}

pub struct MissingImageUploader;

#[async_trait]
impl ImageUploader for MissingImageUploader {
    async fn upload_image(&self, file: &LocalFile) -> Result<String> {
        Err(anyhow!(
            "image upload is unavailable; cannot store '{}'",
            file.file_name
        ))
    }
}

#[async_trait]
pub trait PlaceSearch: Send + Sync {
    /// `center` of `None` asks for an unrestricted search.
    async fn search_places(
        &self,
        keyword: &str,
        center: Option<&Coordinate>,
    ) -> Result<Vec<PlaceCandidate>>;
}

pub struct MissingPlaceSearch;

#[async_trait]
impl PlaceSearch for MissingPlaceSearch {
    async fn search_places(
        &self,
        keyword: &str,
        _center: Option<&Coordinate>,
    ) -> Result<Vec<PlaceCandidate>> {
        Err(anyhow!("place search is unavailable for '{keyword}'"))
    }
}

pub trait MapService: Send + Sync {
    fn center(&self) -> Option<Coordinate>;
    fn pan_to(&self, coordinate: &Coordinate);
    fn recenter(&self, coordinate: &Coordinate, zoom_level: u8);
    fn render(&self, scene: &MapScene<'_>);
}

pub trait CredentialStore: Send + Sync {
    fn load_profile(&self) -> Result<Option<UserProfile>>;
    fn clear_profile(&self) -> Result<()>;
}

pub trait UserPrompt: Send + Sync {
    fn alert(&self, message: &str);
    fn confirm(&self, message: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub action: WriteAction,
    pub review_id: Option<ReviewId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
}

/// Owns the review cache, the focus state, the latest search results and the
/// open form session, and runs every remote call on their behalf.
///
/// All methods take `&mut self`; each store call is awaited before the next
/// state change, so nothing else can touch the engine mid-operation.
pub struct ReviewMapEngine {
    store: Arc<dyn ReviewStore>,
    uploader: Arc<dyn ImageUploader>,
    search: Arc<dyn PlaceSearch>,
    map: Arc<dyn MapService>,
    credentials: Arc<dyn CredentialStore>,
    prompt: Arc<dyn UserPrompt>,
    dates: DateNormalizer,
    profile: Option<UserProfile>,
    cache: ReviewCache,
    selection: SelectionController,
    search_results: Vec<PlaceCandidate>,
    form: Option<ReviewFormSession>,
}

impl ReviewMapEngine {
    pub fn new(
        store: Arc<dyn ReviewStore>,
        map: Arc<dyn MapService>,
        credentials: Arc<dyn CredentialStore>,
        prompt: Arc<dyn UserPrompt>,
    ) -> Self {
        Self::new_with_dependencies(
            store,
            Arc::new(MissingImageUploader),
            Arc::new(MissingPlaceSearch),
            map,
            credentials,
            prompt,
            DateNormalizer::local(),
        )
    }

    pub fn new_with_dependencies(
        store: Arc<dyn ReviewStore>,
        uploader: Arc<dyn ImageUploader>,
        search: Arc<dyn PlaceSearch>,
        map: Arc<dyn MapService>,
        credentials: Arc<dyn CredentialStore>,
        prompt: Arc<dyn UserPrompt>,
        dates: DateNormalizer,
    ) -> Self {
        Self {
            store,
            uploader,
            search,
            map,
            credentials,
            prompt,
            dates,
            profile: None,
            cache: ReviewCache::new(),
            selection: SelectionController::new(),
            search_results: Vec::new(),
            form: None,
        }
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub fn cache(&self) -> &ReviewCache {
        &self.cache
    }

    pub fn selection(&self) -> &Selection {
        self.selection.state()
    }

    pub fn search_results(&self) -> &[PlaceCandidate] {
        &self.search_results
    }

    pub fn form(&self) -> Option<&ReviewFormSession> {
        self.form.as_ref()
    }

    pub fn dates(&self) -> &DateNormalizer {
        &self.dates
    }

    pub fn scene(&self) -> MapScene<'_> {
        MapScene::build(&self.cache, &self.search_results, &self.selection)
    }

    fn render(&self) {
        self.map.render(&self.scene());
    }

    fn alert(&self, err: &ReviewError) {
        if err.is_user_facing() {
            self.prompt.alert(&err.alert_message());
        }
    }

    /// Reads the stored profile once and, when someone is signed in, performs
    /// the first load.
    pub async fn start(&mut self) -> Option<&UserProfile> {
        let profile = match self.credentials.load_profile() {
            Ok(profile) => profile,
            Err(err) => {
                warn!(error = %err, "stored profile unreadable; starting signed out");
                None
            }
        };
        self.start_with_profile(profile).await
    }

    /// Same as [`ReviewMapEngine::start`] for a caller that already read the
    /// profile, e.g. to configure the store's bearer token.
    pub async fn start_with_profile(
        &mut self,
        profile: Option<UserProfile>,
    ) -> Option<&UserProfile> {
        self.profile = profile;
        match self.profile.as_ref().map(|profile| profile.username.clone()) {
            Some(username) => {
                info!(%username, "starting with stored profile");
                // A failed first load is already logged and leaves the cache empty.
                let _ = self.reload().await;
            }
            None => {
                info!("starting without a signed-in user");
                self.render();
            }
        }
        self.profile.as_ref()
    }

    /// Replaces the cache with the store's current list. Failures are logged
    /// and leave the cache as it was.
    pub async fn reload(&mut self) -> Result<(), ReviewError> {
        let Some(owner) = self.profile.as_ref().map(|profile| profile.username.clone()) else {
            return Err(ReviewError::NotSignedIn);
        };
        let result = self
            .cache
            .load(self.store.as_ref(), &owner, &self.dates)
            .await
            .map(|_| ());
        self.selection.on_review_removed(&self.cache);
        self.render();
        result
    }

    /// Runs a keyword search around the map centre, retrying once without the
    /// centre when the first attempt finds nothing. A map with no centre gets a
    /// single unrestricted attempt.
    pub async fn search(&mut self, keyword: &str) -> Result<usize, ReviewError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            let err = ReviewError::EmptyKeyword;
            self.alert(&err);
            return Err(err);
        }

        let center = self.map.center();
        let mut broadened = false;
        let mut places = match self.search.search_places(keyword, center.as_ref()).await {
            Ok(places) => places,
            Err(source) => return Err(self.search_failed(source)),
        };

        // Without a centre the first attempt was already unrestricted.
        if places.is_empty() && center.is_some() {
            debug!(keyword, "no nearby places; retrying without location bias");
            broadened = true;
            places = match self.search.search_places(keyword, None).await {
                Ok(places) => places,
                Err(source) => return Err(self.search_failed(source)),
            };
        }

        if places.is_empty() {
            let err = ReviewError::SearchZeroResult {
                keyword: keyword.to_string(),
            };
            self.alert(&err);
            return Err(err);
        }

        info!(keyword, count = places.len(), broadened, "place search finished");
        if let Some(first) = places.first() {
            if broadened {
                self.map
                    .recenter(&first.coordinate, BROADENED_SEARCH_ZOOM_LEVEL);
            } else {
                self.map.pan_to(&first.coordinate);
            }
        }
        self.search_results = places;
        if matches!(self.selection.state(), Selection::PlaceFocus(_)) {
            self.selection.clear();
        }
        self.render();
        Ok(self.search_results.len())
    }

    fn search_failed(&self, source: anyhow::Error) -> ReviewError {
        error!(error = %source, "place search failed");
        let err = ReviewError::SearchFailure(source);
        self.alert(&err);
        err
    }

    /// Focuses one of the current search results. Returns `false` when the
    /// place is unknown or already carries a review marker.
    pub fn focus_place(&mut self, place_id: &str) -> bool {
        let Some(place) = self
            .search_results
            .iter()
            .find(|place| place.id == place_id)
            .cloned()
        else {
            return false;
        };
        let focused = self.selection.focus_place(place, &self.cache);
        if focused {
            self.render();
        }
        focused
    }

    pub fn focus_review_cluster(&mut self, coordinate: Coordinate) {
        self.selection.focus_review_cluster(coordinate);
        self.render();
    }

    /// Pans to a review from the list and opens its cluster.
    pub fn show_review(&mut self, review_id: ReviewId) -> Result<(), ReviewError> {
        let coordinate = self
            .cache
            .get(review_id)
            .map(|review| review.coordinate.clone())
            .ok_or(ReviewError::UnknownReview(review_id))?;
        self.map.pan_to(&coordinate);
        self.focus_review_cluster(coordinate);
        Ok(())
    }

    /// Background click or explicit close.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.render();
    }

    pub fn open_create(
        &mut self,
        candidate: PlaceCandidate,
    ) -> Result<&mut ReviewFormSession, ReviewError> {
        self.ensure_no_open_form()?;
        debug!(place_id = %candidate.id, "opening create form");
        let today = self.dates.today();
        Ok(self
            .form
            .insert(ReviewFormSession::open_for_create(candidate, today)))
    }

    /// "Add another visit" from a cluster overlay: the new review targets the
    /// cluster's place and the overlay closes.
    pub fn open_create_at_cluster(
        &mut self,
        coordinate: &Coordinate,
    ) -> Result<&mut ReviewFormSession, ReviewError> {
        self.ensure_no_open_form()?;
        let candidate = markers::group_at(&self.cache, coordinate)
            .map(|group| PlaceCandidate::from_review(group.representative()))
            .ok_or_else(|| ReviewError::EmptyCluster(coordinate.to_string()))?;
        self.selection.clear();
        self.render();
        self.open_create(candidate)
    }

    pub fn open_edit(&mut self, review_id: ReviewId) -> Result<&mut ReviewFormSession, ReviewError> {
        self.ensure_no_open_form()?;
        let review = self
            .cache
            .get(review_id)
            .ok_or(ReviewError::UnknownReview(review_id))?;
        debug!(%review_id, "opening edit form");
        let session = ReviewFormSession::open_for_edit(review);
        Ok(self.form.insert(session))
    }

    fn ensure_no_open_form(&self) -> Result<(), ReviewError> {
        if self.form.is_some() {
            let err = ReviewError::SessionAlreadyOpen;
            self.alert(&err);
            return Err(err);
        }
        Ok(())
    }

    pub fn set_field(&mut self, field: DraftField) -> Result<(), ReviewError> {
        self.form
            .as_mut()
            .ok_or(ReviewError::NoOpenSession)?
            .set_field(field)
    }

    pub fn attach_local_file(&mut self, file: LocalFile) -> Result<(), ReviewError> {
        self.form
            .as_mut()
            .ok_or(ReviewError::NoOpenSession)?
            .attach_local_file(file)
    }

    /// Discards the draft without any remote call.
    pub fn cancel_form(&mut self) -> Result<(), ReviewError> {
        match self.form.take() {
            Some(session) => {
                debug!(place = session.place_name(), "review form cancelled");
                Ok(())
            }
            None => Err(ReviewError::NoOpenSession),
        }
    }

    /// Uploads a pending file, then creates or updates the review.
    ///
    /// A failed upload leaves the form open and writes nothing. Once the write
    /// has been attempted the form closes whatever its outcome; a failed write
    /// is alerted and returned as [`ReviewError::WriteFailure`].
    pub async fn submit_form(&mut self) -> Result<SubmitOutcome, ReviewError> {
        let Some(user_id) = self.profile.as_ref().map(|profile| profile.id) else {
            let err = ReviewError::NotSignedIn;
            self.alert(&err);
            return Err(err);
        };
        let session = self.form.as_mut().ok_or(ReviewError::NoOpenSession)?;
        let is_create = session.is_create();
        let plan = match session.begin_submit(&self.dates) {
            Ok(plan) => plan,
            Err(err) => {
                self.alert(&err);
                return Err(err);
            }
        };

        let uploaded = match &plan.upload {
            Some(file) => match self.uploader.upload_image(file).await {
                Ok(image_url) => {
                    info!(file = %file.file_name, %image_url, "image uploaded");
                    Some(image_url)
                }
                Err(source) => {
                    error!(file = %file.file_name, error = %source, "image upload failed; review not written");
                    if let Some(session) = self.form.as_mut() {
                        session.abort_submit();
                    }
                    let err = ReviewError::UploadFailure(source);
                    self.alert(&err);
                    return Err(err);
                }
            },
            None => None,
        };
        if !is_create && uploaded.is_some() {
            warn!("uploaded image is not applied to an existing review");
        }

        let image = plan.effective_image(uploaded);
        let (action, written) = match plan.into_write(user_id, image) {
            form::ReviewWrite::Create(request) => (
                WriteAction::Create,
                self.store.create_review(&request).await,
            ),
            form::ReviewWrite::Update { review_id, request } => (
                WriteAction::Update,
                self.store
                    .update_review(review_id, &request)
                    .await
                    .map(|()| Some(review_id)),
            ),
        };

        let outcome = match written {
            Ok(review_id) => {
                info!(action = action.as_str(), ?review_id, "review written");
                self.prompt.alert(match action {
                    WriteAction::Create => "Review saved.",
                    _ => "Review updated.",
                });
                // Load failures are logged by the cache and not surfaced.
                let _ = self.reload().await;
                Ok(SubmitOutcome { action, review_id })
            }
            Err(source) => {
                error!(action = action.as_str(), error = %source, "review write failed");
                let err = ReviewError::WriteFailure { action, source };
                self.alert(&err);
                Err(err)
            }
        };

        self.form = None;
        if is_create {
            self.selection.on_create_closed();
        }
        self.render();
        outcome
    }

    /// Asks for confirmation, deletes remotely, then drops the review locally.
    pub async fn delete_review(&mut self, review_id: ReviewId) -> Result<DeleteOutcome, ReviewError> {
        if self.cache.get(review_id).is_none() {
            let err = ReviewError::UnknownReview(review_id);
            self.alert(&err);
            return Err(err);
        }
        if !self.prompt.confirm("Delete this review?") {
            debug!(%review_id, "delete declined");
            return Ok(DeleteOutcome::Declined);
        }

        if let Err(source) = self.store.delete_review(review_id).await {
            error!(%review_id, error = %source, "review delete failed");
            let err = ReviewError::WriteFailure {
                action: WriteAction::Delete,
                source,
            };
            self.alert(&err);
            return Err(err);
        }

        self.cache.remove(review_id);
        self.selection.on_review_removed(&self.cache);
        info!(%review_id, remaining = self.cache.len(), "review deleted");
        self.prompt.alert("Review deleted.");
        self.render();
        Ok(DeleteOutcome::Deleted)
    }

    /// Forgets the stored profile and the cached reviews.
    pub fn logout(&mut self) -> bool {
        if !self.prompt.confirm("Log out?") {
            return false;
        }
        if let Err(err) = self.credentials.clear_profile() {
            warn!(error = %err, "failed to clear stored profile");
        }
        self.profile = None;
        self.cache.clear();
        self.selection.on_review_removed(&self.cache);
        info!("logged out");
        self.prompt.alert("Logged out.");
        self.render();
        true
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
