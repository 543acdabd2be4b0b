use shared::{
    domain::{Coordinate, Review, ReviewId},
    protocol::ReviewRecord,
};
use tracing::{error, info};

use crate::{dates::DateNormalizer, error::ReviewError, ReviewStore};

/// The signed-in user's reviews as last loaded from the store.
///
/// The collection is only ever replaced wholesale by [`ReviewCache::load`] or
/// shrunk by [`ReviewCache::remove`]; individual fields are never patched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewCache {
    reviews: Vec<Review>,
}

impl ReviewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(
        &mut self,
        store: &dyn ReviewStore,
        owner: &str,
        dates: &DateNormalizer,
    ) -> Result<&[Review], ReviewError> {
        let records = store.list_reviews(owner).await.map_err(|source| {
            error!(owner, error = %source, "review load failed; keeping previous cache");
            ReviewError::LoadFailure {
                owner: owner.to_string(),
                source,
            }
        })?;

        self.replace(records, dates);
        info!(owner, count = self.reviews.len(), "review cache reloaded");
        Ok(&self.reviews)
    }

    pub fn replace(&mut self, records: Vec<ReviewRecord>, dates: &DateNormalizer) {
        self.reviews = records
            .into_iter()
            .map(|record| review_from_record(record, dates))
            .collect();
    }

    /// Drops one review after the store confirmed its deletion.
    pub fn remove(&mut self, id: ReviewId) -> Option<Review> {
        let index = self.reviews.iter().position(|review| review.id == id)?;
        Some(self.reviews.remove(index))
    }

    pub fn get(&self, id: ReviewId) -> Option<&Review> {
        self.reviews.iter().find(|review| review.id == id)
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn iter(&self) -> impl Iterator<Item = &Review> {
        self.reviews.iter()
    }

    pub fn at(&self, coordinate: &Coordinate) -> impl Iterator<Item = &Review> {
        let coordinate = coordinate.clone();
        self.reviews
            .iter()
            .filter(move |review| review.coordinate == coordinate)
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    pub fn clear(&mut self) {
        self.reviews.clear();
    }
}

fn review_from_record(record: ReviewRecord, dates: &DateNormalizer) -> Review {
    Review {
        id: record.review_id,
        owner_id: record.user_id,
        place_id: record.kakao_id,
        name: record.name,
        address: record.address,
        coordinate: Coordinate::new(record.x, record.y),
        rating: record.rating,
        menu: record.menu_name,
        price: record.price,
        content: record.content,
        image_url: record.image_url,
        visit_date: record
            .visit_date
            .map(|stored| dates.to_local_date(&stored)),
    }
}
