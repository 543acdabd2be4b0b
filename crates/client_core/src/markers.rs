//! One map marker per distinct coordinate.
//!
//! Grouping is by exact coordinate text. Two reviews whose coordinates are
//! numerically equal but formatted differently get separate markers.

use std::collections::HashMap;

use shared::domain::{Coordinate, PlaceCandidate, Review};

use crate::cache::ReviewCache;

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerGroup<'a> {
    pub key: &'a Coordinate,
    pub members: Vec<&'a Review>,
}

impl<'a> MarkerGroup<'a> {
    /// First member in cache order; placement and click target of the marker.
    pub fn representative(&self) -> &'a Review {
        self.members[0]
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Groups in order of first appearance, members in cache order.
pub fn groups(cache: &ReviewCache) -> Vec<MarkerGroup<'_>> {
    let mut index: HashMap<&Coordinate, usize> = HashMap::new();
    let mut groups: Vec<MarkerGroup<'_>> = Vec::new();

    for review in cache.iter() {
        match index.get(&review.coordinate) {
            Some(&slot) => groups[slot].members.push(review),
            None => {
                index.insert(&review.coordinate, groups.len());
                groups.push(MarkerGroup {
                    key: &review.coordinate,
                    members: vec![review],
                });
            }
        }
    }

    groups
}

pub fn group_at<'a>(cache: &'a ReviewCache, coordinate: &Coordinate) -> Option<MarkerGroup<'a>> {
    let members: Vec<&Review> = cache.at(coordinate).collect();
    let first: &'a Review = members.first().copied()?;
    Some(MarkerGroup {
        key: &first.coordinate,
        members,
    })
}

pub fn is_coordinate_already_reviewed(cache: &ReviewCache, coordinate: &Coordinate) -> bool {
    cache.iter().any(|review| &review.coordinate == coordinate)
}

/// Search results minus those sitting exactly on an existing review marker.
pub fn visible_search_results<'a>(
    cache: &ReviewCache,
    places: &'a [PlaceCandidate],
) -> Vec<&'a PlaceCandidate> {
    places
        .iter()
        .filter(|place| !is_coordinate_already_reviewed(cache, &place.coordinate))
        .collect()
}
