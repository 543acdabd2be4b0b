use shared::domain::{Coordinate, PlaceCandidate};
use tracing::{debug, warn};

use crate::{
    cache::ReviewCache,
    markers::{self, MarkerGroup},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    None,
    PlaceFocus(PlaceCandidate),
    ReviewFocus(Coordinate),
}

/// What the map shows on top of the markers for the active focus.
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay<'a> {
    Place(&'a PlaceCandidate),
    ReviewCluster(MarkerGroup<'a>),
}

/// Single active focus: a search result, a review cluster, or nothing.
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    state: Selection,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &Selection {
        &self.state
    }

    /// Refused when a review already sits on the candidate's coordinate; the
    /// search marker for such a place is never offered.
    pub fn focus_place(&mut self, candidate: PlaceCandidate, cache: &ReviewCache) -> bool {
        if markers::is_coordinate_already_reviewed(cache, &candidate.coordinate) {
            warn!(
                place_id = %candidate.id,
                coordinate = %candidate.coordinate,
                "ignoring focus on a place that already has a review marker"
            );
            return false;
        }
        debug!(place_id = %candidate.id, "place focused");
        self.state = Selection::PlaceFocus(candidate);
        true
    }

    pub fn focus_review_cluster(&mut self, coordinate: Coordinate) {
        debug!(%coordinate, "review cluster focused");
        self.state = Selection::ReviewFocus(coordinate);
    }

    pub fn clear(&mut self) {
        self.state = Selection::None;
    }

    /// A finished create consumes the focused search result.
    pub fn on_create_closed(&mut self) {
        if matches!(self.state, Selection::PlaceFocus(_)) {
            self.state = Selection::None;
        }
    }

    /// Called after a review left the cache. Keeps a focused cluster while it
    /// still has members.
    pub fn on_review_removed(&mut self, cache: &ReviewCache) {
        if let Selection::ReviewFocus(coordinate) = &self.state {
            if !markers::is_coordinate_already_reviewed(cache, coordinate) {
                debug!(%coordinate, "focused cluster emptied; clearing selection");
                self.state = Selection::None;
            }
        }
    }

    pub fn overlay<'a>(&'a self, cache: &'a ReviewCache) -> Option<Overlay<'a>> {
        match &self.state {
            Selection::None => None,
            Selection::PlaceFocus(place) => Some(Overlay::Place(place)),
            Selection::ReviewFocus(coordinate) => {
                markers::group_at(cache, coordinate).map(Overlay::ReviewCluster)
            }
        }
    }
}
