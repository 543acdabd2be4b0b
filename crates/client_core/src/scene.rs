use shared::domain::PlaceCandidate;

use crate::{
    cache::ReviewCache,
    markers::{self, MarkerGroup},
    selection::{Overlay, SelectionController},
};

/// Everything the map draws for the current engine state.
#[derive(Debug, Clone, PartialEq)]
pub struct MapScene<'a> {
    pub review_markers: Vec<MarkerGroup<'a>>,
    pub search_markers: Vec<&'a PlaceCandidate>,
    pub overlay: Option<Overlay<'a>>,
}

impl<'a> MapScene<'a> {
    pub fn build(
        cache: &'a ReviewCache,
        search_results: &'a [PlaceCandidate],
        selection: &'a SelectionController,
    ) -> Self {
        Self {
            review_markers: markers::groups(cache),
            search_markers: markers::visible_search_results(cache, search_results),
            overlay: selection.overlay(cache),
        }
    }
}
