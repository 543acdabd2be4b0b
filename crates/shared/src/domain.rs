use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(ReviewId);

/// A map position kept in the exact textual form the backend or the place
/// search produced. Equality and hashing are on the strings, so `"127.0"` and
/// `"127"` are different coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: String,
    pub y: String,
}

impl Coordinate {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
        }
    }

    /// Numeric `(lat, lng)` for placing a marker; `None` when either half is
    /// not a number.
    pub fn lat_lng(&self) -> Option<(f64, f64)> {
        let lat = self.y.trim().parse::<f64>().ok()?;
        let lng = self.x.trim().parse::<f64>().ok()?;
        Some((lat, lng))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(stars: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&stars).then_some(Self(stars))
    }

    pub fn stars(self) -> u8 {
        self.0
    }
}

impl Default for Rating {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::new(value).ok_or_else(|| format!("rating must be 1-5, got {value}"))
    }
}

impl From<Rating> for u8 {
    fn from(value: Rating) -> Self {
        value.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub id: ReviewId,
    pub owner_id: Option<UserId>,
    pub place_id: String,
    pub name: String,
    pub address: String,
    pub coordinate: Coordinate,
    pub rating: Rating,
    pub menu: String,
    pub price: u64,
    pub content: String,
    pub image_url: Option<String>,
    pub visit_date: Option<NaiveDate>,
}

impl Review {
    pub fn visit_date_label(&self) -> String {
        self.visit_date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    pub id: String,
    pub name: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub road_address: Option<String>,
    pub coordinate: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl PlaceCandidate {
    /// Road address when the search provided one, lot address otherwise.
    pub fn display_address(&self) -> &str {
        match self.road_address.as_deref() {
            Some(road) if !road.is_empty() => road,
            _ => &self.address,
        }
    }

    pub fn from_review(review: &Review) -> Self {
        Self {
            id: review.place_id.clone(),
            name: review.name.clone(),
            address: review.address.clone(),
            road_address: Some(review.address.clone()),
            coordinate: review.coordinate.clone(),
            phone: None,
            place_url: None,
            category: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub nickname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}
