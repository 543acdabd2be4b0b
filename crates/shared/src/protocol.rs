use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::{Rating, ReviewId, UserId};

/// One review as returned by `GET /api/reviews/{username}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub review_id: ReviewId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, deserialize_with = "coordinate_text")]
    pub kakao_id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub rating: Rating,
    #[serde(default)]
    pub menu_name: String,
    #[serde(default, deserialize_with = "lenient_price")]
    pub price: u64,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(deserialize_with = "coordinate_text")]
    pub x: String,
    #[serde(deserialize_with = "coordinate_text")]
    pub y: String,
    #[serde(default)]
    pub visit_date: Option<DateTime<Utc>>,
}

/// Body of `POST /api/reviews`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub user_id: UserId,
    pub kakao_id: String,
    pub name: String,
    pub address: String,
    pub category: String,
    pub x: String,
    pub y: String,
    pub rating: Rating,
    #[serde(with = "wire_timestamp")]
    pub visit_date: DateTime<Utc>,
    pub content: String,
    pub menu_name: String,
    pub price: u64,
    pub image_url: Option<String>,
}

/// Body of `PUT /api/reviews/{id}`. Carries no image field; an update never
/// touches the stored photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReviewRequest {
    pub rating: Rating,
    pub content: String,
    pub menu_name: String,
    pub price: u64,
    #[serde(with = "wire_timestamp")]
    pub visit_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewResponse {
    #[serde(alias = "reviewId", default)]
    pub id: Option<ReviewId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadImageResponse {
    pub image_url: String,
}

/// Formats a timestamp the way the backend stores visit dates:
/// `2024-05-01T12:00:00.000Z`.
pub fn format_wire_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

mod wire_timestamp {
    use super::*;

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_wire_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        DateTime::<Utc>::deserialize(deserializer)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(serde_json::Number),
}

// Coordinates and place ids arrive as either JSON strings or numbers; both
// are kept verbatim as text.
fn coordinate_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match TextOrNumber::deserialize(deserializer)? {
        TextOrNumber::Text(text) => text,
        TextOrNumber::Number(number) => number.to_string(),
    })
}

fn lenient_price<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|value| match value {
            serde_json::Value::String(text) => text.trim().parse().ok(),
            other => other.as_u64().or_else(|| {
                other
                    .as_f64()
                    .filter(|price| price.is_finite() && *price >= 0.0)
                    .map(|price| price.trunc() as u64)
            }),
        })
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_record_keeps_numeric_coordinates_as_text() {
        let record: ReviewRecord = serde_json::from_value(serde_json::json!({
            "reviewId": 4,
            "kakaoId": 998877,
            "name": "Noodle Bar",
            "address": "12 Main St",
            "rating": 4,
            "menuName": "ramen",
            "price": null,
            "content": "good",
            "imageUrl": null,
            "x": 127.0,
            "y": "37.5",
            "visitDate": "2024-05-01T12:00:00.000Z"
        }))
        .expect("record");

        assert_eq!(record.review_id, ReviewId(4));
        assert_eq!(record.kakao_id, "998877");
        assert_eq!(record.x, "127.0");
        assert_eq!(record.y, "37.5");
        assert_eq!(record.price, 0);
        assert!(record.visit_date.is_some());
    }

    fn price_of(price: serde_json::Value) -> u64 {
        let record: ReviewRecord = serde_json::from_value(serde_json::json!({
            "reviewId": 1,
            "name": "Noodle Bar",
            "rating": 4,
            "price": price,
            "x": "127.0",
            "y": "37.5"
        }))
        .expect("record");
        record.price
    }

    #[test]
    fn fractional_prices_are_truncated() {
        assert_eq!(price_of(serde_json::json!(9000.0)), 9000);
        assert_eq!(price_of(serde_json::json!(8999.9)), 8999);
        assert_eq!(price_of(serde_json::json!(-5.5)), 0);
        assert_eq!(price_of(serde_json::json!(-3)), 0);
        assert_eq!(price_of(serde_json::json!(" 7000 ")), 7000);
    }

    #[test]
    fn update_request_has_no_image_field() {
        let request = UpdateReviewRequest {
            rating: Rating::new(3).expect("rating"),
            content: "ok".into(),
            menu_name: "soup".into(),
            price: 9000,
            visit_date: "2024-05-01T12:00:00Z".parse().expect("timestamp"),
        };
        let json = serde_json::to_value(&request).expect("json");
        assert!(json.get("imageUrl").is_none());
        assert_eq!(json["visitDate"], "2024-05-01T12:00:00.000Z");
        assert_eq!(json["menuName"], "soup");
    }
}
