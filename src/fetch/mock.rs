//! Built-in payloads served when the backend cannot provide usable data.

use serde_json::{json, Value};

use super::key::Domain;

/// Mock tables keyed by domain.
///
/// Only attractions, accommodations and weather carry content; every other
/// domain falls back to an empty list.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockCatalog;

impl MockCatalog {
  pub fn payload(&self, domain: Domain) -> Value {
    match domain {
      Domain::Attractions => attractions(),
      Domain::Accommodations => accommodations(),
      Domain::Weather => weather(),
      _ => json!([]),
    }
  }
}

fn attractions() -> Value {
  json!([
    {
      "id": 1,
      "name": "Sống lưng khủng long",
      "description": "Dải núi đá hẹp chạy dài giữa biển mây, điểm check-in nổi tiếng nhất Tà Xùa.",
      "image": "/images/attractions/song-lung-khung-long/main.webp",
      "category": "trekking",
      "rating": 4.9,
      "bestTime": "Tháng 10 - tháng 4"
    },
    {
      "id": 2,
      "name": "Cây cô đơn",
      "description": "Cây táo mèo đứng một mình trên đỉnh đồi, nhìn thẳng ra thung lũng mây.",
      "image": "/images/attractions/cay-co-don/main.webp",
      "category": "viewpoint",
      "rating": 4.7,
      "bestTime": "Sáng sớm"
    },
    {
      "id": 3,
      "name": "Biển mây Tà Xùa",
      "description": "Thiên đường săn mây ở độ cao hơn 2.000 m, đẹp nhất lúc bình minh.",
      "image": "/images/attractions/bien-may/main.webp",
      "category": "nature",
      "rating": 4.8,
      "bestTime": "Tháng 11 - tháng 3"
    },
    {
      "id": 4,
      "name": "Mỏm cá heo",
      "description": "Mỏm đá nhô ra như chú cá heo giữa tầng mây, cách bản Bẹ không xa.",
      "image": "/images/attractions/mom-ca-heo/main.webp",
      "category": "viewpoint",
      "rating": 4.6,
      "bestTime": null
    }
  ])
}

fn accommodations() -> Value {
  json!([
    {
      "id": 1,
      "name": "Homestay Tà Xùa Cloud",
      "type": "homestay",
      "price": "350.000đ - 500.000đ",
      "rating": 4.6,
      "image": "/images/accommodations/taxua-cloud/main.webp",
      "amenities": ["wifi", "bữa sáng", "view mây"]
    },
    {
      "id": 2,
      "name": "Mây Homestay",
      "type": "homestay",
      "price": "300.000đ - 450.000đ",
      "rating": 4.5,
      "image": "/images/accommodations/may-homestay/main.webp",
      "amenities": ["wifi", "bếp chung"]
    },
    {
      "id": 3,
      "name": "Khu cắm trại Đỉnh Gió",
      "type": "camping",
      "price": "150.000đ / lều",
      "rating": 4.3,
      "image": "/images/accommodations/dinh-gio/main.webp",
      "amenities": ["lửa trại", "thuê lều"]
    }
  ])
}

fn weather() -> Value {
  json!({
    "location": "Tà Xùa",
    "temperature": 14.0,
    "condition": "Có mây",
    "humidity": 85,
    "windSpeed": 12.0,
    "forecast": [
      { "day": "Hôm nay", "high": 17.0, "low": 10.0, "condition": "Biển mây buổi sáng" },
      { "day": "Ngày mai", "high": 18.0, "low": 11.0, "condition": "Nắng nhẹ" },
      { "day": "Ngày kia", "high": 15.0, "low": 9.0, "condition": "Mưa phùn" }
    ]
  })
}
