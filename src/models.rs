//! Typed views of the payloads served under `/api/*`.
//!
//! The cache stores raw JSON; these are what callers deserialize into via
//! [`ResourceState::data_as`](crate::cache::ResourceState::data_as).

use serde::{Deserialize, Serialize};

/// Sightseeing spot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attraction {
  pub id: u32,
  pub name: String,
  pub description: String,
  pub image: String,
  pub category: String,
  pub rating: f32,
  pub best_time: Option<String>,
}

/// Homestay, hotel or camp site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accommodation {
  pub id: u32,
  pub name: String,
  #[serde(rename = "type")]
  pub kind: String,
  pub price: String,
  pub rating: f32,
  pub image: String,
  #[serde(default)]
  pub amenities: Vec<String>,
}

/// Current conditions plus a short forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
  pub location: String,
  pub temperature: f32,
  pub condition: String,
  pub humidity: u8,
  pub wind_speed: f32,
  #[serde(default)]
  pub forecast: Vec<ForecastDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDay {
  pub day: String,
  pub high: f32,
  pub low: f32,
  pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
  pub id: u32,
  pub src: String,
  pub alt: String,
  pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
  pub id: u32,
  pub item_id: String,
  #[serde(rename = "type")]
  pub kind: String,
  pub author: String,
  pub rating: u8,
  pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
  pub id: String,
  pub name: String,
  pub email: Option<String>,
  pub avatar: Option<String>,
}
