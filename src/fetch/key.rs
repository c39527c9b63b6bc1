//! Resource keys for the `/api/*` endpoints.

use std::fmt;
use url::form_urlencoded::byte_serialize;

/// Logical data domain a resource belongs to.
///
/// Drives both the fetch policy and which mock table backs the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
  Attractions,
  Accommodations,
  Weather,
  Profile,
  Gallery,
  Search,
  Reviews,
  Other,
}

/// Cache key: a request path plus the domain it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
  path: String,
  domain: Domain,
}

fn encode(value: &str) -> String {
  byte_serialize(value.as_bytes()).collect()
}

impl ResourceKey {
  /// Key for an arbitrary path outside the known domains.
  pub fn new(path: impl Into<String>, domain: Domain) -> Self {
    Self {
      path: path.into(),
      domain,
    }
  }

  pub fn attractions() -> Self {
    Self::new("/api/attractions", Domain::Attractions)
  }

  pub fn accommodations() -> Self {
    Self::new("/api/accommodations", Domain::Accommodations)
  }

  pub fn weather(location: &str) -> Self {
    Self::new(
      format!("/api/weather?location={}", encode(location)),
      Domain::Weather,
    )
  }

  pub fn user(user_id: &str) -> Self {
    Self::new(format!("/api/users/{}", encode(user_id)), Domain::Profile)
  }

  pub fn gallery(category: Option<&str>) -> Self {
    match category {
      Some(c) => Self::new(
        format!("/api/gallery?category={}", encode(c)),
        Domain::Gallery,
      ),
      None => Self::new("/api/gallery", Domain::Gallery),
    }
  }

  pub fn search(query: &str) -> Self {
    Self::new(format!("/api/search?q={}", encode(query)), Domain::Search)
  }

  pub fn reviews(item_id: &str, kind: &str) -> Self {
    Self::new(
      format!("/api/reviews?itemId={}&type={}", encode(item_id), encode(kind)),
      Domain::Reviews,
    )
  }

  pub fn path(&self) -> &str {
    &self.path
  }

  pub fn domain(&self) -> Domain {
    self.domain
  }
}

impl fmt::Display for ResourceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.path)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_paths() {
    assert_eq!(ResourceKey::attractions().path(), "/api/attractions");
    assert_eq!(ResourceKey::user("42").path(), "/api/users/42");
    assert_eq!(ResourceKey::gallery(None).path(), "/api/gallery");
    assert_eq!(
      ResourceKey::gallery(Some("sunrise")).path(),
      "/api/gallery?category=sunrise"
    );
    assert_eq!(
      ResourceKey::reviews("7", "homestay").path(),
      "/api/reviews?itemId=7&type=homestay"
    );
  }

  #[test]
  fn test_query_values_are_encoded() {
    assert_eq!(
      ResourceKey::search("săn mây & cắm trại").path(),
      "/api/search?q=s%C4%83n+m%C3%A2y+%26+c%E1%BA%AFm+tr%E1%BA%A1i"
    );
    assert_eq!(
      ResourceKey::weather("Tà Xùa").path(),
      "/api/weather?location=T%C3%A0+X%C3%B9a"
    );
  }

  #[test]
  fn test_domain_tagging() {
    assert_eq!(ResourceKey::weather("x").domain(), Domain::Weather);
    assert_eq!(ResourceKey::search("x").domain(), Domain::Search);
  }
}
