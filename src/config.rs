use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub maps: MapsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Origin the `/api/*` paths are resolved against
  pub base_url: String,
  pub user_agent: Option<String>,
  /// Per-request timeout; unset means the client default
  pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:3000".to_string(),
      user_agent: Some(concat!("taxua/", env!("CARGO_PKG_VERSION")).to_string()),
      timeout_secs: Some(15),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapsConfig {
  pub script_url: String,
  pub libraries: Vec<String>,
  pub language: String,
  pub region: String,
}

impl Default for MapsConfig {
  fn default() -> Self {
    Self {
      script_url: "https://maps.googleapis.com/maps/api/js".to_string(),
      libraries: vec!["places".to_string()],
      language: "vi".to_string(),
      region: "VN".to_string(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./taxua.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/taxua/config.yaml
  ///
  /// With no file found the built-in defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => {
        tracing::debug!("no config file found, using defaults");
        Ok(Self::default())
      }
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("taxua.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("taxua").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }

  /// Get the maps API key from environment variables.
  ///
  /// Checks TAXUA_MAPS_API_KEY first, then VITE_GOOGLE_MAPS_API_KEY as fallback.
  /// Missing means empty; the loader refuses to run without a key.
  pub fn get_maps_api_key() -> String {
    std::env::var("TAXUA_MAPS_API_KEY")
      .or_else(|_| std::env::var("VITE_GOOGLE_MAPS_API_KEY"))
      .unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_partial_yaml_keeps_defaults() {
    let config = Config::from_yaml("api:\n  base_url: https://taxua.example\n").unwrap();
    assert_eq!(config.api.base_url, "https://taxua.example");
    assert_eq!(config.api.timeout_secs, Some(15));
    assert_eq!(config.maps.language, "vi");
    assert_eq!(config.maps.libraries, vec!["places"]);
  }

  #[test]
  fn test_maps_section() {
    let yaml = "maps:\n  script_url: https://maps.example/js\n  libraries: [places, marker]\n  region: US\n";
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.maps.script_url, "https://maps.example/js");
    assert_eq!(config.maps.libraries, vec!["places", "marker"]);
    assert_eq!(config.maps.region, "US");
    assert_eq!(config.maps.language, "vi");
  }

  #[test]
  fn test_missing_explicit_path_is_error() {
    let err = Config::load(Some(Path::new("/nonexistent/taxua.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
