use crate::semantic::{DEFAULT_MODEL, DEFAULT_RESULT_CAP, DEFAULT_THRESHOLD};
use crate::storage::{BackendLocal, StorageManager};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "config.yaml";

/// Queries shorter than this are checked against box codes first
const DEFAULT_CODE_QUERY_MAX_LEN: usize = 6;
/// Default vision request timeout in seconds
const DEFAULT_VISION_TIMEOUT_SECS: u64 = 30;

/// Configuration for semantic search
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Model name for embeddings (e.g., "all-MiniLM-L6-v2")
    #[serde(default = "default_model")]
    pub model: String,

    /// Minimum similarity score a result must exceed [0.0, 1.0]
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Maximum number of semantic results
    #[serde(default = "default_result_cap")]
    pub result_cap: usize,

    /// Queries shorter than this many characters try the code fast path
    #[serde(default = "default_code_query_max_len")]
    pub code_query_max_len: usize,

    /// Fall back to substring matching on item text when the semantic
    /// path produces nothing
    #[serde(default)]
    pub keyword_fallback: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            threshold: DEFAULT_THRESHOLD,
            result_cap: DEFAULT_RESULT_CAP,
            code_query_max_len: DEFAULT_CODE_QUERY_MAX_LEN,
            keyword_fallback: false,
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}

fn default_result_cap() -> usize {
    DEFAULT_RESULT_CAP
}

fn default_code_query_max_len() -> usize {
    DEFAULT_CODE_QUERY_MAX_LEN
}

/// Configuration for the vision tagging provider
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VisionConfig {
    /// Provider name: "gemini" or "openai"
    #[serde(default = "default_vision_provider")]
    pub provider: String,

    /// Provider API key; empty disables auto-tagging
    #[serde(default)]
    pub api_key: String,

    /// Request timeout in seconds
    #[serde(default = "default_vision_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            api_key: String::new(),
            request_timeout_secs: DEFAULT_VISION_TIMEOUT_SECS,
        }
    }
}

fn default_vision_provider() -> String {
    "gemini".to_string()
}

fn default_vision_timeout_secs() -> u64 {
    DEFAULT_VISION_TIMEOUT_SECS
}

fn default_locations() -> Vec<String> {
    ["Home", "Office", "Storage"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub vision: VisionConfig,

    /// User-managed location vocabulary
    #[serde(default = "default_locations")]
    pub locations: Vec<String>,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            vision: VisionConfig::default(),
            locations: default_locations(),
            base_path: String::new(),
        }
    }
}

impl Config {
    fn validate(&mut self) {
        let search = &self.search;
        if !(0.0..=1.0).contains(&search.threshold) {
            panic!(
                "search.threshold must be between 0.0 and 1.0, got {}",
                search.threshold
            );
        }

        if search.result_cap == 0 {
            panic!("search.result_cap must be greater than 0");
        }

        if search.code_query_max_len == 0 {
            panic!("search.code_query_max_len must be greater than 0");
        }

        if self.vision.request_timeout_secs == 0 {
            panic!("vision.request_timeout_secs must be greater than 0");
        }

        let mut seen = std::collections::HashSet::new();
        self.locations
            .retain(|loc| !loc.trim().is_empty() && seen.insert(loc.clone()));
    }

    pub fn load_with(base_path: &str) -> Self {
        let store = BackendLocal::new(base_path).expect("couldnt open config directory");

        // create new if does not exist
        if !store.exists(CONFIG_FILE) {
            store
                .write(
                    CONFIG_FILE,
                    serde_yml::to_string(&Self::default()).unwrap().as_bytes(),
                )
                .expect("couldnt write default config");
        }

        let config_str = String::from_utf8(store.read(CONFIG_FILE).expect("couldnt read config"))
            .expect("config file is not valid utf8");
        let mut config: Self = serde_yml::from_str(&config_str).expect("config is malformed");

        config.base_path = base_path.to_string();

        config.validate();

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config).unwrap() {
            config.save();
        }

        config
    }

    pub fn save(&self) {
        let store = BackendLocal::new(&self.base_path).expect("couldnt open config directory");

        let config_str = serde_yml::to_string(&self).unwrap();
        store
            .write(CONFIG_FILE, config_str.as_bytes())
            .expect("couldnt write config");
    }

    pub fn is_known_location(&self, location: &str) -> bool {
        self.locations.iter().any(|loc| loc == location)
    }

    /// Add a location label. Returns false if it was already present.
    pub fn add_location(&mut self, location: &str) -> bool {
        let location = location.trim();
        if location.is_empty() || self.is_known_location(location) {
            return false;
        }
        self.locations.push(location.to_string());
        true
    }

    /// Remove a location label. Returns false if it wasn't present.
    pub fn remove_location(&mut self, location: &str) -> bool {
        let before = self.locations.len();
        self.locations.retain(|loc| loc != location);
        self.locations.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.search.model, DEFAULT_MODEL);
        assert!((config.search.threshold - DEFAULT_THRESHOLD).abs() < f32::EPSILON);
        assert_eq!(config.search.result_cap, DEFAULT_RESULT_CAP);
        assert!(!config.search.keyword_fallback);
        assert_eq!(config.locations, vec!["Home", "Office", "Storage"]);
    }

    #[test]
    fn test_load_creates_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().to_str().unwrap();

        let config = Config::load_with(base);
        assert!(dir.path().join(CONFIG_FILE).exists());
        assert_eq!(config.search.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_location_vocabulary_roundtrip() {
        let mut config = Config::default();

        assert!(config.add_location("Garage"));
        assert!(config.is_known_location("Garage"));
        assert!(!config.add_location("Garage"));
        assert!(!config.add_location("   "));

        assert!(config.remove_location("Garage"));
        assert!(!config.is_known_location("Garage"));
        assert!(!config.remove_location("Garage"));
    }

    #[test]
    fn test_validate_drops_duplicate_locations() {
        let mut config = Config::default();
        config.locations = ["Home", "Office", "Home", "  ", "Office"]
            .into_iter()
            .map(String::from)
            .collect();

        config.validate();
        assert_eq!(config.locations, vec!["Home", "Office"]);
    }

    #[test]
    #[should_panic(expected = "search.threshold")]
    fn test_out_of_range_threshold_panics() {
        let mut config = Config::default();
        config.search.threshold = 1.5;
        config.validate();
    }
}
