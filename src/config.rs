//! Prefix-tree configuration.
//!
//! A host system hands the factory a flat string map of options. Only three
//! keys matter here; everything else in the map belongs to the host and is
//! ignored.

use crate::error::PrefixTreeError;
use serde::de::Error;
use serde::{Deserialize, Serialize};

/// Option naming the grid implementation (`geohash`, `quad`, or a registered name).
pub const PREFIX_TREE: &str = "prefixTree";

/// Option fixing the tree depth. Wins over [`MAX_DIST_ERR`].
pub const MAX_LEVELS: &str = "maxLevels";

/// Option giving the desired worst-case cell size in degrees.
pub const MAX_DIST_ERR: &str = "maxDistErr";

/// Options for building a prefix tree through the factory.
///
/// # Examples
///
/// ```rust
/// use spatio_prefix_tree::PrefixTreeConfig;
///
/// let config = PrefixTreeConfig::from_json(r#"{"prefixTree": "quad", "maxLevels": 8}"#)?;
/// assert_eq!(config.prefix_tree.as_deref(), Some("quad"));
/// assert_eq!(config.max_levels, Some(8));
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PrefixTreeConfig {
    /// Grid implementation name; defaults by context when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_tree: Option<String>,

    /// Explicit tree depth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_levels: Option<usize>,

    /// Desired worst-case cell size, in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_dist_err: Option<f64>,
}

impl PrefixTreeConfig {
    pub fn with_prefix_tree(mut self, name: impl Into<String>) -> Self {
        self.prefix_tree = Some(name.into());
        self
    }

    pub fn with_max_levels(mut self, levels: usize) -> Self {
        self.max_levels = Some(levels);
        self
    }

    pub fn with_max_dist_err(mut self, degrees: f64) -> Self {
        self.max_dist_err = Some(degrees);
        self
    }

    /// Parse the recognised options out of a flat key/value map.
    ///
    /// ```rust
    /// use spatio_prefix_tree::PrefixTreeConfig;
    ///
    /// let config = PrefixTreeConfig::from_args([
    ///     ("prefixTree", "geohash"),
    ///     ("maxDistErr", "0.5"),
    ///     ("fieldName", "location"),
    /// ])?;
    /// assert_eq!(config.max_dist_err, Some(0.5));
    /// assert_eq!(config.max_levels, None);
    /// # Ok::<(), spatio_prefix_tree::PrefixTreeError>(())
    /// ```
    pub fn from_args<I, K, V>(args: I) -> Result<Self, PrefixTreeError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in args {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            match key {
                PREFIX_TREE => config.prefix_tree = Some(value.to_string()),
                MAX_LEVELS => {
                    let levels = value.parse::<usize>().map_err(|e| {
                        PrefixTreeError::Config(format!("{} {:?}: {}", MAX_LEVELS, value, e))
                    })?;
                    config.max_levels = Some(levels);
                }
                MAX_DIST_ERR => {
                    let dist = value.parse::<f64>().map_err(|e| {
                        PrefixTreeError::Config(format!("{} {:?}: {}", MAX_DIST_ERR, value, e))
                    })?;
                    config.max_dist_err = Some(dist);
                }
                other => log::trace!("Ignoring option {:?}", other),
            }
        }
        config.validate().map_err(PrefixTreeError::Config)?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.prefix_tree
            && name.trim().is_empty()
        {
            return Err("prefixTree must not be empty".to_string());
        }

        if self.max_levels == Some(0) {
            return Err("maxLevels must be greater than zero".to_string());
        }

        if let Some(dist) = self.max_dist_err {
            if !dist.is_finite() {
                return Err("maxDistErr must be finite (not NaN or infinity)".to_string());
            }
            if dist < 0.0 {
                return Err("maxDistErr must not be negative".to_string());
            }
        }

        Ok(())
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: PrefixTreeConfig = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(serde_json::Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load configuration from TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: PrefixTreeConfig = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_args_ignores_foreign_keys() {
        let config = PrefixTreeConfig::from_args([
            ("prefixTree", "quad"),
            ("maxLevels", " 7 "),
            ("distErrPct", "0.025"),
        ])
        .unwrap();
        assert_eq!(
            config,
            PrefixTreeConfig::default()
                .with_prefix_tree("quad")
                .with_max_levels(7)
        );
    }

    #[test]
    fn test_from_args_rejects_bad_values() {
        assert!(matches!(
            PrefixTreeConfig::from_args([("maxLevels", "ten")]),
            Err(PrefixTreeError::Config(_))
        ));
        assert!(PrefixTreeConfig::from_args([("maxLevels", "0")]).is_err());
        assert!(PrefixTreeConfig::from_args([("maxDistErr", "-1")]).is_err());
        assert!(PrefixTreeConfig::from_args([("maxDistErr", "NaN")]).is_err());
        assert!(PrefixTreeConfig::from_args([("prefixTree", "  ")]).is_err());
    }

    #[test]
    fn test_from_args_owned_map() {
        let args: std::collections::HashMap<String, String> = [
            ("maxDistErr".to_string(), "0.001".to_string()),
        ]
        .into_iter()
        .collect();
        let config = PrefixTreeConfig::from_args(&args).unwrap();
        assert_eq!(config.max_dist_err, Some(0.001));
    }

    #[test]
    fn test_json_round_trip() {
        let config = PrefixTreeConfig::default()
            .with_prefix_tree("geohash")
            .with_max_dist_err(0.25);
        let json = config.to_json().unwrap();
        assert!(json.contains("\"maxDistErr\""));
        assert!(!json.contains("maxLevels"));
        assert_eq!(PrefixTreeConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_json_validation() {
        assert!(PrefixTreeConfig::from_json(r#"{"maxLevels": 0}"#).is_err());
        assert!(PrefixTreeConfig::from_json(r#"{"levels": 4}"#).is_err());
        assert_eq!(
            PrefixTreeConfig::from_json("{}").unwrap(),
            PrefixTreeConfig::default()
        );
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_toml_round_trip() {
        let config = PrefixTreeConfig::from_toml("prefixTree = \"quad\"\nmaxLevels = 9\n").unwrap();
        assert_eq!(config.max_levels, Some(9));
        let text = config.to_toml().unwrap();
        assert_eq!(PrefixTreeConfig::from_toml(&text).unwrap(), config);
    }
}
