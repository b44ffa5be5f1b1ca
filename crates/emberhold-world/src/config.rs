//! World configuration.

use serde::Deserialize;

/// Settings applied to newly created characters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub starting_health: f64,
    pub starting_essence: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            starting_health: 100.0,
            starting_essence: 3.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let cfg: WorldConfig = serde_json::from_str(r#"{"starting_health": 40}"#).unwrap();
        assert_eq!(cfg.starting_health, 40.0);
        assert_eq!(cfg.starting_essence, 3.0);
    }
}
