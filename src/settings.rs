use serde::{Deserialize, Serialize};

use crate::rules::AngleRestriction;

/// Tuning of the pull-tight optimizer and the shove engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    pub angle_restriction: AngleRestriction,
    /// Resolution of the binary searches moving lines. Values below 100
    /// are raised to 100.
    pub min_translate_dist: i64,
    /// Zero means no limit.
    pub time_limit_ms: u64,
    /// If not empty, only traces of these nets are optimized.
    pub only_nets: Vec<usize>,
    pub max_shove_recursion_depth: usize,
    pub max_via_recursion_depth: usize,
    pub max_spring_over_recursion_depth: usize,
    pub clearance_compensation: bool,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            angle_restriction: AngleRestriction::default(),
            min_translate_dist: 100,
            time_limit_ms: 0,
            only_nets: vec![],
            max_shove_recursion_depth: 20,
            max_via_recursion_depth: 5,
            max_spring_over_recursion_depth: 5,
            clearance_compensation: false,
        }
    }
}

impl OptimizerSettings {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings = OptimizerSettings::from_json_str(r#"{ "angle_restriction": "AnyAngle" }"#).unwrap();
        assert_eq!(settings.angle_restriction, AngleRestriction::AnyAngle);
        assert_eq!(settings.min_translate_dist, 100);
        assert_eq!(settings.max_via_recursion_depth, 5);
    }
}
