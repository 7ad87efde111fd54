use crate::error::ScrollFxResult;

/// Engine-wide markup conventions.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Attribute naming the behavior (`"1"` or `"stacking-cards"`).
    pub trigger_attribute: String,
    /// Namespace of per-option attributes, e.g. `data-anim-scale-amount`.
    pub option_prefix: String,
    /// Prefix of generated element ids.
    pub id_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trigger_attribute: "data-scroll-anim".to_string(),
            option_prefix: "data-anim".to_string(),
            id_prefix: "scrollfx".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(s: &str) -> ScrollFxResult<Self> {
        Ok(serde_json::from_str(s)?)
    }
}
