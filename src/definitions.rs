//! Typed shapes of the world content records the resolver looks up.
//!
//! Records are immutable once loaded; a wholesale cache replace is the only
//! thing that ever changes what a lookup returns.

use serde::Deserialize;

pub const ACTIVITY_TABLE: &str = "DestinyActivityDefinition";
pub const ACTIVITY_MODE_TABLE: &str = "DestinyActivityModeDefinition";
pub const CLASS_TABLE: &str = "DestinyClassDefinition";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayProperties {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDefinition {
    #[serde(default)]
    pub display_properties: DisplayProperties,
    #[serde(default)]
    pub place_hash: u32,
    #[serde(default)]
    pub activity_type_hash: u32,
    #[serde(default)]
    pub pgcr_image: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityModeDefinition {
    #[serde(default)]
    pub display_properties: DisplayProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDefinition {
    #[serde(default)]
    pub display_properties: DisplayProperties,
}
