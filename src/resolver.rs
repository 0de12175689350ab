//! Turns a profile snapshot plus world content lookups into the status
//! shown on Discord.

use std::ffi::OsStr;
use std::path::Path;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::definitions::{
    ActivityDefinition, ActivityModeDefinition, ClassDefinition, ACTIVITY_MODE_TABLE,
    ACTIVITY_TABLE, CLASS_TABLE,
};
use crate::manifest::{CacheError, ManifestCache};
use crate::snapshot::ProfileSnapshot;

/// Place hash of orbit. Orbit has no reference data worth resolving.
const PLACE_ORBIT: u32 = 2_961_497_387;

/// Activity type hash of forges. Forge activity definitions are rather
/// sparse; the playlist activity definition carries the real display data,
/// so it substitutes for the canonical record. This is a deliberate special
/// case of the dataset, not a general rule.
const ACTIVITY_TYPE_FORGE: u32 = 838_603_889;

const DEFAULT_LARGE_IMAGE_KEY: &str = "default_large";
const ORBIT_LABEL: &str = "In Orbit";

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("no character is currently in an activity")]
    NoActiveCharacter,

    #[error("character {0} is missing from the profile components")]
    MissingCharacter(String),

    #[error(transparent)]
    Lookup(#[from] CacheError),
}

/// The externally visible status. Field-wise equality is what drives
/// change detection in the poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStatus {
    pub state: String,
    pub details: Option<String>,
    pub large_image_key: String,
    pub large_image_text: String,
    pub small_image_key: Option<String>,
    pub small_image_text: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// Resolve the player's current activity into a `ResolvedStatus`.
///
/// Among all characters with a nonzero current activity, the one whose
/// activity started most recently wins.
pub fn resolve(cache: &ManifestCache, snapshot: &ProfileSnapshot) -> Result<ResolvedStatus, ResolveError> {
    let (character_id, activity_state) = snapshot
        .character_activities
        .iter()
        .filter(|(_, state)| state.current_activity_hash != 0)
        .max_by_key(|(_, state)| state.date_activity_started)
        .ok_or(ResolveError::NoActiveCharacter)?;

    let activity: ActivityDefinition =
        cache.lookup(ACTIVITY_TABLE, activity_state.current_activity_hash)?;

    if activity.place_hash == PLACE_ORBIT {
        return Ok(ResolvedStatus {
            state: ORBIT_LABEL.to_owned(),
            details: None,
            large_image_key: DEFAULT_LARGE_IMAGE_KEY.to_owned(),
            large_image_text: ORBIT_LABEL.to_owned(),
            small_image_key: None,
            small_image_text: None,
            started_at: activity_state.date_activity_started,
        });
    }

    let mode: ActivityModeDefinition =
        cache.lookup(ACTIVITY_MODE_TABLE, activity_state.current_activity_mode_hash)?;
    let playlist: ActivityDefinition =
        cache.lookup(ACTIVITY_TABLE, activity_state.current_playlist_activity_hash)?;

    let character = snapshot
        .characters
        .get(character_id)
        .ok_or_else(|| ResolveError::MissingCharacter(character_id.clone()))?;
    let class: ClassDefinition = cache.lookup(CLASS_TABLE, character.class_hash)?;

    let activity = if activity.activity_type_hash == ACTIVITY_TYPE_FORGE {
        playlist.clone()
    } else {
        activity
    };

    let playlist_name = &playlist.display_properties.name;
    let mode_name = &mode.display_properties.name;
    let details = if !playlist_name.is_empty()
        && playlist_name != &activity.display_properties.name
        && playlist_name != mode_name
    {
        format!("{playlist_name} \u{2013} {mode_name}")
    } else {
        mode_name.clone()
    };

    let large_image_text = if activity.display_properties.description.is_empty() {
        activity.display_properties.name.clone()
    } else {
        activity.display_properties.description.clone()
    };

    Ok(ResolvedStatus {
        state: activity.display_properties.name.clone(),
        details: Some(details),
        large_image_key: large_image_key(&activity),
        large_image_text,
        small_image_key: mode.display_properties.icon.as_deref().map(small_image_key),
        small_image_text: Some(format!(
            "{} \u{2013} {}",
            class.display_properties.name, character.light
        )),
        started_at: activity_state.date_activity_started,
    })
}

fn file_stem(path: &str) -> &str {
    Path::new(path)
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or(path)
}

/// Content hash of the activity's post-game report image, or the default
/// key when the activity has none.
fn large_image_key(activity: &ActivityDefinition) -> String {
    match activity.pgcr_image.as_deref() {
        Some(image) if !image.is_empty() => hex::encode(Sha256::digest(file_stem(image))),
        _ => DEFAULT_LARGE_IMAGE_KEY.to_owned(),
    }
}

/// Mode icons follow a `<prefix>_<key>` naming convention; everything up to
/// and including the first underscore is dropped.
fn small_image_key(icon: &str) -> String {
    let stem = file_stem(icon);
    match stem.split_once('_') {
        Some((_, key)) => key.to_owned(),
        None => stem.to_owned(),
    }
}
