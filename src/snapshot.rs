//! Live per-character state, fetched and merged across linked accounts.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::bungie::{BungieApi, BungieError};
use crate::config::LinkedAccount;

#[derive(Debug, thiserror::Error)]
#[error("profile fetch failed for account {membership_id}: {source}")]
pub struct SnapshotError {
    pub membership_id: String,
    #[source]
    pub source: BungieError,
}

/// A character's current activity. A zero `current_activity_hash` means the
/// character is not in any activity.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityState {
    #[serde(default)]
    pub current_activity_hash: u32,
    #[serde(default)]
    pub current_activity_mode_hash: u32,
    #[serde(default)]
    pub current_playlist_activity_hash: u32,
    pub date_activity_started: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterState {
    #[serde(default)]
    pub class_hash: u32,
    #[serde(default)]
    pub light: i32,
}

/// Profile components arrive wrapped in a `data` object, which privacy
/// settings can strip entirely.
#[derive(Debug, Clone, Deserialize)]
pub struct ComponentWrapper<T> {
    #[serde(default)]
    pub data: Option<HashMap<String, T>>,
}

impl<T> Default for ComponentWrapper<T> {
    fn default() -> Self {
        Self { data: None }
    }
}

/// Raw per-account response for the Characters + CharacterActivities
/// components.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(default)]
    pub character_activities: ComponentWrapper<ActivityState>,
    #[serde(default)]
    pub characters: ComponentWrapper<CharacterState>,
}

/// All characters' state across every linked account, built fresh each poll
/// cycle and discarded after resolution.
#[derive(Debug, Default)]
pub struct ProfileSnapshot {
    pub character_activities: HashMap<String, ActivityState>,
    pub characters: HashMap<String, CharacterState>,
}

pub struct SnapshotProvider {
    api: Arc<dyn BungieApi>,
    accounts: Vec<LinkedAccount>,
}

impl SnapshotProvider {
    pub fn new(api: Arc<dyn BungieApi>, accounts: Vec<LinkedAccount>) -> Self {
        Self { api, accounts }
    }

    /// Fetch every linked account's profile and merge them into one
    /// snapshot. Character ids are globally unique so collisions are not
    /// expected, but the merge is defined as first-write-wins to stay
    /// deterministic. Any single account failing discards the whole cycle's
    /// snapshot.
    pub async fn get_snapshot(&self) -> Result<ProfileSnapshot, SnapshotError> {
        let mut snapshot = ProfileSnapshot::default();

        for account in &self.accounts {
            let profile = self
                .api
                .get_profile(account.membership_type, &account.membership_id)
                .await
                .map_err(|source| SnapshotError {
                    membership_id: account.membership_id.clone(),
                    source,
                })?;

            if profile.character_activities.data.is_none() {
                tracing::warn!(
                    "no character activities for account {}; check the profile's privacy settings",
                    account.membership_id
                );
            }

            for (id, state) in profile.character_activities.data.unwrap_or_default() {
                snapshot.character_activities.entry(id).or_insert(state);
            }
            for (id, state) in profile.characters.data.unwrap_or_default() {
                snapshot.characters.entry(id).or_insert(state);
            }
        }

        Ok(snapshot)
    }
}
