//! Shared fakes and builders for the test suites.

use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};

use crate::archive::{ArchiveError, ContentArchive};
use crate::bungie::{BungieApi, BungieError, ManifestInfo};
use crate::presence::PresenceProvider;
use crate::resolver::ResolvedStatus;
use crate::snapshot::{ActivityState, CharacterState, ComponentWrapper, ProfileResponse, ProfileSnapshot};

/// In-memory Bungie API with injectable responses and failure switches.
pub struct FakeApi {
    pub manifest: Mutex<ManifestInfo>,
    pub profiles: Mutex<HashMap<String, ProfileResponse>>,
    pub archive_bytes: Mutex<Vec<u8>>,
    pub archive_downloads: AtomicUsize,
    pub fail_profiles: AtomicBool,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            manifest: Mutex::new(ManifestInfo {
                version: "1.0.0".to_owned(),
                mobile_world_content_paths: HashMap::new(),
            }),
            profiles: Mutex::new(HashMap::new()),
            archive_bytes: Mutex::new(Vec::new()),
            archive_downloads: AtomicUsize::new(0),
            fail_profiles: AtomicBool::new(false),
        })
    }

    pub fn set_world_content_path(&self, locale: &str, path: &str) {
        self.manifest
            .lock()
            .mobile_world_content_paths
            .insert(locale.to_owned(), path.to_owned());
    }

    pub fn set_archive_bytes(&self, bytes: Vec<u8>) {
        *self.archive_bytes.lock() = bytes;
    }

    pub fn set_profile(&self, membership_id: &str, profile: ProfileResponse) {
        self.profiles.lock().insert(membership_id.to_owned(), profile);
    }
}

#[async_trait]
impl BungieApi for FakeApi {
    async fn get_manifest(&self) -> Result<ManifestInfo, BungieError> {
        Ok(self.manifest.lock().clone())
    }

    async fn get_profile(
        &self,
        _membership_type: i32,
        membership_id: &str,
    ) -> Result<ProfileResponse, BungieError> {
        if self.fail_profiles.load(Ordering::SeqCst) {
            return Err(BungieError::Platform {
                code: 5,
                status: "SystemDisabled".to_owned(),
            });
        }
        self.profiles
            .lock()
            .get(membership_id)
            .cloned()
            .ok_or(BungieError::Platform {
                code: 217,
                status: "UserCannotResolveCentralAccount".to_owned(),
            })
    }

    async fn get_content_archive(&self, _path: &str) -> Result<ContentArchive, ArchiveError> {
        self.archive_downloads.fetch_add(1, Ordering::SeqCst);
        ContentArchive::from_bytes(self.archive_bytes.lock().clone())
    }
}

/// An API that must never be reached, for asserting that a code path stays
/// off the network.
pub struct PanicApi;

impl PanicApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

#[async_trait]
impl BungieApi for PanicApi {
    async fn get_manifest(&self) -> Result<ManifestInfo, BungieError> {
        panic!("unexpected manifest call");
    }

    async fn get_profile(
        &self,
        _membership_type: i32,
        _membership_id: &str,
    ) -> Result<ProfileResponse, BungieError> {
        panic!("unexpected profile call");
    }

    async fn get_content_archive(&self, _path: &str) -> Result<ContentArchive, ArchiveError> {
        panic!("unexpected archive download");
    }
}

/// A presence provider that records everything it is asked to publish.
#[derive(Clone)]
pub struct RecordingProvider {
    updates: Arc<Mutex<Vec<ResolvedStatus>>>,
    clears: Arc<AtomicUsize>,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self {
            updates: Arc::new(Mutex::new(Vec::new())),
            clears: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn updates(&self) -> Vec<ResolvedStatus> {
        self.updates.lock().clone()
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PresenceProvider for RecordingProvider {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn update(&self, status: &ResolvedStatus) {
        self.updates.lock().push(status.clone());
    }

    async fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

/// Zip archive holding a single named entry.
pub fn zip_archive_bytes(entry_name: &str, contents: &[u8]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    writer
        .start_file(entry_name, zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(contents).unwrap();
    writer.finish().unwrap().into_inner()
}

/// A world content SQLite database with the given `(table, hash, json)`
/// rows, returned as raw file bytes.
pub fn world_db_bytes(rows: &[(&str, u32, serde_json::Value)]) -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.content");
    {
        let conn = Connection::open(&path).unwrap();
        for (table, hash, json) in rows {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (id INTEGER PRIMARY KEY, json BLOB)"
            ))
            .unwrap();
            #[allow(clippy::cast_possible_wrap)]
            let id = *hash as i32;
            conn.execute(
                &format!("INSERT OR REPLACE INTO {table} (id, json) VALUES (?1, ?2)"),
                params![id, serde_json::to_vec(json).unwrap()],
            )
            .unwrap();
        }
    }
    std::fs::read(&path).unwrap()
}

pub fn activity_json(
    name: &str,
    place_hash: u32,
    activity_type_hash: u32,
    pgcr_image: Option<&str>,
) -> serde_json::Value {
    serde_json::json!({
        "displayProperties": {"name": name, "description": "", "icon": null},
        "placeHash": place_hash,
        "activityTypeHash": activity_type_hash,
        "pgcrImage": pgcr_image,
    })
}

pub fn mode_json(name: &str, icon: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "displayProperties": {"name": name, "icon": icon},
    })
}

pub fn class_json(name: &str) -> serde_json::Value {
    serde_json::json!({
        "displayProperties": {"name": name},
    })
}

pub fn timestamp(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn activity_state(
    activity_hash: u32,
    mode_hash: u32,
    playlist_hash: u32,
    started: &str,
) -> ActivityState {
    ActivityState {
        current_activity_hash: activity_hash,
        current_activity_mode_hash: mode_hash,
        current_playlist_activity_hash: playlist_hash,
        date_activity_started: timestamp(started),
    }
}

pub fn profile_response(
    activities: &[(&str, ActivityState)],
    characters: &[(&str, i32)],
) -> ProfileResponse {
    ProfileResponse {
        character_activities: ComponentWrapper {
            data: Some(
                activities
                    .iter()
                    .map(|(id, state)| ((*id).to_owned(), state.clone()))
                    .collect(),
            ),
        },
        characters: ComponentWrapper {
            data: Some(
                characters
                    .iter()
                    .map(|(id, light)| {
                        (
                            (*id).to_owned(),
                            CharacterState {
                                class_hash: 500,
                                light: *light,
                            },
                        )
                    })
                    .collect(),
            ),
        },
    }
}

/// Snapshot built directly, bypassing the provider merge.
pub fn snapshot_with(
    characters: &[(&str, ActivityState, Option<(u32, i32)>)],
) -> ProfileSnapshot {
    let mut snapshot = ProfileSnapshot::default();
    for (id, state, character) in characters {
        snapshot
            .character_activities
            .insert((*id).to_owned(), state.clone());
        if let Some((class_hash, light)) = character {
            snapshot.characters.insert(
                (*id).to_owned(),
                CharacterState {
                    class_hash: *class_hash,
                    light: *light,
                },
            );
        }
    }
    snapshot
}
