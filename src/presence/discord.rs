//! Discord rich presence over the local IPC socket.

use std::time::{Duration, UNIX_EPOCH};

use async_trait::async_trait;
use discord_sdk as ds;

use super::traits::PresenceProvider;
use crate::resolver::ResolvedStatus;

#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("discord sdk error: {0}")]
    Sdk(#[from] ds::Error),

    #[error("discord handshake failed: {0}")]
    Handshake(String),
}

pub struct DiscordPresence {
    discord: ds::Discord,
}

impl DiscordPresence {
    /// Connect to the local Discord client and wait for the handshake to
    /// complete.
    pub async fn connect(app_id: i64) -> Result<Self, DiscordError> {
        let (wheel, handler) = ds::wheel::Wheel::new(Box::new(|err| {
            tracing::warn!("discord event error: {}", err);
        }));
        let mut user = wheel.user();

        let discord = ds::Discord::new(
            ds::DiscordApp::PlainId(app_id),
            ds::Subscriptions::ACTIVITY,
            Box::new(handler),
        )?;

        tracing::debug!("waiting for discord handshake");
        user.0.changed().await.map_err(|_| {
            DiscordError::Handshake("connection closed during handshake".to_owned())
        })?;

        match &*user.0.borrow() {
            ds::wheel::UserState::Connected(user) => {
                tracing::info!("connected to discord as {}", user.username);
            }
            ds::wheel::UserState::Disconnected(err) => {
                return Err(DiscordError::Handshake(err.to_string()));
            }
        }

        Ok(Self { discord })
    }
}

#[async_trait]
impl PresenceProvider for DiscordPresence {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn update(&self, status: &ResolvedStatus) {
        let mut assets = ds::activity::Assets::default().large(
            status.large_image_key.clone(),
            Some(status.large_image_text.clone()),
        );
        if let (Some(key), Some(text)) = (&status.small_image_key, &status.small_image_text) {
            assets = assets.small(key.clone(), Some(text.clone()));
        }

        #[allow(clippy::cast_sign_loss)]
        let started = UNIX_EPOCH + Duration::from_secs(status.started_at.timestamp().max(0) as u64);

        let mut builder = ds::activity::ActivityBuilder::default()
            .state(status.state.clone())
            .assets(assets)
            .start_timestamp(started);
        if let Some(details) = &status.details {
            builder = builder.details(details.clone());
        }

        if let Err(e) = self.discord.update_activity(builder).await {
            tracing::warn!("failed to update discord activity: {}", e);
        }
    }

    async fn clear(&self) {
        if let Err(e) = self.discord.clear_activity().await {
            tracing::warn!("failed to clear discord activity: {}", e);
        }
    }
}
