mod discord;
mod traits;

pub use discord::{DiscordError, DiscordPresence};
pub use traits::PresenceProvider;
