//! The seam between playback and whatever carries audio to Discord.

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::dca::Frame;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("couldn't join voice channel {channel} in guild {guild}: {reason}")]
    Join {
        guild: GuildId,
        channel: ChannelId,
        reason: String,
    },

    #[error("couldn't leave voice in guild {guild}: {reason}")]
    Disconnect { guild: GuildId, reason: String },

    #[error("speaking state update failed: {0}")]
    Speaking(String),

    #[error("no outbound frame channel, the session isn't speaking")]
    NotSpeaking,
}

/// Opens voice sessions.
#[async_trait]
pub trait VoiceConnector: Send + Sync {
    type Session: VoiceSession;

    async fn join(&self, guild: GuildId, channel: ChannelId) -> Result<Self::Session, VoiceError>;
}

/// A connected voice channel accepting pre-encoded Opus frames.
///
/// Frames go through a bounded channel; the transport drains it at its own
/// pace, so a full channel holds the sender back.
#[async_trait]
pub trait VoiceSession: Send {
    async fn set_speaking(&mut self, speaking: bool) -> Result<(), VoiceError>;

    /// Sender for outbound frames. Only available while speaking.
    fn outbound(&self) -> Result<mpsc::Sender<Frame>, VoiceError>;

    async fn disconnect(&mut self) -> Result<(), VoiceError>;
}
