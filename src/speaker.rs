use std::time::Duration;

use serenity::model::id::{ChannelId, GuildId};
use thiserror::Error;
use tracing::{debug, warn};

use crate::sound_store::SoundClip;
use crate::voice::{VoiceConnector, VoiceError, VoiceSession};

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error(transparent)]
    Voice(#[from] VoiceError),

    #[error("voice transport stopped accepting frames after {sent} of {total}")]
    SinkClosed { sent: usize, total: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackReport {
    pub frames_sent: usize,
}

/// Streams a clip over an already joined session, then disconnects it.
///
/// On a failure after the join the session is still disconnected, best
/// effort, and the first error is returned.
pub async fn stream_clip<S: VoiceSession + ?Sized>(
    session: &mut S,
    clip: SoundClip,
    post_roll: Duration,
) -> Result<PlaybackReport, PlaybackError> {
    let result = send_clip(session, clip, post_roll).await;

    match result {
        Ok(report) => {
            session.disconnect().await?;
            Ok(report)
        }
        Err(e) => {
            if let Err(disconnect_err) = session.disconnect().await {
                warn!("Disconnect after failed playback also failed: {}", disconnect_err);
            }
            Err(e)
        }
    }
}

async fn send_clip<S: VoiceSession + ?Sized>(
    session: &mut S,
    clip: SoundClip,
    post_roll: Duration,
) -> Result<PlaybackReport, PlaybackError> {
    session.set_speaking(true).await?;

    let total = clip.len();
    let mut sent = 0;
    {
        let tx = session.outbound()?;
        for frame in clip {
            if tx.send(frame).await.is_err() {
                return Err(PlaybackError::SinkClosed { sent, total });
            }
            sent += 1;
        }
    }

    session.set_speaking(false).await?;

    // Trailing frames are still in flight.
    tokio::time::sleep(post_roll).await;

    Ok(PlaybackReport { frames_sent: sent })
}

pub struct Speaker<C> {
    connector: C,
    post_roll: Duration,
}

impl<C: VoiceConnector> Speaker<C> {
    pub fn new(connector: C, post_roll: Duration) -> Self {
        Speaker {
            connector,
            post_roll,
        }
    }

    /// Joins `channel`, plays the clip start to finish and leaves.
    pub async fn play(
        &self,
        guild: GuildId,
        channel: ChannelId,
        clip: SoundClip,
    ) -> Result<PlaybackReport, PlaybackError> {
        debug!("Playing {} ({} frames) in {}/{}", clip.name(), clip.len(), guild, channel);
        let mut session = self.connector.join(guild, channel).await?;
        stream_clip(&mut session, clip, self.post_roll).await
    }
}
