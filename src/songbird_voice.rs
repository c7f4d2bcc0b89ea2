use std::{io::{self, Read}, sync::Arc};

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{input::{AudioStream, Input, LiveInput}, Songbird};
use symphonia::core::{io::{MediaSource, ReadOnlySource}, probe::Hint};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dca::{self, Frame};
use crate::voice::{VoiceConnector, VoiceError, VoiceSession};

/// Joins calls through the shared songbird manager.
#[derive(Clone)]
pub struct SongbirdConnector {
    songbird: Arc<Songbird>,
    frame_buffer: usize,
}

impl SongbirdConnector {
    pub fn new(songbird: Arc<Songbird>, frame_buffer: usize) -> Self {
        SongbirdConnector {
            songbird,
            frame_buffer: frame_buffer.max(1),
        }
    }
}

#[async_trait]
impl VoiceConnector for SongbirdConnector {
    type Session = SongbirdSession;

    async fn join(&self, guild: GuildId, channel: ChannelId) -> Result<SongbirdSession, VoiceError> {
        let call = self
            .songbird
            .join(guild, channel)
            .await
            .map_err(|e| VoiceError::Join {
                guild,
                channel,
                reason: e.to_string(),
            })?;
        debug!("Joined {} in guild {}", channel, guild);

        Ok(SongbirdSession {
            songbird: self.songbird.clone(),
            call,
            guild,
            frame_buffer: self.frame_buffer,
            tx: None,
        })
    }
}

/// One call. Speaking starts a live DCA track fed by the outbound channel;
/// songbird's mixer pulls from it in real time.
pub struct SongbirdSession {
    songbird: Arc<Songbird>,
    call: Arc<tokio::sync::Mutex<songbird::Call>>,
    guild: GuildId,
    frame_buffer: usize,
    tx: Option<mpsc::Sender<Frame>>,
}

#[async_trait]
impl VoiceSession for SongbirdSession {
    async fn set_speaking(&mut self, speaking: bool) -> Result<(), VoiceError> {
        if !speaking {
            // Once every sender is gone the stream hits EOF and the track ends.
            self.tx = None;
            return Ok(());
        }
        if self.tx.is_some() {
            return Ok(());
        }

        let (tx, rx) = mpsc::channel(self.frame_buffer);
        let source: Box<dyn MediaSource> = Box::new(ReadOnlySource::new(FrameStream::new(rx)));
        let mut hint = Hint::new();
        hint.with_extension("dca");
        let input = Input::Live(LiveInput::Raw(AudioStream { input: source, hint: Some(hint) }), None);

        let mut call = self.call.lock().await;
        call.play_only_input(input);
        self.tx = Some(tx);
        Ok(())
    }

    fn outbound(&self) -> Result<mpsc::Sender<Frame>, VoiceError> {
        self.tx.clone().ok_or(VoiceError::NotSpeaking)
    }

    async fn disconnect(&mut self) -> Result<(), VoiceError> {
        self.tx = None;
        self.songbird
            .remove(self.guild)
            .await
            .map_err(|e| VoiceError::Disconnect {
                guild: self.guild,
                reason: e.to_string(),
            })
    }
}

/// Blocking `Read` over the outbound channel, laid out as a DCA1 stream.
///
/// Songbird reads inputs from its own threads, outside the async runtime,
/// so `blocking_recv` is allowed here.
pub struct FrameStream {
    rx: mpsc::Receiver<Frame>,
    pending: Vec<u8>,
    pos: usize,
}

impl FrameStream {
    pub fn new(rx: mpsc::Receiver<Frame>) -> Self {
        FrameStream {
            rx,
            pending: dca::dca1_header(),
            pos: 0,
        }
    }

    fn refill(&mut self) -> bool {
        while let Some(frame) = self.rx.blocking_recv() {
            // Opus rejects empty packets, which would end the track early.
            if frame.is_empty() {
                debug!("Skipping empty frame");
                continue;
            }
            // DCA1 lengths are signed 16 bit.
            if frame.len() > i16::MAX as usize {
                warn!("Dropping {} byte frame, too large for DCA1", frame.len());
                continue;
            }
            self.pending.clear();
            self.pos = 0;
            if dca::write_frame(&mut self.pending, &frame).is_ok() {
                return true;
            }
        }
        false
    }
}

impl Read for FrameStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.pos >= self.pending.len() && !self.refill() {
            return Ok(0);
        }

        let n = buf.len().min(self.pending.len() - self.pos);
        buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
