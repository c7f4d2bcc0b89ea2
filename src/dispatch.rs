use std::{path::PathBuf, time::Duration};

use serenity::model::id::{ChannelId, GuildId, UserId};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::commands::{self, CommandError, CommandTable};
use crate::sound_store::SoundStore;
use crate::speaker::{PlaybackReport, Speaker};
use crate::voice::VoiceConnector;

/// Where members currently sit in voice.
pub trait VoiceLocator: Send + Sync {
    fn voice_channel(&self, guild: GuildId, user: UserId) -> Option<ChannelId>;
}

/// What the dispatcher needs to know about an incoming message.
#[derive(Debug, Clone, Copy)]
pub struct InboundMessage<'a> {
    pub guild_id: Option<GuildId>,
    pub author_id: UserId,
    pub bot_id: UserId,
    pub content: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Our own message.
    Ignored,
    NoTrigger,
    /// A trigger matched but the author isn't in voice in this guild.
    NotInVoice { sound: String },
    LoadFailed { sound: String },
    PlaybackFailed { sound: String },
    Played { sound: String, report: PlaybackReport },
}

pub struct Dispatcher<C> {
    commands_path: PathBuf,
    commands: RwLock<CommandTable>,
    sounds: SoundStore,
    speaker: Speaker<C>,
    cooldown: Duration,
}

impl<C: VoiceConnector> Dispatcher<C> {
    pub fn new(commands_path: impl Into<PathBuf>, sounds: SoundStore, speaker: Speaker<C>, cooldown: Duration) -> Self {
        Dispatcher {
            commands_path: commands_path.into(),
            commands: RwLock::new(CommandTable::default()),
            sounds,
            speaker,
            cooldown,
        }
    }

    /// Rereads the commands file. The table is left untouched on error.
    pub async fn refresh_commands(&self) -> Result<usize, CommandError> {
        let table = CommandTable::load(&self.commands_path).await?;
        let count = table.len();
        *self.commands.write().await = table;
        Ok(count)
    }

    pub async fn commands(&self) -> CommandTable {
        self.commands.read().await.clone()
    }

    /// Handles one message start to finish, cooldown included.
    pub async fn dispatch<L: VoiceLocator + ?Sized>(&self, msg: &InboundMessage<'_>, locator: &L) -> DispatchOutcome {
        if msg.author_id == msg.bot_id {
            return DispatchOutcome::Ignored;
        }

        if self.commands.read().await.matching(msg.content).is_none() {
            return DispatchOutcome::NoTrigger;
        }
        let sound = commands::sound_name(msg.content).to_string();

        let target = msg
            .guild_id
            .and_then(|guild| locator.voice_channel(guild, msg.author_id).map(|channel| (guild, channel)));
        let Some((guild, channel)) = target else {
            return DispatchOutcome::NotInVoice { sound };
        };

        let clip = match self.sounds.load(&sound).await {
            Ok(clip) => clip,
            Err(e) => {
                warn!("Couldn't load sound {}: {}", sound, e);
                return DispatchOutcome::LoadFailed { sound };
            }
        };

        let outcome = match self.speaker.play(guild, channel, clip).await {
            Ok(report) => {
                info!("Played {} ({} frames) in {}", sound, report.frames_sent, channel);
                DispatchOutcome::Played { sound, report }
            }
            Err(e) => {
                warn!("Error playing sound {}: {}", sound, e);
                DispatchOutcome::PlaybackFailed { sound }
            }
        };

        // Keeps one user from spamming triggers through this handler.
        tokio::time::sleep(self.cooldown).await;
        outcome
    }
}
