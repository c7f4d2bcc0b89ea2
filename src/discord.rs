use std::sync::Arc;

use async_trait::async_trait;
use serenity::{cache::Cache,
               client::{Client, Context, EventHandler},
               gateway::ActivityData,
               model::{channel::Message, gateway::Ready, guild::Guild, id::{ChannelId, GuildId, UserId}},
               prelude::{GatewayIntents, TypeMapKey}};
use songbird::{SerenityInit, Songbird};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dispatch::{DispatchOutcome, Dispatcher, InboundMessage, VoiceLocator};
use crate::songbird_voice::SongbirdConnector;

#[derive(Clone)]
pub struct SharedState {
    pub dispatcher: Arc<Dispatcher<SongbirdConnector>>,
    pub status: String,
    pub greeting: String,
}

impl TypeMapKey for SharedState {
    type Value = SharedState;
}

/// Voice presence straight from serenity's cache.
pub struct CacheVoiceLocator<'a> {
    cache: &'a Cache,
}

impl<'a> CacheVoiceLocator<'a> {
    pub fn new(cache: &'a Cache) -> Self {
        Self { cache }
    }
}

impl VoiceLocator for CacheVoiceLocator<'_> {
    fn voice_channel(&self, guild: GuildId, user: UserId) -> Option<ChannelId> {
        let guild = self.cache.guild(guild)?;
        guild.voice_states.get(&user).and_then(|state| state.channel_id)
    }
}

struct Handler;

impl Handler {
    async fn state(ctx: &Context) -> Option<SharedState> {
        ctx.data.read().await.get::<SharedState>().cloned()
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        let bot_id = ctx.cache.current_user().id;
        if msg.author.id == bot_id {
            return;
        }
        let Some(state) = Handler::state(&ctx).await else {
            warn!("Shared state missing, dropping message");
            return;
        };

        // Always play from the current file.
        if let Err(e) = state.dispatcher.refresh_commands().await {
            warn!("Error opening commands file: {}", e);
            return;
        }

        let inbound = InboundMessage {
            guild_id: msg.guild_id,
            author_id: msg.author.id,
            bot_id,
            content: &msg.content,
        };
        let locator = CacheVoiceLocator::new(&ctx.cache);
        match state.dispatcher.dispatch(&inbound, &locator).await {
            DispatchOutcome::NotInVoice { sound } => {
                debug!("{} asked for {} but isn't in voice", msg.author.name, sound);
            }
            outcome => debug!("Message {} -> {:?}", msg.id, outcome),
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);

        if let Some(state) = Handler::state(&ctx).await {
            ctx.set_activity(Some(ActivityData::playing(state.status)));
        }
    }

    async fn guild_create(&self, ctx: Context, guild: Guild, _is_new: Option<bool>) {
        let Some(state) = Handler::state(&ctx).await else {
            return;
        };

        // The guild's default channel shares its id.
        let default_channel = ChannelId::new(guild.id.get());
        if guild.channels.contains_key(&default_channel) {
            if let Err(e) = default_channel.say(&ctx.http, &state.greeting).await {
                debug!("Couldn't greet guild {}: {}", guild.id, e);
            }
        }
    }
}

pub async fn init_serenity(config: &Config, songbird: Arc<Songbird>) -> serenity::Result<Client> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::MESSAGE_CONTENT;

    Client::builder(&config.token, intents)
        .event_handler(Handler)
        .register_songbird_with(songbird)
        .await
}
