use std::{collections::HashMap, path::Path, sync::{Arc, Mutex}, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use nutbot::{dca::{self, Frame},
             dispatch::{DispatchOutcome, Dispatcher, InboundMessage, VoiceLocator},
             sound_store::SoundStore,
             speaker::Speaker,
             voice::{VoiceConnector, VoiceError, VoiceSession}};
use serenity::model::id::{ChannelId, GuildId, UserId};
use tempfile::TempDir;
use tokio::sync::mpsc;

#[derive(Default)]
struct Record {
    joins: Vec<(GuildId, ChannelId)>,
    frames: Vec<Frame>,
    disconnects: usize,
}

#[derive(Clone, Default)]
struct RecordingConnector {
    record: Arc<Mutex<Record>>,
    refuse_join: bool,
}

struct RecordingSession {
    record: Arc<Mutex<Record>>,
    tx: Option<mpsc::Sender<Frame>>,
    drain: Option<tokio::task::JoinHandle<()>>,
}

#[async_trait]
impl VoiceConnector for RecordingConnector {
    type Session = RecordingSession;

    async fn join(&self, guild: GuildId, channel: ChannelId) -> Result<RecordingSession, VoiceError> {
        if self.refuse_join {
            return Err(VoiceError::Join {
                guild,
                channel,
                reason: "no permission".into(),
            });
        }
        self.record.lock().unwrap().joins.push((guild, channel));
        Ok(RecordingSession {
            record: self.record.clone(),
            tx: None,
            drain: None,
        })
    }
}

#[async_trait]
impl VoiceSession for RecordingSession {
    async fn set_speaking(&mut self, speaking: bool) -> Result<(), VoiceError> {
        if speaking {
            let (tx, mut rx) = mpsc::channel::<Frame>(2);
            let record = self.record.clone();
            self.tx = Some(tx);
            self.drain = Some(tokio::spawn(async move {
                while let Some(frame) = rx.recv().await {
                    record.lock().unwrap().frames.push(frame);
                }
            }));
        } else {
            self.tx = None;
            if let Some(drain) = self.drain.take() {
                drain.await.unwrap();
            }
        }
        Ok(())
    }

    fn outbound(&self) -> Result<mpsc::Sender<Frame>, VoiceError> {
        self.tx.clone().ok_or(VoiceError::NotSpeaking)
    }

    async fn disconnect(&mut self) -> Result<(), VoiceError> {
        self.record.lock().unwrap().disconnects += 1;
        Ok(())
    }
}

#[derive(Default)]
struct FakeVoiceStates(HashMap<(GuildId, UserId), ChannelId>);

impl VoiceLocator for FakeVoiceStates {
    fn voice_channel(&self, guild: GuildId, user: UserId) -> Option<ChannelId> {
        self.0.get(&(guild, user)).copied()
    }
}

fn guild() -> GuildId {
    GuildId::new(100)
}

fn voice() -> ChannelId {
    ChannelId::new(200)
}

fn bot() -> UserId {
    UserId::new(1)
}

fn member() -> UserId {
    UserId::new(2)
}

fn nutbar_frames() -> Vec<Frame> {
    (0u8..20).map(|i| Bytes::from(vec![i; 1 + i as usize])).collect()
}

fn write_clip(dir: &Path, file: &str, frames: &[Frame]) {
    let mut data = Vec::new();
    for frame in frames {
        dca::write_frame(&mut data, frame).unwrap();
    }
    std::fs::write(dir.join(file), data).unwrap();
}

fn setup(connector: RecordingConnector) -> (TempDir, Dispatcher<RecordingConnector>) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("commands"), "!nut\n!airhorn\n").unwrap();
    write_clip(dir.path(), "nutbar.dca", &nutbar_frames());

    let dispatcher = Dispatcher::new(
        dir.path().join("commands"),
        SoundStore::new(dir.path(), "dca"),
        Speaker::new(connector, Duration::ZERO),
        Duration::ZERO,
    );
    (dir, dispatcher)
}

fn message(content: &str, author: UserId) -> InboundMessage<'_> {
    InboundMessage {
        guild_id: Some(guild()),
        author_id: author,
        bot_id: bot(),
        content,
    }
}

fn member_in_voice() -> FakeVoiceStates {
    let mut states = FakeVoiceStates::default();
    states.0.insert((guild(), member()), voice());
    states
}

#[tokio::test]
async fn trigger_plays_clip_in_authors_channel() {
    let connector = RecordingConnector::default();
    let (_dir, dispatcher) = setup(connector.clone());
    assert_eq!(dispatcher.refresh_commands().await.unwrap(), 2);

    let outcome = dispatcher.dispatch(&message("!nutbar", member()), &member_in_voice()).await;

    match outcome {
        DispatchOutcome::Played { sound, report } => {
            assert_eq!(sound, "nutbar");
            assert_eq!(report.frames_sent, 20);
        }
        other => panic!("expected playback, got {:?}", other),
    }

    let record = connector.record.lock().unwrap();
    assert_eq!(record.joins, vec![(guild(), voice())]);
    assert_eq!(record.frames, nutbar_frames());
    assert_eq!(record.disconnects, 1);
}

#[tokio::test]
async fn member_outside_voice_gets_nothing() {
    let connector = RecordingConnector::default();
    let (_dir, dispatcher) = setup(connector.clone());
    dispatcher.refresh_commands().await.unwrap();

    let outcome = dispatcher
        .dispatch(&message("!nutbar", member()), &FakeVoiceStates::default())
        .await;

    assert_eq!(outcome, DispatchOutcome::NotInVoice { sound: "nutbar".into() });
    assert!(connector.record.lock().unwrap().joins.is_empty());
}

#[tokio::test]
async fn plain_chat_has_no_side_effects() {
    let connector = RecordingConnector::default();
    let (_dir, dispatcher) = setup(connector.clone());
    dispatcher.refresh_commands().await.unwrap();

    let outcome = dispatcher.dispatch(&message("hello", member()), &member_in_voice()).await;

    assert_eq!(outcome, DispatchOutcome::NoTrigger);
    let record = connector.record.lock().unwrap();
    assert!(record.joins.is_empty());
    assert!(record.frames.is_empty());
}

#[tokio::test]
async fn own_messages_are_ignored() {
    let connector = RecordingConnector::default();
    let (_dir, dispatcher) = setup(connector.clone());
    dispatcher.refresh_commands().await.unwrap();

    let mut states = member_in_voice();
    states.0.insert((guild(), bot()), voice());
    let outcome = dispatcher.dispatch(&message("!nutbar", bot()), &states).await;

    assert_eq!(outcome, DispatchOutcome::Ignored);
    assert!(connector.record.lock().unwrap().joins.is_empty());
}

#[tokio::test]
async fn direct_messages_never_join() {
    let connector = RecordingConnector::default();
    let (_dir, dispatcher) = setup(connector.clone());
    dispatcher.refresh_commands().await.unwrap();

    let mut msg = message("!nutbar", member());
    msg.guild_id = None;
    let outcome = dispatcher.dispatch(&msg, &member_in_voice()).await;

    assert!(matches!(outcome, DispatchOutcome::NotInVoice { .. }));
    assert!(connector.record.lock().unwrap().joins.is_empty());
}

#[tokio::test]
async fn missing_clip_abandons_before_joining() {
    let connector = RecordingConnector::default();
    let (_dir, dispatcher) = setup(connector.clone());
    dispatcher.refresh_commands().await.unwrap();

    let outcome = dispatcher.dispatch(&message("!airhorn", member()), &member_in_voice()).await;

    assert_eq!(outcome, DispatchOutcome::LoadFailed { sound: "airhorn".into() });
    assert!(connector.record.lock().unwrap().joins.is_empty());
}

#[tokio::test]
async fn failed_join_is_swallowed() {
    let connector = RecordingConnector {
        refuse_join: true,
        ..RecordingConnector::default()
    };
    let (_dir, dispatcher) = setup(connector.clone());
    dispatcher.refresh_commands().await.unwrap();

    let outcome = dispatcher.dispatch(&message("!nutbar", member()), &member_in_voice()).await;

    assert_eq!(outcome, DispatchOutcome::PlaybackFailed { sound: "nutbar".into() });
    assert!(connector.record.lock().unwrap().frames.is_empty());
}

#[tokio::test]
async fn refresh_picks_up_new_triggers() {
    let connector = RecordingConnector::default();
    let (dir, dispatcher) = setup(connector.clone());
    dispatcher.refresh_commands().await.unwrap();
    assert_eq!(
        dispatcher.dispatch(&message("?nutbar", member()), &member_in_voice()).await,
        DispatchOutcome::NoTrigger
    );

    std::fs::write(dir.path().join("commands"), "?nut\n").unwrap();
    assert_eq!(dispatcher.refresh_commands().await.unwrap(), 1);

    let outcome = dispatcher.dispatch(&message("?nutbar", member()), &member_in_voice()).await;
    assert!(matches!(outcome, DispatchOutcome::Played { .. }));
}

#[tokio::test]
async fn failed_refresh_keeps_previous_table() {
    let connector = RecordingConnector::default();
    let (dir, dispatcher) = setup(connector);
    dispatcher.refresh_commands().await.unwrap();

    std::fs::remove_file(dir.path().join("commands")).unwrap();
    assert!(dispatcher.refresh_commands().await.is_err());
    assert_eq!(dispatcher.commands().await.len(), 2);
}

#[tokio::test]
async fn each_trigger_streams_its_own_clip() {
    let connector = RecordingConnector::default();
    let (dir, dispatcher) = setup(connector.clone());
    write_clip(dir.path(), "airhorn.dca", &[Bytes::from_static(b"horn")]);
    dispatcher.refresh_commands().await.unwrap();

    dispatcher.dispatch(&message("!nutbar", member()), &member_in_voice()).await;
    dispatcher.dispatch(&message("!airhorn", member()), &member_in_voice()).await;

    let record = connector.record.lock().unwrap();
    assert_eq!(record.frames.len(), 21);
    assert_eq!(record.frames.last(), Some(&Bytes::from_static(b"horn")));
    assert_eq!(record.disconnects, 2);
}
