use std::{path::PathBuf, time::Duration};

use clap::Parser;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No token provided. Please run: nutbot -t <bot token>")]
    MissingToken,
}

/// Plays sound clips in voice when someone types a trigger.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Bot token
    #[arg(short = 't', long, env = "DISCORD_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// File listing the trigger commands
    #[arg(long, env = "NUTBOT_COMMANDS", default_value = "commands")]
    pub commands: PathBuf,

    /// Directory holding the encoded clips
    #[arg(long, env = "NUTBOT_SOUNDS_DIR", default_value = ".")]
    pub sounds_dir: PathBuf,

    /// Clip file extension
    #[arg(long, default_value = "dca")]
    pub extension: String,

    /// Pause after the last frame before leaving the channel
    #[arg(long, default_value_t = 250)]
    pub post_roll_ms: u64,

    /// Pause after each played trigger
    #[arg(long, default_value_t = 1000)]
    pub cooldown_ms: u64,

    /// Frames queued ahead of the voice connection
    #[arg(long, default_value_t = 8)]
    pub frame_buffer: usize,

    /// "Playing" status shown once connected
    #[arg(long, default_value = "Grandpa is back!")]
    pub status: String,

    /// Message posted when joining a guild
    #[arg(long, default_value = "nutbot is ready!")]
    pub greeting: String,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub commands_path: PathBuf,
    pub sounds_dir: PathBuf,
    pub extension: String,
    pub post_roll: Duration,
    pub cooldown: Duration,
    pub frame_buffer: usize,
    pub status: String,
    pub greeting: String,
}

impl TryFrom<Cli> for Config {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let token = cli
            .token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)?;

        Ok(Config {
            token,
            commands_path: cli.commands,
            sounds_dir: cli.sounds_dir,
            extension: cli.extension,
            post_roll: Duration::from_millis(cli.post_roll_ms),
            cooldown: Duration::from_millis(cli.cooldown_ms),
            frame_buffer: cli.frame_buffer.max(1),
            status: cli.status,
            greeting: cli.greeting,
        })
    }
}
