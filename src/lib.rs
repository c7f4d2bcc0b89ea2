//! nutbot: plays pre-encoded sound clips in Discord voice channels when a
//! member types one of the configured triggers.

pub mod commands;
pub mod config;
pub mod dca;
pub mod discord;
pub mod dispatch;
pub mod shutdown;
pub mod songbird_voice;
pub mod sound_store;
pub mod speaker;
pub mod voice;
