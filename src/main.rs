use std::sync::Arc;

use clap::Parser;
use dotenv::dotenv;
use songbird::Songbird;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use nutbot::{config::{Cli, Config},
             discord::{self, SharedState},
             dispatch::Dispatcher,
             shutdown::shutdown_signal,
             songbird_voice::SongbirdConnector,
             sound_store::SoundStore,
             speaker::Speaker};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config = match Config::try_from(cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let songbird = Songbird::serenity();
    let dispatcher = Dispatcher::new(
        config.commands_path.clone(),
        SoundStore::new(config.sounds_dir.clone(), config.extension.clone()),
        Speaker::new(SongbirdConnector::new(songbird.clone(), config.frame_buffer), config.post_roll),
        config.cooldown,
    );

    let mut client = discord::init_serenity(&config, songbird).await?;
    {
        // Initialize shared state.
        let mut data = client.data.write().await;
        data.insert::<SharedState>(SharedState {
            dispatcher: Arc::new(dispatcher),
            status: config.status.clone(),
            greeting: config.greeting.clone(),
        });
    }

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutting down");
        shard_manager.shutdown_all().await;
    });

    info!("nutbot is now running. Press CTRL-C to exit.");
    client.start().await?;

    Ok(())
}
