//! Sesión guionizada contra un motor que solo registra las órdenes.
//!
//! `cargo run --example queue_session`

use anyhow::Result;
use arii_lava::{
    audio::watcher::LoggingWatcher, Config, JsonQueueSaver, PlaybackEngine, PlayerManager,
    SkipTarget, Track, TrackInfo,
};
use async_trait::async_trait;
use serenity::model::id::GuildId;
use std::sync::Arc;
use tracing::info;

/// Motor que no reproduce nada, solo deja constancia
struct DryRunEngine;

#[async_trait]
impl PlaybackEngine for DryRunEngine {
    async fn start_playback(&self, guild_id: GuildId, track: &Track) -> Result<()> {
        info!("▶️ [{}] start {}", guild_id, track.title());
        Ok(())
    }

    async fn stop_current_track(&self, guild_id: GuildId) -> Result<()> {
        info!("⏹️ [{}] stop", guild_id);
        Ok(())
    }

    async fn resolve(&self, _guild_id: GuildId, track: &Track) -> Result<Track> {
        let mut resolved = track.clone();
        resolved.encoded = Some(format!("dry:{}", track.title()));
        Ok(resolved)
    }
}

fn track(title: &str, author: &str) -> Track {
    Track::resolved(
        format!("dry:{}", title),
        TrackInfo {
            identifier: title.to_lowercase().replace(' ', "-"),
            title: title.to_string(),
            source_name: "youtube".to_string(),
            ..Default::default()
        },
    )
    .with_author(author)
}

fn show(label: &str, tracks: &[Track]) {
    let titles: Vec<&str> = tracks.iter().map(Track::title).collect();
    info!("{}: {:?}", label, titles);
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("arii_lava=debug".parse()?)
                .add_directive("queue_session=info".parse()?),
        )
        .init();

    let config = Config::load()?;
    info!("{}", config.summary());

    let saver = Arc::new(JsonQueueSaver::new(config.data_dir.clone()).await?);
    let manager = PlayerManager::from_config(&config, Arc::new(DryRunEngine), saver.clone())
        .with_watcher(Arc::new(LoggingWatcher));

    let guild_id = GuildId::new(1);
    let player = manager.create_player(guild_id).await?;
    let mut player = player.lock().await;

    player
        .queue
        .set_tracks(vec![
            track("Around the World", "Daft Punk"),
            track("Café del Mar", "Energy 52"),
            track("Windowlicker", "Aphex Twin"),
            track("Teardrop", "Massive Attack"),
        ])
        .await?;
    player
        .queue
        .add(
            Track::unresolved(TrackInfo {
                title: "Porcelain".to_string(),
                source_name: "deezer".to_string(),
                ..Default::default()
            }),
            None,
        )
        .await?;

    player.play().await?;
    player.queue.toggle_shuffle(false).await?;
    show("Mezclada", player.queue.tracks());

    player.skip(Some(SkipTarget::from("cafe del mar")), false, false).await?;
    player.previous(false).await?;
    player.skip(None, false, false).await?;

    player.queue.toggle_shuffle(false).await?;
    show("Historial", player.queue.previous());
    show("Próximas", player.queue.tracks());
    info!(
        "Actual: {:?} (latencia {:?})",
        player.queue.current().map(Track::title),
        player.ping.engine
    );

    info!("{}", saver.get_storage_stats().await?);
    Ok(())
}
