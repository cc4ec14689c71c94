use anyhow::{Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serenity::model::id::GuildId;
use songbird::{
    input::{Compose, HttpRequest, Input, YoutubeDl},
    tracks::{PlayMode, TrackHandle},
    Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{
    engine::{EngineEvent, PlaybackEngine},
    track::Track,
};

/// Motor de reproducción sobre el driver de voz de songbird.
pub struct SongbirdEngine {
    songbird: Arc<Songbird>,
    http: reqwest::Client,
    current_tracks: DashMap<GuildId, TrackHandle>,
    events: mpsc::UnboundedSender<EngineEvent>,
}

impl SongbirdEngine {
    /// Crea el motor y el canal por el que llegan los finales de pista
    pub fn new(songbird: Arc<Songbird>) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let engine = Self {
            songbird,
            http: reqwest::Client::new(),
            current_tracks: DashMap::new(),
            events,
        };
        (engine, rx)
    }

    fn input_for(&self, track: &Track) -> Result<Input> {
        let url = track
            .info
            .uri
            .clone()
            .or_else(|| track.encoded.clone().filter(|e| e.starts_with("http")))
            .with_context(|| format!("La pista no tiene URL reproducible: {}", track.title()))?;

        let input = if track.source_name().eq_ignore_ascii_case("http") {
            HttpRequest::new(self.http.clone(), url).into()
        } else {
            YoutubeDl::new(self.http.clone(), url).into()
        };
        Ok(input)
    }
}

#[async_trait]
impl PlaybackEngine for SongbirdEngine {
    async fn start_playback(&self, guild_id: GuildId, track: &Track) -> Result<()> {
        let call = self
            .songbird
            .get(guild_id)
            .with_context(|| format!("Sin conexión de voz en guild {}", guild_id))?;

        let input = self.input_for(track)?;
        let handle = {
            let mut call = call.lock().await;
            call.play_input(input)
        };

        handle
            .add_event(
                Event::Track(TrackEvent::End),
                TrackEndNotifier {
                    guild_id,
                    cid: track.cid().map(str::to_string),
                    events: self.events.clone(),
                },
            )
            .map_err(|e| anyhow::anyhow!("Error al agregar event handler: {}", e))?;

        if let Some(old) = self.current_tracks.insert(guild_id, handle) {
            let _ = old.stop();
        }

        info!("🎵 Reproduciendo en {}: {}", guild_id, track.title());
        Ok(())
    }

    async fn stop_current_track(&self, guild_id: GuildId) -> Result<()> {
        if let Some((_, handle)) = self.current_tracks.remove(&guild_id) {
            handle.stop().context("Error al detener la pista")?;
            debug!("⏹️ Pista detenida en {}", guild_id);
        }
        Ok(())
    }

    async fn resolve(&self, _guild_id: GuildId, track: &Track) -> Result<Track> {
        let mut source = match &track.info.uri {
            Some(uri) => YoutubeDl::new(self.http.clone(), uri.clone()),
            None => YoutubeDl::new_search(self.http.clone(), track.search_label(true)),
        };

        let meta = source
            .aux_metadata()
            .await
            .with_context(|| format!("No se pudo resolver: {}", track.title()))?;
        let url = meta
            .source_url
            .with_context(|| format!("Sin URL para: {}", track.title()))?;

        let mut resolved = track.clone();
        resolved.encoded = Some(url.clone());
        resolved.info.uri = Some(url);
        if resolved.info.title.is_empty() {
            resolved.info.title = meta.title.unwrap_or_default();
        }
        if resolved.info.author.is_none() {
            resolved.info.author = meta.artist;
        }
        if let Some(duration) = meta.duration {
            resolved.info.duration_ms = Some(duration.as_millis() as u64);
        }
        resolved.info.artwork_url = resolved.info.artwork_url.or(meta.thumbnail);

        debug!("🔎 Pista resuelta: {}", resolved.title());
        Ok(resolved)
    }
}

/// Avisa al gestor cuando una pista termina sola
struct TrackEndNotifier {
    guild_id: GuildId,
    cid: Option<String>,
    events: mpsc::UnboundedSender<EngineEvent>,
}

#[async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(states) = ctx {
            // Stop viene de stop_current_track: el reproductor ya avanzó
            let finished = states
                .iter()
                .any(|(state, _)| matches!(state.playing, PlayMode::End | PlayMode::Errored(_)));

            if finished {
                if let Some((state, _)) = states.first() {
                    if let PlayMode::Errored(e) = &state.playing {
                        warn!("Pista con error en {}: {:?}", self.guild_id, e);
                    }
                }
                if self
                    .events
                    .send(EngineEvent::TrackEnd {
                        guild_id: self.guild_id,
                        cid: self.cid.clone(),
                    })
                    .is_err()
                {
                    error!("El gestor ya no escucha eventos de {}", self.guild_id);
                }
            }
        }
        None
    }
}
