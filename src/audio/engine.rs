use anyhow::Result;
use async_trait::async_trait;
use serenity::model::id::GuildId;

use super::track::Track;

/// Eventos que el motor reporta al gestor de reproductores
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// La pista terminó sola (no por `stop_current_track`). `cid` identifica
    /// la pista que terminó; si ya no es la actual el evento llegó tarde.
    TrackEnd {
        guild_id: GuildId,
        cid: Option<String>,
    },
}

/// Motor de audio externo.
///
/// Detener la pista no avanza la cola: el reproductor aplica el avance
/// después. Los finales naturales llegan como [`EngineEvent::TrackEnd`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    /// Empieza a reproducir `track` en la conexión de voz de la guild
    async fn start_playback(&self, guild_id: GuildId, track: &Track) -> Result<()>;

    /// Detiene la pista actual
    async fn stop_current_track(&self, guild_id: GuildId) -> Result<()>;

    /// Resuelve una pista sin resolver antes de reproducirla
    async fn resolve(&self, _guild_id: GuildId, track: &Track) -> Result<Track> {
        anyhow::bail!("No se puede resolver la pista: {}", track.title())
    }
}
