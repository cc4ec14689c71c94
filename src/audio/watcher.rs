use anyhow::Result;
use async_trait::async_trait;
use serenity::model::id::GuildId;
use tracing::info;

use super::track::Track;
use crate::storage::StoredQueue;

/// Observador opcional de cambios en la cola.
///
/// Todas las notificaciones reciben la forma guardada de antes y de después.
/// Un error devuelto aquí llega tal cual a quien llamó a la operación.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueChangesWatcher: Send + Sync {
    /// `position` es el índice de inserción, o la nueva longitud si se añadió al final
    async fn tracks_add(
        &self,
        _guild_id: GuildId,
        _tracks: &[Track],
        _position: usize,
        _old: &StoredQueue,
        _new: &StoredQueue,
    ) -> Result<()> {
        Ok(())
    }

    async fn tracks_removed(
        &self,
        _guild_id: GuildId,
        _tracks: &[Track],
        _position: usize,
        _old: &StoredQueue,
        _new: &StoredQueue,
    ) -> Result<()> {
        Ok(())
    }

    async fn shuffled(&self, _guild_id: GuildId, _old: &StoredQueue, _new: &StoredQueue) -> Result<()> {
        Ok(())
    }
}

/// Observador que solo registra los cambios en el log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingWatcher;

#[async_trait]
impl QueueChangesWatcher for LoggingWatcher {
    async fn tracks_add(
        &self,
        guild_id: GuildId,
        tracks: &[Track],
        position: usize,
        _old: &StoredQueue,
        new: &StoredQueue,
    ) -> Result<()> {
        info!(
            "➕ [{}] {} pistas añadidas en {} (cola: {})",
            guild_id,
            tracks.len(),
            position,
            new.tracks.len()
        );
        Ok(())
    }

    async fn tracks_removed(
        &self,
        guild_id: GuildId,
        tracks: &[Track],
        position: usize,
        _old: &StoredQueue,
        new: &StoredQueue,
    ) -> Result<()> {
        info!(
            "❌ [{}] {} pistas eliminadas en {} (cola: {})",
            guild_id,
            tracks.len(),
            position,
            new.tracks.len()
        );
        Ok(())
    }

    async fn shuffled(&self, guild_id: GuildId, _old: &StoredQueue, new: &StoredQueue) -> Result<()> {
        info!("🔀 [{}] Cola mezclada ({} pistas)", guild_id, new.tracks.len());
        Ok(())
    }
}
