use dashmap::DashMap;
use serenity::model::id::GuildId;
use serenity::prelude::TypeMapKey;
use std::sync::Arc;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use super::{
    credentials::CredentialPool,
    engine::{EngineEvent, PlaybackEngine},
    player::Player,
    queue::{Queue, QueueOptions},
    similarity::SimilarityOptions,
    track::Track,
    watcher::QueueChangesWatcher,
};
use crate::{config::Config, error::Result, storage::QueueSaver};

/// Gestor de reproductores, uno por guild
pub struct PlayerManager {
    players: DashMap<GuildId, Arc<Mutex<Player>>>,
    engine: Arc<dyn PlaybackEngine>,
    saver: Arc<dyn QueueSaver>,
    watcher: Option<Arc<dyn QueueChangesWatcher>>,
    credentials: Option<Arc<CredentialPool>>,
    queue_options: QueueOptions,
    similarity: SimilarityOptions,
}

impl PlayerManager {
    pub fn new(engine: Arc<dyn PlaybackEngine>, saver: Arc<dyn QueueSaver>) -> Self {
        Self {
            players: DashMap::new(),
            engine,
            saver,
            watcher: None,
            credentials: None,
            queue_options: QueueOptions::default(),
            similarity: SimilarityOptions::default(),
        }
    }

    /// Gestor con las opciones y credenciales de la configuración
    pub fn from_config(
        config: &Config,
        engine: Arc<dyn PlaybackEngine>,
        saver: Arc<dyn QueueSaver>,
    ) -> Self {
        let mut manager = Self::new(engine, saver)
            .with_queue_options(config.queue_options())
            .with_similarity(config.similarity_options());
        if let Some(pool) = config.credential_pool() {
            manager = manager.with_credentials(Arc::new(pool));
        }
        manager
    }

    pub fn with_watcher(mut self, watcher: Arc<dyn QueueChangesWatcher>) -> Self {
        self.watcher = Some(watcher);
        self
    }

    pub fn with_credentials(mut self, credentials: Arc<CredentialPool>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_queue_options(mut self, options: QueueOptions) -> Self {
        self.queue_options = options;
        self
    }

    pub fn with_similarity(mut self, similarity: SimilarityOptions) -> Self {
        self.similarity = similarity;
        self
    }

    /// Devuelve el reproductor de la guild o crea uno con la cola guardada
    pub async fn create_player(&self, guild_id: GuildId) -> Result<Arc<Mutex<Player>>> {
        if let Some(player) = self.get_player(guild_id) {
            return Ok(player);
        }

        let mut queue = Queue::new(guild_id, self.saver.clone(), self.queue_options);
        if let Some(watcher) = &self.watcher {
            queue = queue.with_watcher(watcher.clone());
        }
        if let Some(credentials) = &self.credentials {
            queue = queue.with_credentials(credentials.clone());
        }
        queue.sync(true).await?;

        let player = Arc::new(Mutex::new(Player::new(
            queue,
            self.engine.clone(),
            self.similarity,
        )));

        // otra tarea pudo crear el mismo reproductor mientras se cargaba la cola
        let player = self.players.entry(guild_id).or_insert(player).clone();
        info!("🎛️ Reproductor listo para guild {}", guild_id);
        Ok(player)
    }

    pub fn get_player(&self, guild_id: GuildId) -> Option<Arc<Mutex<Player>>> {
        self.players.get(&guild_id).map(|p| p.clone())
    }

    /// Quita el reproductor y borra su cola guardada
    pub async fn destroy_player(&self, guild_id: GuildId) -> Result<bool> {
        let Some((_, player)) = self.players.remove(&guild_id) else {
            return Ok(false);
        };

        if player.lock().await.playing() {
            if let Err(e) = self.engine.stop_current_track(guild_id).await {
                warn!("No se pudo detener la pista de {}: {:?}", guild_id, e);
            }
        }

        self.saver
            .delete(guild_id)
            .await
            .map_err(crate::error::QueueError::Storage)?;
        info!("🗑️ Reproductor eliminado para guild {}", guild_id);
        Ok(true)
    }

    pub fn players(&self) -> usize {
        self.players.len()
    }

    /// Atiende los eventos del motor hasta que se cierre el canal
    pub fn spawn_event_loop(
        self: Arc<Self>,
        mut events: mpsc::UnboundedReceiver<EngineEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                self.handle_event(event).await;
            }
            debug!("Canal de eventos del motor cerrado");
        })
    }

    async fn handle_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::TrackEnd { guild_id, cid } => {
                let Some(player) = self.get_player(guild_id) else {
                    debug!("Fin de pista para guild sin reproductor: {}", guild_id);
                    return;
                };
                let mut player = player.lock().await;
                // un salto ya avanzó la cola antes de que llegara el evento
                if cid.is_some() && player.queue.current().and_then(Track::cid) != cid.as_deref() {
                    debug!("Fin de pista obsoleto en {}, ignorado", guild_id);
                    return;
                }
                if let Err(e) = player.handle_track_end().await {
                    error!("❌ Error al avanzar la cola de {}: {}", guild_id, e);
                }
            }
        }
    }
}

impl TypeMapKey for PlayerManager {
    type Value = Arc<PlayerManager>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::engine::MockPlaybackEngine;
    use crate::audio::track::tests::resolved;
    use crate::storage::{MemoryQueueSaver, StoredQueue};
    use pretty_assertions::assert_eq;

    fn guild() -> GuildId {
        GuildId::new(42)
    }

    #[tokio::test]
    async fn test_create_player_reuses_and_hydrates() {
        let saver = Arc::new(MemoryQueueSaver::new());
        saver
            .set(
                guild(),
                &StoredQueue {
                    tracks: vec![resolved("Saved")],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let manager = PlayerManager::new(Arc::new(MockPlaybackEngine::new()), saver);
        let first = manager.create_player(guild()).await.unwrap();
        let second = manager.create_player(guild()).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.players(), 1);
        let player = first.lock().await;
        assert_eq!(player.queue.tracks()[0].title(), "Saved");
        assert!(player.queue.tracks()[0].cid().is_some());
    }

    #[tokio::test]
    async fn test_destroy_player_deletes_stored_queue() {
        let saver = Arc::new(MemoryQueueSaver::new());
        let manager = PlayerManager::new(Arc::new(MockPlaybackEngine::new()), saver.clone());

        let player = manager.create_player(guild()).await.unwrap();
        player.lock().await.queue.add(resolved("A"), None).await.unwrap();
        assert_eq!(saver.len(), 1);

        assert!(manager.destroy_player(guild()).await.unwrap());
        assert!(manager.get_player(guild()).is_none());
        assert!(saver.is_empty());
        assert!(!manager.destroy_player(guild()).await.unwrap());
    }

    #[tokio::test]
    async fn test_event_loop_advances_on_track_end() {
        let mut engine = MockPlaybackEngine::new();
        engine
            .expect_start_playback()
            .times(2)
            .returning(|_, _| Ok(()));

        let manager = Arc::new(PlayerManager::new(
            Arc::new(engine),
            Arc::new(MemoryQueueSaver::new()),
        ));
        let player = manager.create_player(guild()).await.unwrap();
        {
            let mut player = player.lock().await;
            player
                .queue
                .add(vec![resolved("A"), resolved("B")], None)
                .await
                .unwrap();
            player.play().await.unwrap();
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = manager.clone().spawn_event_loop(rx);
        tx.send(EngineEvent::TrackEnd {
            guild_id: guild(),
            cid: None,
        })
        .unwrap();
        // un evento de una guild desconocida se ignora
        tx.send(EngineEvent::TrackEnd {
            guild_id: GuildId::new(7),
            cid: None,
        })
        .unwrap();
        drop(tx);
        handle.await.unwrap();

        let player = player.lock().await;
        assert_eq!(player.queue.current().map(|t| t.title()), Some("B"));
        assert_eq!(player.queue.previous()[0].title(), "A");
    }

    #[tokio::test]
    async fn test_stale_track_end_after_skip_is_ignored() {
        let mut engine = MockPlaybackEngine::new();
        engine
            .expect_start_playback()
            .times(2)
            .returning(|_, _| Ok(()));
        engine
            .expect_stop_current_track()
            .times(1)
            .returning(|_| Ok(()));

        let manager = Arc::new(PlayerManager::new(
            Arc::new(engine),
            Arc::new(MemoryQueueSaver::new()),
        ));
        let player = manager.create_player(guild()).await.unwrap();
        let ended_cid = {
            let mut player = player.lock().await;
            player
                .queue
                .add(vec![resolved("A"), resolved("B"), resolved("C")], None)
                .await
                .unwrap();
            player.play().await.unwrap();
            let cid = player.queue.current().and_then(Track::cid).map(str::to_string);
            // el usuario salta mientras el final natural de A sigue en el canal
            player.skip(None, true, false).await.unwrap();
            cid
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = manager.clone().spawn_event_loop(rx);
        tx.send(EngineEvent::TrackEnd {
            guild_id: guild(),
            cid: ended_cid,
        })
        .unwrap();
        drop(tx);
        handle.await.unwrap();

        let player = player.lock().await;
        assert_eq!(player.queue.current().map(|t| t.title()), Some("B"));
        assert_eq!(player.queue.tracks().len(), 1);
    }
}
