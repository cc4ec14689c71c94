use serenity::model::id::GuildId;
use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, info, warn};

use super::{
    engine::PlaybackEngine,
    queue::Queue,
    similarity::{best_match, SimilarityOptions},
    track::Track,
};
use crate::error::{QueueError, Result};

/// Destino de un salto: posición o título aproximado
#[derive(Debug, Clone, PartialEq)]
pub enum SkipTarget {
    Index(usize),
    Title(String),
}

impl From<usize> for SkipTarget {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for SkipTarget {
    fn from(title: &str) -> Self {
        Self::Title(title.to_string())
    }
}

impl From<String> for SkipTarget {
    fn from(title: String) -> Self {
        Self::Title(title)
    }
}

/// Latencia de la última orden al motor
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerPing {
    pub engine: Duration,
}

/// Reproductor de una guild: la cola más las órdenes al motor.
pub struct Player {
    guild_id: GuildId,
    pub queue: Queue,
    engine: Arc<dyn PlaybackEngine>,
    similarity: SimilarityOptions,
    playing: bool,
    pub ping: PlayerPing,
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("guild_id", &self.guild_id)
            .field("queue", &self.queue)
            .field("playing", &self.playing)
            .field("ping", &self.ping)
            .finish()
    }
}

impl Player {
    pub fn new(queue: Queue, engine: Arc<dyn PlaybackEngine>, similarity: SimilarityOptions) -> Self {
        Self {
            guild_id: queue.guild_id(),
            queue,
            engine,
            similarity,
            playing: false,
            ping: PlayerPing::default(),
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn playing(&self) -> bool {
        self.playing
    }

    /// Empieza a reproducir la siguiente pista si no hay ninguna actual.
    /// Devuelve `false` si no había nada que reproducir.
    pub async fn play(&mut self) -> Result<bool> {
        if self.queue.current().is_none() {
            let Some(head) = self.queue.tracks().first().cloned() else {
                debug!("Cola vacía para guild {}", self.guild_id);
                return Ok(false);
            };
            // la cabeza solo sale de la cola si se pudo resolver
            let next = self.ensure_resolved(head).await?;
            self.queue.take_next();
            self.queue.set_current(Some(next));
            self.queue.save().await?;
        }

        if let Some(current) = self.queue.current() {
            let started = Instant::now();
            if let Err(e) = self.engine.start_playback(self.guild_id, current).await {
                self.playing = false;
                return Err(QueueError::Engine(e));
            }
            self.ping.engine = started.elapsed();
            info!("▶️ Reproduciendo: {}", current.title());
        }

        self.playing = true;
        Ok(true)
    }

    /// Avance al terminar la pista: la actual pasa al frente del historial y
    /// la siguiente empieza. Sin más pistas el reproductor queda parado.
    pub async fn handle_track_end(&mut self) -> Result<bool> {
        if let Some(finished) = self.queue.take_current() {
            debug!("Pista terminada: {}", finished.title());
            self.queue.push_previous(finished);
        }

        if self.queue.tracks().is_empty() {
            self.playing = false;
            self.queue.save().await?;
            info!("📭 Cola vacía, no hay siguiente pista en {}", self.guild_id);
            return Ok(false);
        }

        self.play().await
    }

    /// Salta a la siguiente pista, a una posición o a un título.
    ///
    /// Sin `include_history` el destino se busca en las próximas pistas y las
    /// anteriores a él se descartan; con `include_history` se busca en todo el
    /// orden lógico y la cola se reparte alrededor del destino.
    /// Si el destino no existe devuelve un error de rango, o `Ok(false)`
    /// cuando `throw_on_failure` es `false`.
    pub async fn skip(
        &mut self,
        target: Option<SkipTarget>,
        throw_on_failure: bool,
        include_history: bool,
    ) -> Result<bool> {
        match target {
            Some(target) => {
                let Some(index) = self.resolve_target(&target, include_history) else {
                    return fail(throw_on_failure, format!("can't skip to {:?}", target));
                };

                if include_history {
                    self.queue.repartition(index);
                    self.queue.save().await?;
                } else if index > 0 {
                    self.queue.splice(0, index, None).await?;
                }
            }
            None => {
                if self.queue.tracks().is_empty() {
                    return fail(throw_on_failure, "can't skip more than the queue size");
                }
            }
        }

        if !self.playing && self.queue.current().is_none() {
            return self.play().await;
        }

        let started = Instant::now();
        self.engine
            .stop_current_track(self.guild_id)
            .await
            .map_err(QueueError::Engine)?;
        let advanced = self.handle_track_end().await?;
        self.ping.engine = started.elapsed();

        debug!("⏭️ Salto en {} ({:?})", self.guild_id, self.ping.engine);
        Ok(advanced)
    }

    /// Vuelve a la pista anterior: la actual y la anterior pasan al frente de
    /// la cola, la anterior sale del historial y se avanza a ella.
    pub async fn previous(&mut self, throw_on_failure: bool) -> Result<bool> {
        let Some(previous_track) = self.queue.previous().first().cloned() else {
            return fail(throw_on_failure, "there's no previous track");
        };
        let started = Instant::now();
        let checkpoint = self.queue.checkpoint();

        let moved = match self.step_back(previous_track, throw_on_failure).await {
            Ok(moved) => moved,
            Err(e) => {
                warn!("⚠️ No se pudo volver atrás en {}: {}", self.guild_id, e);
                self.queue.rollback(checkpoint);
                self.queue.save().await?;
                return Err(e);
            }
        };

        self.ping.engine = started.elapsed();
        info!("⏮️ Volviendo a la pista anterior en {}", self.guild_id);
        Ok(moved)
    }

    async fn step_back(&mut self, previous_track: Track, throw_on_failure: bool) -> Result<bool> {
        let current = self.queue.current().cloned();

        if let Some(current) = &current {
            self.queue.add(current.clone(), Some(0)).await?;
        }
        self.queue.add(previous_track, Some(0)).await?;
        self.queue.pop_previous_front();

        let moved = self.skip(None, throw_on_failure, false).await?;

        // el avance dejó la antigua actual en el historial, pero ya está en la cola
        if current.is_some() {
            self.queue.pop_previous_front();
            self.queue.save().await?;
        }
        Ok(moved)
    }

    fn resolve_target(&self, target: &SkipTarget, include_history: bool) -> Option<usize> {
        let space: Vec<Track> = if include_history {
            self.queue.timeline()
        } else {
            self.queue.tracks().to_vec()
        };

        match target {
            SkipTarget::Index(index) => (*index < space.len()).then_some(*index),
            SkipTarget::Title(query) => {
                let labels = space
                    .iter()
                    .map(|t| t.search_label(self.similarity.with_author));
                best_match(query, labels, self.similarity.threshold).map(|m| m.index)
            }
        }
    }

    async fn ensure_resolved(&self, track: Track) -> Result<Track> {
        if track.is_resolved() {
            return Ok(track);
        }

        let mut resolved = self
            .engine
            .resolve(self.guild_id, &track)
            .await
            .map_err(QueueError::Engine)?;
        // conserva cid y credencial de la pista original
        for (key, value) in track.user_data {
            resolved.user_data.entry(key).or_insert(value);
        }
        Ok(resolved)
    }
}

fn fail(throw_on_failure: bool, message: impl Into<String>) -> Result<bool> {
    if throw_on_failure {
        Err(QueueError::range(message))
    } else {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::engine::MockPlaybackEngine;
    use crate::audio::queue::QueueOptions;
    use crate::audio::track::tests::{resolved, unresolved};
    use crate::storage::{MemoryQueueSaver, QueueSaver};
    use pretty_assertions::assert_eq;

    fn titles(tracks: &[Track]) -> Vec<&str> {
        tracks.iter().map(Track::title).collect()
    }

    fn engine(starts: usize, stops: usize) -> MockPlaybackEngine {
        let mut engine = MockPlaybackEngine::new();
        engine
            .expect_start_playback()
            .times(starts)
            .returning(|_, _| Ok(()));
        engine
            .expect_stop_current_track()
            .times(stops)
            .returning(|_| Ok(()));
        engine
    }

    fn player(engine: MockPlaybackEngine) -> Player {
        let queue = Queue::new(
            GuildId::new(9),
            Arc::new(MemoryQueueSaver::new()),
            QueueOptions::default(),
        );
        Player::new(queue, Arc::new(engine), SimilarityOptions::default())
    }

    async fn with_tracks(engine: MockPlaybackEngine, names: &[&str]) -> Player {
        let mut player = player(engine);
        let tracks: Vec<Track> = names.iter().map(|n| resolved(n)).collect();
        player.queue.add(tracks, None).await.unwrap();
        player
    }

    #[tokio::test]
    async fn test_skip_index_when_idle_starts_target() {
        let mut player = with_tracks(engine(1, 0), &["A", "B", "C"]).await;

        assert!(player.skip(Some(2.into()), true, false).await.unwrap());
        assert_eq!(player.queue.current().map(Track::title), Some("C"));
        assert!(player.queue.tracks().is_empty());
        assert!(player.playing());
    }

    #[tokio::test]
    async fn test_skip_index_while_playing_stops_and_advances() {
        let mut player = with_tracks(engine(2, 1), &["A", "B", "C", "D"]).await;
        player.play().await.unwrap();
        // actual A, próximas B C D

        assert!(player.skip(Some(1.into()), true, false).await.unwrap());
        assert_eq!(player.queue.current().map(Track::title), Some("C"));
        assert_eq!(titles(player.queue.tracks()), vec!["D"]);
        assert_eq!(titles(player.queue.previous()), vec!["A"]);
    }

    #[tokio::test]
    async fn test_skip_out_of_range_in_both_modes() {
        let mut player = with_tracks(engine(0, 0), &["A", "B", "C"]).await;

        for include_history in [false, true] {
            let err = player.skip(Some(3.into()), true, include_history).await.unwrap_err();
            assert!(err.is_range());
            assert!(!player.skip(Some(10.into()), false, include_history).await.unwrap());
        }
        assert_eq!(titles(player.queue.tracks()), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_skip_without_tracks() {
        let mut player = player(engine(0, 0));
        assert!(player.skip(None, true, false).await.unwrap_err().is_range());
        assert!(!player.skip(None, false, false).await.unwrap());
    }

    #[tokio::test]
    async fn test_skip_by_title() {
        let mut player = with_tracks(engine(1, 0), &["Random Song", "Café del Mar", "Other"]).await;

        assert!(player.skip(Some("cafe del".into()), true, false).await.unwrap());
        assert_eq!(player.queue.current().map(Track::title), Some("Café del Mar"));
        assert_eq!(titles(player.queue.tracks()), vec!["Other"]);

        assert!(player.skip(Some("zzzzzzzzzzzzzzzz".into()), true, false).await.unwrap_err().is_range());
    }

    #[tokio::test]
    async fn test_skip_with_history_repartitions_timeline() {
        let mut player = with_tracks(engine(2, 1), &["A", "B", "C", "D"]).await;
        player.play().await.unwrap();
        // orden lógico: A* B C D

        assert!(player.skip(Some(2.into()), true, true).await.unwrap());
        assert_eq!(player.queue.current().map(Track::title), Some("C"));
        assert_eq!(titles(player.queue.previous()), vec!["B", "A"]);
        assert_eq!(titles(player.queue.tracks()), vec!["D"]);
    }

    #[tokio::test]
    async fn test_skip_back_into_history() {
        let mut player = with_tracks(engine(2, 0), &["A", "B", "C"]).await;
        player.play().await.unwrap();
        assert!(player.handle_track_end().await.unwrap());
        // actual B, historial [A]
        assert_eq!(titles(player.queue.previous()), vec!["A"]);

        player.engine = Arc::new(engine(1, 1));
        assert!(player.skip(Some(0.into()), true, true).await.unwrap());
        assert_eq!(player.queue.current().map(Track::title), Some("A"));
        assert!(player.queue.previous().is_empty());
        assert_eq!(titles(player.queue.tracks()), vec!["B", "C"]);
    }

    #[tokio::test]
    async fn test_previous_restores_last_track() {
        let mut player = player(engine(1, 1));
        player.queue.set_previous(vec![resolved("X")]).await.unwrap();
        player.queue.add(vec![resolved("Y"), resolved("Z")], None).await.unwrap();
        let y = player.queue.take_next();
        player.queue.set_current(y);
        player.playing = true;

        assert!(player.previous(true).await.unwrap());
        assert_eq!(player.queue.current().map(Track::title), Some("X"));
        assert_eq!(titles(player.queue.tracks()), vec!["Y", "Z"]);
        // X salió del historial y la entrada repetida de Y se quitó
        assert!(player.queue.previous().is_empty());
    }

    #[tokio::test]
    async fn test_previous_keeps_older_history() {
        let mut player = player(engine(1, 1));
        player
            .queue
            .set_previous(vec![resolved("X"), resolved("W")])
            .await
            .unwrap();
        player.queue.add(resolved("Y"), None).await.unwrap();
        let y = player.queue.take_next();
        player.queue.set_current(y);
        player.playing = true;

        player.previous(true).await.unwrap();
        assert_eq!(player.queue.current().map(Track::title), Some("X"));
        assert_eq!(titles(player.queue.previous()), vec!["W"]);
        assert_eq!(titles(player.queue.tracks()), vec!["Y"]);
    }

    #[tokio::test]
    async fn test_previous_when_idle_plays_it() {
        let mut player = player(engine(1, 0));
        player.queue.set_previous(vec![resolved("X")]).await.unwrap();

        assert!(player.previous(true).await.unwrap());
        assert_eq!(player.queue.current().map(Track::title), Some("X"));
        assert!(player.queue.previous().is_empty());
    }

    #[tokio::test]
    async fn test_previous_without_history() {
        let mut player = player(engine(0, 0));
        assert!(player.previous(true).await.unwrap_err().is_range());
        assert!(!player.previous(false).await.unwrap());
    }

    #[tokio::test]
    async fn test_play_resolves_lazy_tracks_keeping_cid() {
        let mut engine = engine(1, 0);
        engine.expect_resolve().times(1).returning(|_, track| {
            let mut done = track.clone();
            done.encoded = Some("https://example.com/lazy".to_string());
            done.user_data.clear();
            Ok(done)
        });
        let mut player = player(engine);
        player.queue.add(unresolved("Lazy"), None).await.unwrap();
        let cid = player.queue.tracks()[0].cid().map(str::to_string);

        assert!(player.play().await.unwrap());
        let current = player.queue.current().unwrap();
        assert!(current.is_resolved());
        assert_eq!(current.cid().map(str::to_string), cid);
    }

    #[tokio::test]
    async fn test_failed_resolve_keeps_track_queued() {
        let mut engine = MockPlaybackEngine::new();
        engine
            .expect_resolve()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("resolver down")));
        let saver = Arc::new(MemoryQueueSaver::new());
        let queue = Queue::new(GuildId::new(9), saver.clone(), QueueOptions::default());
        let mut player = Player::new(queue, Arc::new(engine), SimilarityOptions::default());
        player.queue.add(unresolved("Lazy"), None).await.unwrap();

        let err = player.play().await.unwrap_err();
        assert!(matches!(err, QueueError::Engine(_)));
        assert_eq!(titles(player.queue.tracks()), vec!["Lazy"]);
        assert!(player.queue.current().is_none());
        assert!(!player.playing());

        let stored = saver.get(GuildId::new(9)).await.unwrap().unwrap();
        assert_eq!(titles(&stored.tracks), vec!["Lazy"]);
    }

    #[tokio::test]
    async fn test_failed_start_during_advance_stops_player() {
        let mut engine = MockPlaybackEngine::new();
        let mut calls = 0;
        engine.expect_start_playback().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Ok(())
            } else {
                Err(anyhow::anyhow!("voice down"))
            }
        });
        let mut player = with_tracks(engine, &["A", "B"]).await;
        player.play().await.unwrap();
        assert!(player.playing());

        assert!(player.handle_track_end().await.is_err());
        assert!(!player.playing());
    }

    #[tokio::test]
    async fn test_failed_previous_rolls_back_queue() {
        let mut engine = MockPlaybackEngine::new();
        engine
            .expect_stop_current_track()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("voice down")));
        let mut player = player(engine);
        player.queue.set_previous(vec![resolved("X")]).await.unwrap();
        player.queue.add(vec![resolved("Y"), resolved("Z")], None).await.unwrap();
        let y = player.queue.take_next();
        player.queue.set_current(y);
        player.playing = true;
        let previous_cid = player.queue.previous()[0].cid().map(str::to_string);

        let err = player.previous(true).await.unwrap_err();
        assert!(matches!(err, QueueError::Engine(_)));
        assert_eq!(titles(player.queue.previous()), vec!["X"]);
        assert_eq!(player.queue.previous()[0].cid().map(str::to_string), previous_cid);
        assert_eq!(player.queue.current().map(Track::title), Some("Y"));
        assert_eq!(titles(player.queue.tracks()), vec!["Z"]);
    }

    #[tokio::test]
    async fn test_engine_errors_surface() {
        let mut engine = MockPlaybackEngine::new();
        engine
            .expect_start_playback()
            .returning(|_, _| Err(anyhow::anyhow!("voice down")));
        let mut player = player(engine);
        player.queue.add(resolved("A"), None).await.unwrap();

        let err = player.play().await.unwrap_err();
        assert!(matches!(err, QueueError::Engine(_)));
        assert!(!player.playing());
    }
}
