use serenity::model::id::GuildId;
use std::{collections::HashSet, fmt, sync::Arc};
use tracing::{debug, info};

use super::{
    credentials::CredentialPool,
    identity::{admit_tracks, Admission},
    shuffle::{
        dedup_by_cid, fisher_yates, logical_order, prune_backup, push_to_backup, restore_order,
        unshift_to_backup,
    },
    track::{Track, TrackOrTracks},
    watcher::QueueChangesWatcher,
};
use crate::{
    error::{QueueError, Result},
    storage::{QueueSaver, StoredQueue},
    utils::tokens::{new_cid, DEFAULT_TOKEN_BYTES},
};

/// Máximo por defecto de pistas en el historial
pub const DEFAULT_MAX_PREVIOUS_TRACKS: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueOptions {
    pub max_previous_tracks: usize,
    /// Bytes aleatorios de cada id de correlación
    pub cid_bytes: usize,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            max_previous_tracks: DEFAULT_MAX_PREVIOUS_TRACKS,
            cid_bytes: DEFAULT_TOKEN_BYTES,
        }
    }
}

/// Estado de la cola después de una operación
#[derive(Debug, Clone, PartialEq)]
pub struct QueueResult {
    pub previous: Vec<Track>,
    pub current: Option<Track>,
    pub tracks: Vec<Track>,
    pub tracks_added: Vec<Track>,
    pub tracks_removed: Vec<Track>,
}

/// Estado completo de la cola para deshacer una operación compuesta
#[derive(Debug, Clone)]
pub(crate) struct QueueCheckpoint {
    stored: StoredQueue,
    backup: Vec<Track>,
}

/// Cola de una guild: historial, pista actual y próximas pistas.
///
/// El orden lógico es `reverse(previous) + [current] + tracks`. Cada pista
/// lleva un cid único; mientras el modo aleatorio está activo, `backup`
/// guarda el orden original de exactamente esas mismas pistas.
pub struct Queue {
    guild_id: GuildId,
    previous: Vec<Track>,
    current: Option<Track>,
    tracks: Vec<Track>,
    shuffled: bool,
    backup: Vec<Track>,
    saver: Arc<dyn QueueSaver>,
    watcher: Option<Arc<dyn QueueChangesWatcher>>,
    credentials: Option<Arc<CredentialPool>>,
    options: QueueOptions,
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("guild_id", &self.guild_id)
            .field("previous", &self.previous.len())
            .field("current", &self.current.as_ref().map(Track::title))
            .field("tracks", &self.tracks.len())
            .field("shuffled", &self.shuffled)
            .field("backup", &self.backup.len())
            .finish()
    }
}

impl Queue {
    pub fn new(guild_id: GuildId, saver: Arc<dyn QueueSaver>, options: QueueOptions) -> Self {
        Self {
            guild_id,
            previous: Vec::new(),
            current: None,
            tracks: Vec::new(),
            shuffled: false,
            backup: Vec::new(),
            saver,
            watcher: None,
            credentials: None,
            options,
        }
    }

    pub fn with_watcher(mut self, watcher: Arc<dyn QueueChangesWatcher>) -> Self {
        self.watcher = Some(watcher);
        self
    }

    pub fn with_credentials(mut self, credentials: Arc<CredentialPool>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn previous(&self) -> &[Track] {
        &self.previous
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Copia del orden original mientras el modo aleatorio está activo
    pub fn backup(&self) -> &[Track] {
        &self.backup
    }

    pub fn shuffled(&self) -> bool {
        self.shuffled
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty() && self.current.is_none()
    }

    /// Orden lógico completo: historial, actual y próximas
    pub fn timeline(&self) -> Vec<Track> {
        logical_order(&self.previous, self.current.as_ref(), &self.tracks)
    }

    pub fn to_stored(&self) -> StoredQueue {
        StoredQueue {
            previous: self.previous.clone(),
            current: self.current.clone(),
            tracks: self.tracks.clone(),
        }
    }

    /// Guarda la forma actual de la cola
    pub async fn save(&self) -> Result<()> {
        self.saver
            .set(self.guild_id, &self.to_stored())
            .await
            .map_err(QueueError::Storage)
    }

    /// Carga la cola guardada. Devuelve `false` si no había nada guardado.
    ///
    /// La pista actual solo se reemplaza si no hay ninguna o `override_current`.
    pub async fn sync(&mut self, override_current: bool) -> Result<bool> {
        let Some(stored) = self
            .saver
            .get(self.guild_id)
            .await
            .map_err(QueueError::Storage)?
        else {
            return Ok(false);
        };

        self.previous = stored.previous.into_iter().filter(Track::is_resolved).collect();
        self.tracks = stored.tracks.into_iter().filter(Track::is_queueable).collect();
        if override_current || self.current.is_none() {
            self.current = stored.current.filter(Track::is_resolved);
        }
        self.shuffled = false;
        self.backup.clear();
        self.ensure_cids();

        info!(
            "📂 Cola restaurada para guild {}: {} previas, {} próximas",
            self.guild_id,
            self.previous.len(),
            self.tracks.len()
        );
        Ok(true)
    }

    /// Reemplaza las próximas pistas. Una lista vacía limpia la cola.
    pub async fn set_tracks(&mut self, items: impl Into<TrackOrTracks>) -> Result<()> {
        let admitted = self.admit(items.into(), Admission::Queue);

        self.tracks = admitted;
        if self.shuffled {
            push_to_backup(&mut self.backup, &self.tracks);
            self.prune_backup();
        }

        self.save().await
    }

    /// Reemplaza el historial. Solo acepta pistas resueltas.
    pub async fn set_previous(&mut self, items: impl Into<TrackOrTracks>) -> Result<()> {
        let admitted = self.admit(items.into(), Admission::History);

        self.previous = admitted;
        if self.shuffled {
            unshift_to_backup(&mut self.backup, &self.previous);
            self.prune_backup();
        }

        self.save().await
    }

    /// Agrega pistas a la cola, en `index` si cae dentro de la cola o al final si no
    pub async fn add(
        &mut self,
        items: impl Into<TrackOrTracks>,
        index: Option<usize>,
    ) -> Result<QueueResult> {
        let added = self.admit(items.into(), Admission::Queue);

        match index.filter(|i| *i < self.tracks.len()) {
            Some(index) => self.splice_admitted(index, 0, added).await,
            None => self.append_admitted(added).await,
        }
    }

    /// Quita `delete_count` pistas desde `start` e inserta las nuevas en su lugar
    pub async fn splice(
        &mut self,
        start: usize,
        delete_count: usize,
        items: Option<TrackOrTracks>,
    ) -> Result<QueueResult> {
        let added = match items {
            Some(items) => self.admit(items, Admission::Queue),
            None => Vec::new(),
        };

        if self.tracks.is_empty() && !added.is_empty() {
            return self.append_admitted(added).await;
        }

        self.splice_admitted(start, delete_count, added).await
    }

    /// Quita una pista por posición
    pub async fn remove(&mut self, index: usize) -> Result<Option<Track>> {
        if index >= self.tracks.len() {
            return Ok(None);
        }
        let result = self.splice(index, 1, None).await?;
        Ok(result.tracks_removed.into_iter().next())
    }

    /// Mezcla solo las próximas pistas, sin copia de seguridad.
    /// Para un modo aleatorio reversible usar [`Queue::toggle_shuffle`].
    pub async fn shuffle(&mut self) -> Result<usize> {
        if self.tracks.len() > 1 {
            let old = self.snapshot_if_watched();
            fisher_yates(&mut self.tracks, &mut rand::thread_rng());
            self.save().await?;
            self.notify_shuffled(old).await?;
        }
        Ok(self.tracks.len())
    }

    /// Activa o desactiva el modo aleatorio de toda la cola.
    ///
    /// Con `reshuffle` solo vuelve a mezclar, sin tocar la copia ni el modo.
    pub async fn toggle_shuffle(&mut self, reshuffle: bool) -> Result<QueueResult> {
        let old = self.snapshot_if_watched();

        if self.shuffled && !reshuffle {
            self.shuffled = false;
            self.prune_backup_to_present();

            let (previous, tracks) =
                restore_order(&self.backup, self.previous.len(), self.current.as_ref());
            self.previous = previous;
            self.tracks = tracks;
            self.backup.clear();

            info!("➡️ Modo aleatorio desactivado para guild {}", self.guild_id);
        } else {
            if !reshuffle {
                self.shuffled = true;
                self.backup = dedup_by_cid(self.timeline());
                info!("🔀 Modo aleatorio activado para guild {}", self.guild_id);
            }

            let mut rng = rand::thread_rng();
            fisher_yates(&mut self.previous, &mut rng);
            fisher_yates(&mut self.tracks, &mut rng);
        }

        self.save().await?;
        self.notify_shuffled(old).await?;

        Ok(self.result(Vec::new(), Vec::new()))
    }

    // Operaciones internas del reproductor

    /// Saca la siguiente pista de la cola
    pub(crate) fn take_next(&mut self) -> Option<Track> {
        if self.tracks.is_empty() {
            None
        } else {
            Some(self.tracks.remove(0))
        }
    }

    pub(crate) fn set_current(&mut self, track: Option<Track>) {
        self.current = track;
    }

    pub(crate) fn take_current(&mut self) -> Option<Track> {
        self.current.take()
    }

    /// Pasa una pista al frente del historial respetando el máximo
    pub(crate) fn push_previous(&mut self, track: Track) {
        if !track.is_resolved() {
            return;
        }
        self.previous.insert(0, track);
        if self.previous.len() > self.options.max_previous_tracks {
            self.previous.truncate(self.options.max_previous_tracks);
        }
        self.prune_backup();
    }

    pub(crate) fn pop_previous_front(&mut self) -> Option<Track> {
        if self.previous.is_empty() {
            return None;
        }
        let track = self.previous.remove(0);
        self.prune_backup();
        Some(track)
    }

    /// Reparte el orden lógico alrededor de `index`: lo anterior pasa al
    /// historial (más reciente primero) y desde `index` a las próximas.
    /// La pista actual queda dentro de una de las dos partes.
    pub(crate) fn repartition(&mut self, index: usize) {
        let mut timeline = self.timeline();
        let upcoming = timeline.split_off(index.min(timeline.len()));

        self.previous = timeline.into_iter().rev().filter(Track::is_resolved).collect();
        self.previous.truncate(self.options.max_previous_tracks);
        self.current = None;
        self.tracks = upcoming;
        self.prune_backup();

        debug!(
            "↔️ Cola repartida en {}: {} previas, {} próximas",
            index,
            self.previous.len(),
            self.tracks.len()
        );
    }

    pub(crate) fn checkpoint(&self) -> QueueCheckpoint {
        QueueCheckpoint {
            stored: self.to_stored(),
            backup: self.backup.clone(),
        }
    }

    /// Vuelve al estado guardado en `checkpoint`, sin persistir
    pub(crate) fn rollback(&mut self, checkpoint: QueueCheckpoint) {
        let QueueCheckpoint { stored, backup } = checkpoint;
        self.previous = stored.previous;
        self.current = stored.current;
        self.tracks = stored.tracks;
        if self.shuffled {
            self.backup = backup;
        }
    }

    // Funciones privadas

    fn admit(&self, items: TrackOrTracks, admission: Admission) -> Vec<Track> {
        admit_tracks(
            items.into_vec(),
            admission,
            self.credentials.as_deref(),
            self.options.cid_bytes,
        )
    }

    async fn append_admitted(&mut self, added: Vec<Track>) -> Result<QueueResult> {
        let old = self.snapshot_if_watched();

        self.tracks.extend(added.iter().cloned());
        if self.shuffled {
            push_to_backup(&mut self.backup, &added);
        }
        if !added.is_empty() {
            info!("➕ Agregadas {} pistas a la cola de {}", added.len(), self.guild_id);
        }

        self.save().await?;

        if let (Some(watcher), Some(old)) = (self.watcher.clone(), old) {
            if !added.is_empty() {
                watcher
                    .tracks_add(self.guild_id, &added, self.tracks.len(), &old, &self.to_stored())
                    .await
                    .map_err(QueueError::Watcher)?;
            }
        }

        Ok(self.result(added, Vec::new()))
    }

    async fn splice_admitted(
        &mut self,
        start: usize,
        delete_count: usize,
        added: Vec<Track>,
    ) -> Result<QueueResult> {
        let old = self.snapshot_if_watched();

        let start = start.min(self.tracks.len());
        let end = start.saturating_add(delete_count).min(self.tracks.len());
        let removed: Vec<Track> = self.tracks.splice(start..end, added.iter().cloned()).collect();

        if self.shuffled {
            push_to_backup(&mut self.backup, &added);
            self.prune_backup();
        }
        if !removed.is_empty() {
            debug!("❌ {} pistas eliminadas en posición {}", removed.len(), start);
        }

        self.save().await?;

        if let (Some(watcher), Some(old)) = (self.watcher.clone(), old) {
            let new = self.to_stored();
            let added_notice = if added.is_empty() {
                Ok(())
            } else {
                watcher.tracks_add(self.guild_id, &added, start, &old, &new).await
            };
            let removed_notice = if removed.is_empty() {
                Ok(())
            } else {
                watcher.tracks_removed(self.guild_id, &removed, start, &old, &new).await
            };
            added_notice.and(removed_notice).map_err(QueueError::Watcher)?;
        }

        Ok(self.result(added, removed))
    }

    async fn notify_shuffled(&self, old: Option<StoredQueue>) -> Result<()> {
        if let (Some(watcher), Some(old)) = (&self.watcher, old) {
            watcher
                .shuffled(self.guild_id, &old, &self.to_stored())
                .await
                .map_err(QueueError::Watcher)?;
        }
        Ok(())
    }

    fn snapshot_if_watched(&self) -> Option<StoredQueue> {
        self.watcher.as_ref().map(|_| self.to_stored())
    }

    fn result(&self, tracks_added: Vec<Track>, tracks_removed: Vec<Track>) -> QueueResult {
        QueueResult {
            previous: self.previous.clone(),
            current: self.current.clone(),
            tracks: self.tracks.clone(),
            tracks_added,
            tracks_removed,
        }
    }

    /// Mientras el modo aleatorio está activo, la copia no conserva pistas
    /// que ya salieron de la cola
    fn prune_backup(&mut self) {
        if self.shuffled {
            self.prune_backup_to_present();
        }
    }

    fn prune_backup_to_present(&mut self) {
        let present = self
            .previous
            .iter()
            .chain(self.current.as_ref())
            .chain(self.tracks.iter());
        prune_backup(&mut self.backup, present);
    }

    /// Pone cid a las pistas cargadas que no lo traen o lo repiten
    fn ensure_cids(&mut self) {
        let bytes = self.options.cid_bytes;
        let mut seen = HashSet::new();

        let all = self
            .previous
            .iter_mut()
            .chain(self.current.as_mut())
            .chain(self.tracks.iter_mut());
        for track in all {
            let fresh = track.cid().is_some_and(|cid| seen.insert(cid.to_string()));
            if !fresh {
                let cid = new_cid(bytes);
                seen.insert(cid.clone());
                track.set_cid(cid);
            }
        }
    }
}
