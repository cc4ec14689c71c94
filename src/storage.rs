use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serenity::model::id::GuildId;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::audio::track::Track;

/// Forma persistida de una cola
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredQueue {
    #[serde(default)]
    pub previous: Vec<Track>,
    #[serde(default)]
    pub current: Option<Track>,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

/// Contrato de guardado: la cola llama a `set` tras cada mutación y nunca
/// mira el medio de almacenamiento.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueSaver: Send + Sync {
    async fn get(&self, guild_id: GuildId) -> Result<Option<StoredQueue>>;

    async fn set(&self, guild_id: GuildId, stored: &StoredQueue) -> Result<()>;

    async fn delete(&self, guild_id: GuildId) -> Result<()>;
}

/// Guardado en memoria, útil por defecto y en pruebas
#[derive(Debug, Default)]
pub struct MemoryQueueSaver {
    queues: DashMap<GuildId, StoredQueue>,
}

impl MemoryQueueSaver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}

#[async_trait]
impl QueueSaver for MemoryQueueSaver {
    async fn get(&self, guild_id: GuildId) -> Result<Option<StoredQueue>> {
        Ok(self.queues.get(&guild_id).map(|q| q.clone()))
    }

    async fn set(&self, guild_id: GuildId, stored: &StoredQueue) -> Result<()> {
        self.queues.insert(guild_id, stored.clone());
        Ok(())
    }

    async fn delete(&self, guild_id: GuildId) -> Result<()> {
        self.queues.remove(&guild_id);
        Ok(())
    }
}

/// Guardado basado en archivos JSON, uno por guild
pub struct JsonQueueSaver {
    data_dir: PathBuf,
}

impl JsonQueueSaver {
    pub async fn new(data_dir: PathBuf) -> Result<Self> {
        // Crear directorio de datos si no existe
        fs::create_dir_all(data_dir.join("queues")).await?;

        info!("📁 Guardado de colas inicializado en: {}", data_dir.display());

        Ok(Self { data_dir })
    }

    /// Lista las guilds con cola guardada
    pub async fn list_guilds(&self) -> Result<Vec<GuildId>> {
        let mut files = fs::read_dir(self.queues_dir()).await?;
        let mut guilds = Vec::new();

        while let Some(entry) = files.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                if let Some(id) = path
                    .file_stem()
                    .and_then(|n| n.to_str())
                    .and_then(|n| n.strip_prefix("guild_"))
                    .and_then(|id| id.parse::<u64>().ok())
                    .filter(|id| *id != 0)
                {
                    guilds.push(GuildId::new(id));
                }
            }
        }

        guilds.sort();
        Ok(guilds)
    }

    /// Obtiene estadísticas de almacenamiento
    pub async fn get_storage_stats(&self) -> Result<StorageStats> {
        let mut files = fs::read_dir(self.queues_dir()).await?;
        let mut file_count = 0;
        let mut total_size = 0;

        while let Some(entry) = files.next_entry().await? {
            if entry.path().extension().map_or(false, |ext| ext == "json") {
                file_count += 1;
                if let Ok(metadata) = entry.metadata().await {
                    total_size += metadata.len();
                }
            }
        }

        Ok(StorageStats {
            stored_queues: file_count,
            total_size_bytes: total_size,
            data_dir: self.data_dir.clone(),
        })
    }

    fn queues_dir(&self) -> PathBuf {
        self.data_dir.join("queues")
    }

    fn get_queue_file_path(&self, guild_id: GuildId) -> PathBuf {
        self.queues_dir().join(format!("guild_{}.json", guild_id.get()))
    }
}

#[async_trait]
impl QueueSaver for JsonQueueSaver {
    async fn get(&self, guild_id: GuildId) -> Result<Option<StoredQueue>> {
        let file_path = self.get_queue_file_path(guild_id);
        let content = match fs::read_to_string(&file_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&content) {
            Ok(stored) => Ok(Some(stored)),
            Err(e) => {
                warn!("Cola corrupta para guild {}: {}", guild_id, e);
                Err(e.into())
            }
        }
    }

    async fn set(&self, guild_id: GuildId, stored: &StoredQueue) -> Result<()> {
        let file_path = self.get_queue_file_path(guild_id);
        let content = serde_json::to_string_pretty(stored)?;
        fs::write(&file_path, content).await?;
        debug!("💾 Cola guardada para guild {}", guild_id);
        Ok(())
    }

    async fn delete(&self, guild_id: GuildId) -> Result<()> {
        match fs::remove_file(self.get_queue_file_path(guild_id)).await {
            Ok(()) => {
                info!("🗑️ Cola eliminada para guild {}", guild_id);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Estadísticas de almacenamiento
#[derive(Debug)]
pub struct StorageStats {
    pub stored_queues: usize,
    pub total_size_bytes: u64,
    pub data_dir: PathBuf,
}

impl std::fmt::Display for StorageStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "📊 Storage Stats:\n\
             📁 Data Directory: {}\n\
             📝 Stored Queues: {} files\n\
             📦 Total Size: {} bytes ({:.2} KB)",
            self.data_dir.display(),
            self.stored_queues,
            self.total_size_bytes,
            self.total_size_bytes as f64 / 1024.0
        )
    }
}
