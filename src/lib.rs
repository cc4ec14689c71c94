//! # arii-lava
//!
//! Queue manager for Discord music bots: per-guild queues with unique
//! correlation ids, reversible shuffle, fuzzy skip by title and history
//! navigation on top of an external playback engine (songbird by default).

pub mod audio;
pub mod config;
pub mod error;
pub mod storage;
pub mod utils;

pub use audio::{
    engine::{EngineEvent, PlaybackEngine},
    manager::PlayerManager,
    player::{Player, SkipTarget},
    queue::{Queue, QueueOptions, QueueResult},
    track::{Track, TrackInfo, TrackOrTracks},
    watcher::QueueChangesWatcher,
};
pub use config::Config;
pub use error::{QueueError, Result};
pub use storage::{JsonQueueSaver, MemoryQueueSaver, QueueSaver, StoredQueue};
