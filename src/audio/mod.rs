//! # Audio Module
//!
//! Queue and playback navigation for arii-lava.
//!
//! ## Architecture
//!
//! ### [`queue`] - Queue Store
//! - Previous tracks, current track and upcoming tracks per guild
//! - Every admitted track gets a unique correlation id (cid)
//! - Persists through a [`crate::storage::QueueSaver`] after each mutation
//!
//! ### [`shuffle`] - Reversible Shuffle
//! - Fisher-Yates over history and upcoming tracks
//! - Backup of the original order keyed by cid, pruned as tracks leave
//!
//! ### [`player`] - Playback Navigator
//! - `skip` by index or fuzzy title, optionally into history
//! - `previous` and the track-end advance over a [`engine::PlaybackEngine`]
//!
//! ### [`manager`] - Player Manager
//! - One player per guild, exposed to serenity through `TypeMapKey`
//! - Routes engine events to the right player
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use arii_lava::audio::{manager::PlayerManager, songbird_engine::SongbirdEngine};
//! use arii_lava::storage::MemoryQueueSaver;
//! use serenity::all::GuildId;
//! use std::sync::Arc;
//!
//! # async fn example(songbird: Arc<songbird::Songbird>) -> anyhow::Result<()> {
//! let (engine, events) = SongbirdEngine::new(songbird);
//! let manager = Arc::new(PlayerManager::new(Arc::new(engine), Arc::new(MemoryQueueSaver::new())));
//! manager.clone().spawn_event_loop(events);
//!
//! let player = manager.create_player(GuildId::new(123456789)).await?;
//! let mut player = player.lock().await;
//! player.skip(Some("never gonna".into()), true, false).await?;
//! # Ok(())
//! # }
//! ```

pub mod credentials;
pub mod engine;
pub mod identity;
pub mod manager;
pub mod player;
pub mod queue;
pub mod shuffle;
pub mod similarity;
pub mod songbird_engine;
pub mod track;
pub mod watcher;
