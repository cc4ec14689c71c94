use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serenity::model::id::UserId;
use std::time::Duration;

/// Clave del id de correlación dentro de `user_data`
pub const CID_KEY: &str = "cid";
/// Clave de la credencial del proveedor dentro de `user_data`
pub const ARL_KEY: &str = "arl";

/// Metadatos de una pista tal como los entrega el motor de audio.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Duración en milisegundos
    #[serde(default, rename = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default)]
    pub source_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub is_stream: bool,
}

/// Pista encolable.
///
/// Una pista con `encoded` está *resuelta* y se puede reproducir tal cual.
/// Sin `encoded` pero con título o uri está *sin resolver*: el motor la
/// resuelve justo antes de reproducirla. Cualquier otra cosa no es encolable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoded: Option<String>,
    pub info: TrackInfo,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub user_data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester: Option<UserId>,
}

impl Track {
    pub fn resolved(encoded: impl Into<String>, info: TrackInfo) -> Self {
        Self {
            encoded: Some(encoded.into()),
            info,
            user_data: Map::new(),
            requester: None,
        }
    }

    pub fn unresolved(info: TrackInfo) -> Self {
        Self {
            encoded: None,
            info,
            user_data: Map::new(),
            requester: None,
        }
    }

    // Clasificadores

    pub fn is_resolved(&self) -> bool {
        self.encoded.as_deref().is_some_and(|e| !e.is_empty())
    }

    pub fn is_unresolved(&self) -> bool {
        !self.is_resolved()
            && (!self.info.title.trim().is_empty() || self.info.uri.is_some())
    }

    pub fn is_queueable(&self) -> bool {
        self.is_resolved() || self.is_unresolved()
    }

    // Getters

    pub fn title(&self) -> &str {
        &self.info.title
    }

    pub fn author(&self) -> Option<&str> {
        self.info.author.as_deref()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.info.duration_ms.map(Duration::from_millis)
    }

    pub fn source_name(&self) -> &str {
        &self.info.source_name
    }

    pub fn cid(&self) -> Option<&str> {
        self.user_data
            .get(CID_KEY)
            .and_then(Value::as_str)
            .filter(|cid| !cid.is_empty())
    }

    pub fn arl(&self) -> Option<&str> {
        self.user_data.get(ARL_KEY).and_then(Value::as_str)
    }

    /// Texto usado para la búsqueda por similitud: título y, opcionalmente, autor
    pub fn search_label(&self, with_author: bool) -> String {
        match (with_author, self.author()) {
            (true, Some(author)) if !author.is_empty() => format!("{} {}", self.title(), author),
            _ => self.title().to_string(),
        }
    }

    // Setters

    pub(crate) fn set_cid(&mut self, cid: String) {
        self.user_data.insert(CID_KEY.to_string(), Value::String(cid));
    }

    pub(crate) fn set_arl(&mut self, arl: String) {
        self.user_data.insert(ARL_KEY.to_string(), Value::String(arl));
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.info.author = Some(author.into());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.info.uri = Some(uri.into());
        self
    }

    pub fn with_source_name(mut self, source_name: impl Into<String>) -> Self {
        self.info.source_name = source_name.into();
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.info.duration_ms = Some(duration.as_millis() as u64);
        self
    }

    pub fn with_requester(mut self, user_id: UserId) -> Self {
        self.requester = Some(user_id);
        self
    }

    pub fn with_user_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.user_data.insert(key.into(), value);
        self
    }
}

/// Una pista o un lote de pistas para las operaciones de la cola.
#[derive(Debug, Clone)]
pub enum TrackOrTracks {
    One(Track),
    Many(Vec<Track>),
}

impl TrackOrTracks {
    pub fn into_vec(self) -> Vec<Track> {
        match self {
            Self::One(track) => vec![track],
            Self::Many(tracks) => tracks,
        }
    }
}

impl From<Track> for TrackOrTracks {
    fn from(track: Track) -> Self {
        Self::One(track)
    }
}

impl From<Vec<Track>> for TrackOrTracks {
    fn from(tracks: Vec<Track>) -> Self {
        Self::Many(tracks)
    }
}

impl From<&[Track]> for TrackOrTracks {
    fn from(tracks: &[Track]) -> Self {
        Self::Many(tracks.to_vec())
    }
}
