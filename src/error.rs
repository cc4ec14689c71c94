use thiserror::Error;

/// Errores de la cola, el reproductor y las utilidades.
#[derive(Error, Debug)]
pub enum QueueError {
    /// Índice fuera de rango, sin canción anterior o sin coincidencia de título
    #[error("range error: {0}")]
    Range(String),

    /// Argumento inválido para formato o generación de ids
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Error devuelto por el observador de cambios, sin modificar
    #[error(transparent)]
    Watcher(anyhow::Error),

    /// Error del guardado de la cola
    #[error(transparent)]
    Storage(anyhow::Error),

    /// Error del motor de reproducción
    #[error(transparent)]
    Engine(anyhow::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QueueError {
    pub(crate) fn range(message: impl Into<String>) -> Self {
        Self::Range(message.into())
    }

    pub fn is_range(&self) -> bool {
        matches!(self, Self::Range(_))
    }
}

pub type Result<T> = std::result::Result<T, QueueError>;
