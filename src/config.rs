use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::audio::{
    credentials::{CredentialPolicy, CredentialPool},
    queue::{QueueOptions, DEFAULT_MAX_PREVIOUS_TRACKS},
    similarity::{SimilarityOptions, DEFAULT_THRESHOLD},
};
use crate::utils::tokens::DEFAULT_TOKEN_BYTES;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Paths
    pub data_dir: PathBuf,

    // Cola
    pub max_previous_tracks: usize,
    pub cid_bytes: usize,

    // Búsqueda
    pub similarity_threshold: f64,
    pub similarity_with_author: bool,

    // Credenciales del proveedor
    pub deezer_arls: Vec<String>,
    pub deezer_premium_arls: Vec<String>,
    pub credential_policy: CredentialPolicy,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            // Paths
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),

            // Cola
            max_previous_tracks: match std::env::var("MAX_PREVIOUS_TRACKS") {
                Ok(val) if !val.trim().is_empty() => val.trim().parse()?,
                _ => defaults.max_previous_tracks,
            },
            cid_bytes: match std::env::var("CID_BYTES") {
                Ok(val) if !val.trim().is_empty() => val.trim().parse()?,
                _ => defaults.cid_bytes,
            },

            // Búsqueda
            similarity_threshold: match std::env::var("SIMILARITY_THRESHOLD") {
                Ok(val) if !val.trim().is_empty() => val.trim().parse()?,
                _ => defaults.similarity_threshold,
            },
            similarity_with_author: std::env::var("SIMILARITY_WITH_AUTHOR")
                .unwrap_or_else(|_| "false".to_string())
                .trim()
                .parse()?,

            // Credenciales
            deezer_arls: split_list(std::env::var("DEEZER_ARLS").ok()),
            deezer_premium_arls: split_list(std::env::var("DEEZER_PREMIUM_ARLS").ok()),
            credential_policy: std::env::var("CREDENTIAL_POLICY")
                .unwrap_or_else(|_| "round-robin".to_string())
                .parse()?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Comprueba que los valores tengan sentido antes de usarlos.
    pub fn validate(&self) -> Result<()> {
        if self.max_previous_tracks == 0 {
            anyhow::bail!("Max previous tracks must be greater than 0");
        }

        if self.cid_bytes == 0 {
            anyhow::bail!("CID bytes must be greater than 0");
        }

        if !(0.0..=100.0).contains(&self.similarity_threshold) {
            anyhow::bail!(
                "Similarity threshold must be between 0 and 100, got: {}",
                self.similarity_threshold
            );
        }

        Ok(())
    }

    /// Resumen apto para logs; nunca muestra las credenciales.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Data: {}\n  \
            Queue: {} previous max, {}-byte cids\n  \
            Search: threshold {}, with author={}\n  \
            Credentials: {} arls, {} premium ({:?})",
            self.data_dir.display(),
            self.max_previous_tracks,
            self.cid_bytes,
            self.similarity_threshold,
            self.similarity_with_author,
            self.deezer_arls.len(),
            self.deezer_premium_arls.len(),
            self.credential_policy
        )
    }

    pub fn queue_options(&self) -> QueueOptions {
        QueueOptions {
            max_previous_tracks: self.max_previous_tracks,
            cid_bytes: self.cid_bytes,
        }
    }

    pub fn similarity_options(&self) -> SimilarityOptions {
        SimilarityOptions {
            threshold: self.similarity_threshold,
            with_author: self.similarity_with_author,
        }
    }

    /// Pool de credenciales, o `None` si no se configuró ninguna
    pub fn credential_pool(&self) -> Option<CredentialPool> {
        let pool = CredentialPool::new(
            self.deezer_arls.clone(),
            self.deezer_premium_arls.clone(),
            self.credential_policy,
        );
        (!pool.is_empty()).then_some(pool)
    }
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: "./data".into(),

            max_previous_tracks: DEFAULT_MAX_PREVIOUS_TRACKS,
            cid_bytes: DEFAULT_TOKEN_BYTES,

            similarity_threshold: DEFAULT_THRESHOLD,
            similarity_with_author: false,

            deezer_arls: Vec::new(),
            deezer_premium_arls: Vec::new(),
            credential_policy: CredentialPolicy::RoundRobin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.queue_options(), QueueOptions::default());
        assert_eq!(config.similarity_options(), SimilarityOptions::default());
        assert!(config.credential_pool().is_none());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            max_previous_tracks: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            similarity_threshold: 150.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            cid_bytes: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_split_list_and_pool() {
        assert_eq!(
            split_list(Some(" a, ,b ,c".to_string())),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert!(split_list(None).is_empty());

        let config = Config {
            deezer_arls: vec!["arl-1".to_string()],
            ..Default::default()
        };
        assert!(config.credential_pool().is_some());
    }

    #[test]
    fn test_summary_hides_credentials() {
        let config = Config {
            deezer_arls: vec!["secret-arl".to_string()],
            ..Default::default()
        };
        let summary = config.summary();
        assert!(summary.contains("1 arls"));
        assert!(!summary.contains("secret-arl"));
    }
}
