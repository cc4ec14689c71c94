use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// Fuentes que necesitan credencial del proveedor para reproducirse
pub const CREDENTIAL_SOURCES: [&str; 3] = ["deezer", "spotify", "apple"];

/// Cómo se reparte la siguiente credencial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialPolicy {
    #[default]
    RoundRobin,
    Random,
}

impl FromStr for CredentialPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "round-robin" | "roundrobin" | "rr" => Ok(Self::RoundRobin),
            "random" => Ok(Self::Random),
            other => anyhow::bail!("Política de credenciales desconocida: {}", other),
        }
    }
}

/// Conjunto de credenciales (arl) de un gestor.
///
/// El cursor vive en el propio pool, así cada gestor reparte las suyas sin
/// interferir con otros. Las premium tienen preferencia cuando existen.
#[derive(Debug)]
pub struct CredentialPool {
    arls: Vec<String>,
    premium_arls: Vec<String>,
    policy: CredentialPolicy,
    cursor: Mutex<usize>,
}

impl CredentialPool {
    pub fn new(arls: Vec<String>, premium_arls: Vec<String>, policy: CredentialPolicy) -> Self {
        let clean = |list: Vec<String>| -> Vec<String> {
            list.into_iter()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect()
        };

        Self {
            arls: clean(arls),
            premium_arls: clean(premium_arls),
            policy,
            cursor: Mutex::new(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.arls.is_empty() && self.premium_arls.is_empty()
    }

    pub fn policy(&self) -> CredentialPolicy {
        self.policy
    }

    /// La fuente de la pista necesita credencial
    pub fn applies_to(source_name: &str) -> bool {
        let source = source_name.to_lowercase();
        CREDENTIAL_SOURCES.iter().any(|s| source.contains(s))
    }

    /// Siguiente credencial según la política
    pub fn next(&self) -> Option<String> {
        let pool = if self.premium_arls.is_empty() {
            &self.arls
        } else {
            &self.premium_arls
        };
        if pool.is_empty() {
            return None;
        }

        let index = match self.policy {
            CredentialPolicy::RoundRobin => {
                let mut cursor = self.cursor.lock();
                let index = *cursor % pool.len();
                *cursor = (index + 1) % pool.len();
                index
            }
            CredentialPolicy::Random => rand::thread_rng().gen_range(0..pool.len()),
        };

        debug!("🔑 Credencial {} de {} entregada", index + 1, pool.len());
        pool.get(index).cloned()
    }
}
