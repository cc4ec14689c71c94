use tracing::debug;

use super::{credentials::CredentialPool, track::Track};
use crate::utils::tokens::new_cid;

/// Qué pistas acepta la partición destino.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// `tracks`: resueltas y sin resolver
    Queue,
    /// `previous`: solo resueltas
    History,
}

/// Filtra las pistas encolables y les pone un id de correlación nuevo.
///
/// Si hay credenciales y la fuente las necesita, adjunta una cuando la
/// pista todavía no trae la suya.
pub fn admit_tracks(
    items: Vec<Track>,
    admission: Admission,
    credentials: Option<&CredentialPool>,
    cid_bytes: usize,
) -> Vec<Track> {
    let received = items.len();

    let admitted: Vec<Track> = items
        .into_iter()
        .filter(|t| match admission {
            Admission::Queue => t.is_queueable(),
            Admission::History => t.is_resolved(),
        })
        .map(|mut track| {
            track.set_cid(new_cid(cid_bytes));

            if let Some(pool) = credentials.filter(|p| !p.is_empty()) {
                if track.arl().is_none() && CredentialPool::applies_to(track.source_name()) {
                    if let Some(arl) = pool.next() {
                        track.set_arl(arl);
                    }
                }
            }
            track
        })
        .collect();

    if admitted.len() != received {
        debug!("🧹 Descartadas {} pistas no encolables", received - admitted.len());
    }
    admitted
}
