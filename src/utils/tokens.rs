use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use chrono::{DateTime, TimeZone, Utc};
use rand::RngCore;
use std::sync::atomic::{AtomicU16, Ordering};

use crate::error::{QueueError, Result};

/// Bytes por defecto de un token aleatorio
pub const DEFAULT_TOKEN_BYTES: usize = 16;

/// Época por defecto de los snowflakes: 2015-01-01T00:00:00Z
pub const DEFAULT_EPOCH_MS: i64 = 1_420_070_400_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenEncoding {
    #[default]
    Hex,
    Base64,
    Base64Url,
}

/// Genera un token aleatorio de `bytes` bytes codificado con `encoding`.
pub fn random_token(bytes: usize, encoding: TokenEncoding) -> Result<String> {
    if bytes == 0 {
        return Err(QueueError::InvalidArgument(
            "token length must be at least 1 byte".to_string(),
        ));
    }

    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);

    Ok(match encoding {
        TokenEncoding::Hex => to_hex(&buf),
        TokenEncoding::Base64 => STANDARD.encode(&buf),
        TokenEncoding::Base64Url => URL_SAFE_NO_PAD.encode(&buf),
    })
}

/// Token hexadecimal usado como id de correlación
pub(crate) fn new_cid(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes.max(1)];
    rand::thread_rng().fill_bytes(&mut buf);
    to_hex(&buf)
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Época de un generador de snowflakes.
#[derive(Debug, Clone, Copy)]
pub enum Epoch {
    Millis(i64),
    Date(DateTime<Utc>),
}

impl Default for Epoch {
    fn default() -> Self {
        Self::Millis(DEFAULT_EPOCH_MS)
    }
}

impl From<i64> for Epoch {
    fn from(ms: i64) -> Self {
        Self::Millis(ms)
    }
}

impl From<DateTime<Utc>> for Epoch {
    fn from(date: DateTime<Utc>) -> Self {
        Self::Date(date)
    }
}

impl Epoch {
    fn as_millis(&self) -> i64 {
        match self {
            Self::Millis(ms) => *ms,
            Self::Date(date) => date.timestamp_millis(),
        }
    }
}

/// Generador de ids snowflake de 64 bits:
/// `(ms desde la época << 22) | (worker << 17) | (proceso << 12) | incremento`.
#[derive(Debug)]
pub struct Snowflake {
    epoch_ms: i64,
    worker_id: u64,
    process_id: u64,
    increment: AtomicU16,
}

impl Snowflake {
    pub fn new(epoch: impl Into<Epoch>) -> Result<Self> {
        let epoch_ms = epoch.into().as_millis();
        if epoch_ms < 0 || Utc.timestamp_millis_opt(epoch_ms).single().is_none() {
            return Err(QueueError::InvalidArgument(format!(
                "epoch must be a valid non-negative timestamp, got {}",
                epoch_ms
            )));
        }

        Ok(Self {
            epoch_ms,
            worker_id: 0,
            process_id: 1,
            increment: AtomicU16::new(0),
        })
    }

    pub fn with_worker_id(mut self, worker_id: u8) -> Self {
        self.worker_id = u64::from(worker_id & 0x1f);
        self
    }

    pub fn with_process_id(mut self, process_id: u8) -> Self {
        self.process_id = u64::from(process_id & 0x1f);
        self
    }

    /// Genera un snowflake con la hora actual
    pub fn generate(&self) -> Result<u64> {
        self.generate_at(Utc::now())
    }

    pub fn generate_at(&self, at: DateTime<Utc>) -> Result<u64> {
        let elapsed = at.timestamp_millis() - self.epoch_ms;
        if elapsed < 0 {
            return Err(QueueError::InvalidArgument(
                "epoch is later than the generation time".to_string(),
            ));
        }

        let increment = u64::from(self.increment.fetch_add(1, Ordering::Relaxed) & 0x0fff);
        Ok(((elapsed as u64) << 22) | (self.worker_id << 17) | (self.process_id << 12) | increment)
    }

    /// Momento de creación codificado en un snowflake
    pub fn timestamp_of(&self, snowflake: u64) -> Option<DateTime<Utc>> {
        let ms = (snowflake >> 22) as i64 + self.epoch_ms;
        Utc.timestamp_millis_opt(ms).single()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_random_token_encodings() {
        let hex = random_token(16, TokenEncoding::Hex).unwrap();
        assert_eq!(hex.len(), 32);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));

        let b64 = random_token(3, TokenEncoding::Base64).unwrap();
        assert_eq!(b64.len(), 4);

        let url = random_token(16, TokenEncoding::Base64Url).unwrap();
        assert!(!url.contains('+') && !url.contains('/') && !url.contains('='));

        assert!(matches!(
            random_token(0, TokenEncoding::Hex),
            Err(QueueError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_snowflake_layout() {
        let generator = Snowflake::new(DEFAULT_EPOCH_MS).unwrap();
        let at = Utc.timestamp_millis_opt(DEFAULT_EPOCH_MS + 1_000).unwrap();

        let first = generator.generate_at(at).unwrap();
        let second = generator.generate_at(at).unwrap();

        assert_eq!(first >> 22, 1_000);
        assert_eq!((first >> 12) & 0x1f, 1);
        assert_eq!(second, first + 1);
        assert_eq!(generator.timestamp_of(first), Some(at));
    }

    #[test]
    fn test_snowflake_rejects_future_epoch() {
        let future = Utc::now() + chrono::Duration::days(1);
        let generator = Snowflake::new(future).unwrap();
        assert!(matches!(generator.generate(), Err(QueueError::InvalidArgument(_))));
        assert!(Snowflake::new(-5).is_err());
    }
}
