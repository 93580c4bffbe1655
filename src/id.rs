//! ID and fingerprint utilities for Freshen
//!
//! Run identifiers, epoch timestamps, and content fingerprints that let logs
//! refer to profile text without carrying it.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a unique run ID
///
/// Format: `run-{timestamp_ms}-{random_hex}`
/// Example: `run-1738300800123-a1b2`
pub fn generate_run_id() -> String {
    let timestamp = now_ms();
    let random: u16 = rand::rng().random();
    format!("run-{}-{:04x}", timestamp, random)
}

/// Short SHA-256 fingerprint of a piece of text (first 12 hex chars).
pub fn fingerprint(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(&digest[..6])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_returns_reasonable_timestamp() {
        // 2024-01-01 in ms
        assert!(now_ms() > 1_704_067_200_000);
    }

    #[test]
    fn test_generate_run_id_format() {
        let id = generate_run_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "run");
        assert!(parts[1].parse::<u64>().is_ok());
        assert_eq!(parts[2].len(), 4);
    }

    #[test]
    fn test_fingerprint_is_stable_and_short() {
        let a = fingerprint("Senior engineer with ten years of experience.");
        let b = fingerprint("Senior engineer with ten years of experience.");
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
    }

    #[test]
    fn test_fingerprint_differs_on_single_char() {
        assert_ne!(fingerprint("Hello world."), fingerprint("Hello world"));
    }
}
