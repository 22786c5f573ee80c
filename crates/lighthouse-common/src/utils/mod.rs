//! Utility functions and helpers

mod time;

use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

pub use time::{current_timestamp, seconds_from_days};

pub fn string_to_pubkey(s: &str) -> crate::Result<Pubkey> {
    Pubkey::from_str(s).map_err(|e: solana_sdk::pubkey::ParsePubkeyError| {
        crate::Error::Validation(format!("invalid public key {}: {}", s, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_to_pubkey() {
        let key = Pubkey::new_unique();
        assert_eq!(string_to_pubkey(&key.to_string()).unwrap(), key);
        assert!(matches!(
            string_to_pubkey("nope"),
            Err(crate::Error::Validation(_))
        ));
    }
}
