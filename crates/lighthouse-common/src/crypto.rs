use solana_sdk::signer::{keypair::Keypair, Signer};

use crate::errors::{Error, Result};

pub fn keypair_from_base58(secret: &str) -> Result<Keypair> {
    let bytes = bs58::decode(secret.trim())
        .into_vec()
        .map_err(|e| Error::Validation(format!("Failed to decode keypair: {}", e)))?;

    Keypair::from_bytes(&bytes)
        .map_err(|e| Error::Validation(format!("Invalid keypair bytes: {}", e)))
}

/// Decode `secret` and check it belongs to `expected_pubkey`.
pub fn keypair_matching(secret: &str, expected_pubkey: &str) -> Result<Keypair> {
    let keypair = keypair_from_base58(secret)?;
    if keypair.pubkey().to_string() != expected_pubkey {
        return Err(Error::Validation(format!(
            "secret key does not belong to {}",
            expected_pubkey
        )));
    }
    Ok(keypair)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_round_trip() {
        let keypair = Keypair::new();
        let secret = bs58::encode(keypair.to_bytes()).into_string();
        let decoded = keypair_from_base58(&format!(" {}\n", secret)).unwrap();
        assert_eq!(decoded.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_keypair_matching_rejects_other_pubkey() {
        let keypair = Keypair::new();
        let secret = bs58::encode(keypair.to_bytes()).into_string();

        assert!(keypair_matching(&secret, &keypair.pubkey().to_string()).is_ok());
        assert!(keypair_matching(&secret, &Keypair::new().pubkey().to_string()).is_err());
        assert!(keypair_from_base58("0OIl").is_err());
    }
}
