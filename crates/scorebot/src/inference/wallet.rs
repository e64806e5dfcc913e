//! Arweave wallet loaded from a JWK keyfile.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rsa::pss::SigningKey;
use rsa::signature::{RandomizedSigner, SignatureEncoding};
use rsa::{BigUint, RsaPrivateKey};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

use crate::error::{BotError, Result};

/// Byte length of an Arweave RSA-4096 modulus; also the length of the
/// owner field and of every signature.
pub const OWNER_LEN: usize = 512;

const PSS_SALT_LEN: usize = 32;

#[derive(Deserialize)]
struct Jwk {
    kty: String,
    n: String,
    e: String,
    d: String,
    p: String,
    q: String,
}

/// Signing identity of the bot on the compute network.
pub struct Wallet {
    signing_key: SigningKey<Sha256>,
    owner: Vec<u8>,
}

impl Wallet {
    /// Read a JWK keyfile from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            BotError::Config(format!("cannot read wallet {}: {e}", path.display()))
        })?;
        Self::from_jwk(&text)
    }

    /// Parse a JWK keyfile. Only RSA-4096 keys are accepted.
    pub fn from_jwk(text: &str) -> Result<Self> {
        let jwk: Jwk = serde_json::from_str(text)
            .map_err(|e| BotError::Config(format!("invalid wallet keyfile: {e}")))?;
        if jwk.kty != "RSA" {
            return Err(BotError::Config(format!(
                "wallet key type is {}, expected RSA",
                jwk.kty
            )));
        }

        let owner = decode_component("n", &jwk.n)?;
        if owner.len() != OWNER_LEN {
            return Err(BotError::Config(format!(
                "wallet modulus is {} bytes, expected {OWNER_LEN}",
                owner.len()
            )));
        }

        let key = RsaPrivateKey::from_components(
            BigUint::from_bytes_be(&owner),
            uint_component("e", &jwk.e)?,
            uint_component("d", &jwk.d)?,
            vec![uint_component("p", &jwk.p)?, uint_component("q", &jwk.q)?],
        )
        .map_err(|e| BotError::Config(format!("invalid wallet key: {e}")))?;

        Ok(Self {
            signing_key: SigningKey::new_with_salt_len(key, PSS_SALT_LEN),
            owner,
        })
    }

    /// Raw public modulus, as carried in the owner field of a data item.
    pub fn owner(&self) -> &[u8] {
        &self.owner
    }

    /// Wallet address: url-safe SHA-256 of the owner.
    pub fn address(&self) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(&self.owner))
    }

    /// RSA-PSS signature (SHA-256, 32-byte salt) over `message`.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let signature = self
            .signing_key
            .try_sign_with_rng(&mut rand::thread_rng(), message)
            .map_err(|e| BotError::Signing(e.to_string()))?;
        Ok(signature.to_vec())
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

fn decode_component(name: &str, value: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|e| BotError::Config(format!("wallet field '{name}' is not base64url: {e}")))
}

fn uint_component(name: &str, value: &str) -> Result<BigUint> {
    decode_component(name, value).map(|bytes| BigUint::from_bytes_be(&bytes))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use rsa::pss::VerifyingKey;
    use rsa::RsaPublicKey;
    use serde_json::Value;

    /// RSA-4096 keyfile used only by tests.
    pub const TEST_WALLET: &str = include_str!("../../tests/fixtures/wallet.json");

    pub fn test_wallet() -> Wallet {
        Wallet::from_jwk(TEST_WALLET).unwrap()
    }

    pub fn verifying_key() -> VerifyingKey<Sha256> {
        let jwk: Value = serde_json::from_str(TEST_WALLET).unwrap();
        let field = |name: &str| {
            BigUint::from_bytes_be(
                &URL_SAFE_NO_PAD
                    .decode(jwk[name].as_str().unwrap())
                    .unwrap(),
            )
        };
        VerifyingKey::new(RsaPublicKey::new(field("n"), field("e")).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{test_wallet, verifying_key, TEST_WALLET};
    use super::*;
    use rsa::pss::Signature;
    use rsa::signature::Verifier;
    use serde_json::Value;

    #[test]
    fn test_load_fixture_wallet() {
        let wallet = test_wallet();
        assert_eq!(wallet.owner().len(), OWNER_LEN);
        assert_eq!(wallet.address(), "SBI1DldQwtVwlYC6Kyu3vU15swcI_TLzWAB0xKKOk7Q");
        assert!(format!("{wallet:?}").contains("SBI1DldQ"));
    }

    #[test]
    fn test_signature_verifies() {
        let wallet = test_wallet();
        let signature = wallet.sign(b"message").unwrap();
        assert_eq!(signature.len(), OWNER_LEN);

        let signature = Signature::try_from(signature.as_slice()).unwrap();
        assert!(verifying_key().verify(b"message", &signature).is_ok());
        assert!(verifying_key().verify(b"other", &signature).is_err());
    }

    #[test]
    fn test_rejects_non_rsa_key() {
        let err = Wallet::from_jwk(r#"{"kty":"EC","n":"","e":"","d":"","p":"","q":""}"#)
            .unwrap_err();
        assert!(err.to_string().contains("expected RSA"));
    }

    #[test]
    fn test_rejects_short_modulus() {
        let mut jwk: Value = serde_json::from_str(TEST_WALLET).unwrap();
        jwk["n"] = Value::String(URL_SAFE_NO_PAD.encode([7u8; 256]));
        let err = Wallet::from_jwk(&jwk.to_string()).unwrap_err();
        assert!(err.to_string().contains("expected 512"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Wallet::load(Path::new("/nonexistent/wallet.json")).unwrap_err();
        assert!(matches!(err, BotError::Config(_)));
    }
}
