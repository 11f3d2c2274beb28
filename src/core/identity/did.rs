// src/core/identity/did.rs
//! Deterministic DID derivation and identifier parsing.
//!
//! The identifier of record is a pure function of the aggregate
//! commitment and the target network. Any wallet, on any device, that
//! reproduces the same commitment derives the byte-identical DID; that is
//! the whole Sybil-resistance argument, so nothing wallet- or
//! enrollment-specific may ever enter the hash.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Sha3_256};
use tracing::warn;

use crate::core::crypto::types::AggregateCommitment;
use crate::utils::error::{IdentityError, Result};

pub const DID_METHOD: &str = "cardano";

const DID_PERSONALIZATION: &[u8] = b"bioanchor.did.v1";
const LEGACY_PERSONALIZATION: &[u8] = b"bioanchor.did.legacy";
const LEGACY_DIGEST_BYTES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Preprod,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Preprod => "preprod",
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Network {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "preprod" => Ok(Network::Preprod),
            other => Err(IdentityError::InvalidDid(format!(
                "unknown network '{}'",
                other
            ))),
        }
    }
}

/// A parsed identifier, current or legacy form.
///
/// Current: `did:cardano:<network>:<base58(hash)>`.
/// Legacy: `did:cardano:<wallet>#<digest>` — wallet-bound, read-only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Did {
    Deterministic { network: Network, body: String },
    Legacy { wallet: String, digest: String },
}

impl Did {
    pub fn parse(s: &str) -> Result<Self> {
        let rest = s
            .strip_prefix("did:")
            .and_then(|r| r.strip_prefix(DID_METHOD))
            .and_then(|r| r.strip_prefix(':'))
            .ok_or_else(|| {
                IdentityError::InvalidDid(format!("missing 'did:{}:' prefix", DID_METHOD))
            })?;

        if let Some((wallet, digest)) = rest.split_once('#') {
            if wallet.is_empty() || digest.is_empty() {
                return Err(IdentityError::InvalidDid(
                    "legacy form needs wallet and digest".into(),
                ));
            }
            if digest.len() != 2 * LEGACY_DIGEST_BYTES || hex::decode(digest).is_err() {
                return Err(IdentityError::InvalidDid("malformed legacy digest".into()));
            }
            return Ok(Did::Legacy {
                wallet: wallet.to_string(),
                digest: digest.to_string(),
            });
        }

        let (network, body) = rest.split_once(':').ok_or_else(|| {
            IdentityError::InvalidDid("expected '<network>:<body>'".into())
        })?;
        let network: Network = network.parse()?;
        let decoded = bs58::decode(body)
            .into_vec()
            .map_err(|_| IdentityError::InvalidDid("body is not base58".into()))?;
        if decoded.len() != 32 {
            return Err(IdentityError::InvalidDid(format!(
                "body decodes to {} bytes, expected 32",
                decoded.len()
            )));
        }
        Ok(Did::Deterministic {
            network,
            body: body.to_string(),
        })
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Did::Legacy { .. })
    }

    pub fn network(&self) -> Option<Network> {
        match self {
            Did::Deterministic { network, .. } => Some(*network),
            Did::Legacy { .. } => None,
        }
    }
}

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Did::Deterministic { network, body } => {
                write!(f, "did:{}:{}:{}", DID_METHOD, network, body)
            }
            Did::Legacy { wallet, digest } => {
                write!(f, "did:{}:{}#{}", DID_METHOD, wallet, digest)
            }
        }
    }
}

impl Serialize for Did {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Did {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Did::parse(&s).map_err(D::Error::custom)
    }
}

/// Derives the identifier of record for a commitment on a network.
///
/// Pure and deterministic: two independent calls with the same inputs
/// produce byte-identical strings, on any machine, forever.
pub fn generate_did(commitment: &AggregateCommitment, network: Network) -> Did {
    let mut hasher = Sha3_256::new();
    hasher.update(DID_PERSONALIZATION);
    hasher.update(commitment.as_bytes());
    hasher.update(network.as_str().as_bytes());
    let raw = hasher.finalize();

    Did::Deterministic {
        network,
        body: bs58::encode(raw).into_string(),
    }
}

/// Derives the old wallet-bound identifier form.
///
/// Different wallets derive different identifiers for the same person,
/// which defeats duplicate detection. Kept only so records written by old
/// deployments can be regenerated and checked.
#[deprecated(note = "wallet-bound identifiers are not Sybil resistant; read-only support")]
pub fn generate_legacy_did(wallet: &str, commitment: &AggregateCommitment) -> Result<Did> {
    if wallet.is_empty() || wallet.contains('#') || wallet.contains(':') {
        return Err(IdentityError::InvalidDid(
            "wallet address not usable in a legacy identifier".into(),
        ));
    }
    warn!(
        scheme = "wallet-bound",
        "deriving deprecated legacy identifier; not valid for new issuance"
    );

    let mut hasher = Sha3_256::new();
    hasher.update(LEGACY_PERSONALIZATION);
    hasher.update(wallet.as_bytes());
    hasher.update(commitment.as_bytes());
    let digest = hasher.finalize();

    Ok(Did::Legacy {
        wallet: wallet.to_string(),
        digest: hex::encode(&digest[..LEGACY_DIGEST_BYTES]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn commitment(seed: u64) -> AggregateCommitment {
        let mut hasher = Sha3_256::new();
        hasher.update(seed.to_le_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        AggregateCommitment::from_bytes(bytes)
    }

    #[test]
    fn test_did_is_deterministic() {
        let c = commitment(7);
        let a = generate_did(&c, Network::Testnet);
        let b = generate_did(&c, Network::Testnet);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_network_separates_identifier_spaces() {
        let c = commitment(7);
        assert_ne!(
            generate_did(&c, Network::Mainnet),
            generate_did(&c, Network::Testnet)
        );
    }

    #[test]
    fn test_no_collisions_over_many_commitments() {
        let mut seen = std::collections::HashSet::new();
        for seed in 0..10_000u64 {
            let did = generate_did(&commitment(seed), Network::Mainnet);
            assert!(seen.insert(did.to_string()), "collision at seed {}", seed);
        }
    }

    #[test]
    fn test_current_form_round_trips_through_parse() {
        let did = generate_did(&commitment(42), Network::Preprod);
        let rendered = did.to_string();
        assert!(rendered.starts_with("did:cardano:preprod:"));
        assert_eq!(Did::parse(&rendered).unwrap(), did);
    }

    #[test]
    #[allow(deprecated)]
    fn test_legacy_form_round_trips_and_is_wallet_bound() {
        let c = commitment(42);
        let a = generate_legacy_did("addr1walletA", &c).unwrap();
        let b = generate_legacy_did("addr1walletB", &c).unwrap();
        assert_ne!(a, b, "legacy identifiers are wallet-bound");
        assert!(a.is_legacy());

        let reparsed = Did::parse(&a.to_string()).unwrap();
        assert_eq!(reparsed, a);
    }

    #[test]
    fn test_current_form_is_wallet_independent() {
        // Two simulated controller wallets; identical biometric commitment.
        let c = commitment(42);
        let enrolled_from_wallet_a = generate_did(&c, Network::Mainnet);
        let enrolled_from_wallet_b = generate_did(&c, Network::Mainnet);
        assert_eq!(enrolled_from_wallet_a, enrolled_from_wallet_b);
    }

    #[test]
    fn test_parse_rejects_malformed_identifiers() {
        for bad in [
            "did:web:mainnet:abc",
            "did:cardano:moonnet:abc",
            "did:cardano:mainnet",
            "did:cardano:mainnet:0OIl", // not base58
            "did:cardano:mainnet:abc",  // wrong payload length
            "did:cardano:#deadbeef",
            "did:cardano:wallet#",
            "did:cardano:wallet#nothex!",
            "not-a-did",
        ] {
            assert!(Did::parse(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    #[allow(deprecated)]
    fn test_legacy_rejects_separator_characters_in_wallet() {
        let c = commitment(1);
        assert!(generate_legacy_did("", &c).is_err());
        assert!(generate_legacy_did("addr#1", &c).is_err());
        assert!(generate_legacy_did("addr:1", &c).is_err());
    }

    #[test]
    fn test_did_serde_round_trip() {
        let did = generate_did(&commitment(5), Network::Testnet);
        let json = serde_json::to_string(&did).unwrap();
        let back: Did = serde_json::from_str(&json).unwrap();
        assert_eq!(back, did);
    }

    proptest! {
        #[test]
        fn prop_generation_is_pure(bytes in proptest::array::uniform32(any::<u8>())) {
            let c = AggregateCommitment::from_bytes(bytes);
            let a = generate_did(&c, Network::Testnet);
            let b = generate_did(&c, Network::Testnet);
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(Did::parse(&a.to_string()).unwrap(), a);
        }
    }
}
