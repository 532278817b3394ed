use std::fmt::Display;
use std::path::PathBuf;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::Digest;
use sha2::Sha256;
use sha2::Sha512;

use crate::FeatureInfo;

/// Verification scheme behind a capability key.
///
/// Each scheme is independently toggleable at runtime. Candidate extraction
/// from inbound presence honors [`HashScheme::PREFERENCE_ORDER`], strongest
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HashScheme {
    Sha256,
    Sha512,
}

impl HashScheme {
    /// Candidate preference order for inbound resolution
    pub const PREFERENCE_ORDER: [HashScheme; 2] = [HashScheme::Sha512, HashScheme::Sha256];

    fn digest(
        &self,
        input: &[u8],
    ) -> Vec<u8> {
        match self {
            HashScheme::Sha256 => Sha256::digest(input).to_vec(),
            HashScheme::Sha512 => Sha512::digest(input).to_vec(),
        }
    }
}

impl Display for HashScheme {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            HashScheme::Sha256 => write!(f, "sha-256"),
            HashScheme::Sha512 => write!(f, "sha-512"),
        }
    }
}

/// Identifier for one verified capability advertisement.
///
/// Immutable after construction; equality, hashing and ordering cover all
/// three fields. The node locator doubles as the advertisement endpoint
/// address a peer queries to fetch the full feature description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CapsKey {
    scheme: HashScheme,
    hash: Vec<u8>,
    node: String,
}

impl CapsKey {
    pub fn new(
        scheme: HashScheme,
        hash: Vec<u8>,
        node_base: &str,
    ) -> Self {
        let node = node_locator(node_base, scheme, &hash);
        Self { scheme, hash, node }
    }

    pub fn scheme(&self) -> HashScheme {
        self.scheme
    }

    pub fn hash(&self) -> &[u8] {
        &self.hash
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    /// Recompute the hash over `candidate` and compare against this key.
    ///
    /// Used to validate that a peer's claimed capability key actually
    /// matches the feature description it returned.
    pub fn verify(
        &self,
        candidate: &FeatureInfo,
    ) -> bool {
        self.scheme.digest(&candidate.canonical_bytes()) == self.hash
    }

    /// Deterministic relative path of this key inside a store directory:
    /// `{scheme}_{url-safe-escaped node}.caps`. Used by both disk tiers.
    pub fn store_path(&self) -> PathBuf {
        PathBuf::from(format!(
            "{}_{}.caps",
            self.scheme,
            URL_SAFE_NO_PAD.encode(&self.node)
        ))
    }
}

impl Display for CapsKey {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}:{}", self.scheme, URL_SAFE_NO_PAD.encode(&self.hash))
    }
}

/// Compute the local capability key for `scheme` over the currently
/// advertised feature description. Pure function; one key per scheme.
pub fn compute_local_key(
    scheme: HashScheme,
    info: &FeatureInfo,
    node_base: &str,
) -> CapsKey {
    let hash = scheme.digest(&info.canonical_bytes());
    let node = node_locator(node_base, scheme, &hash);
    CapsKey { scheme, hash, node }
}

fn node_locator(
    node_base: &str,
    scheme: HashScheme,
    hash: &[u8],
) -> String {
    format!("{}#{}.{}", node_base, scheme, URL_SAFE_NO_PAD.encode(hash))
}
