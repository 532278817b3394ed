use std::collections::BTreeSet;
use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;

use crate::CapsKey;
use crate::HashScheme;

/// Bare peer address, opaque to this crate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(pub String);

impl Display for PeerId {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One identity row of a feature description
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    pub category: String,
    pub type_: String,
    pub lang: Option<String>,
    pub name: Option<String>,
}

/// Feature description of a peer (or of the local client): the payload a
/// capability key commits to. Serializable so entries can be captured as
/// bytes at receipt and replayed verbatim to durable storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureInfo {
    pub identities: Vec<Identity>,
    pub features: BTreeSet<String>,
}

impl FeatureInfo {
    /// Deterministic rendering hashed by every [`HashScheme`]: sorted
    /// identity rows, then the sorted feature set, each field terminated so
    /// that no two distinct descriptions collapse to the same byte string.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut identities: Vec<&Identity> = self.identities.iter().collect();
        identities.sort();

        let mut out = Vec::new();
        for identity in identities {
            out.extend_from_slice(identity.category.as_bytes());
            out.push(b'/');
            out.extend_from_slice(identity.type_.as_bytes());
            out.push(b'/');
            if let Some(lang) = &identity.lang {
                out.extend_from_slice(lang.as_bytes());
            }
            out.push(b'/');
            if let Some(name) = &identity.name {
                out.extend_from_slice(name.as_bytes());
            }
            out.push(b'<');
        }
        for feature in &self.features {
            out.extend_from_slice(feature.as_bytes());
            out.push(b'<');
        }
        out
    }
}

/// Capability wire marker attached to available presence: the claimed hash
/// for one scheme, plus the node base under which the advertiser mounts its
/// endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapsAd {
    pub scheme: HashScheme,
    pub hash: Vec<u8>,
    pub node_base: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceType {
    Available,
    Unavailable,
    Error,
}

/// Boundary projection of a presence stanza: only the fields the
/// negotiation engine reads or writes. The full stanza model and its
/// serialization live outside this crate.
#[derive(Debug, Clone)]
pub struct Presence {
    pub from: PeerId,
    pub type_: PresenceType,
    pub caps: Vec<CapsAd>,
}

impl Presence {
    pub fn available(from: impl Into<String>) -> Self {
        Self {
            from: PeerId(from.into()),
            type_: PresenceType::Available,
            caps: Vec::new(),
        }
    }

    /// Candidate keys claimed for `scheme`, in wire order
    pub fn extract_keys(
        &self,
        scheme: HashScheme,
    ) -> Vec<CapsKey> {
        self.caps
            .iter()
            .filter(|ad| ad.scheme == scheme)
            .map(|ad| CapsKey::new(scheme, ad.hash.clone(), &ad.node_base))
            .collect()
    }

    /// Attach one wire marker per advertised key
    pub fn put_keys<'a>(
        &mut self,
        keys: impl IntoIterator<Item = &'a CapsKey>,
        node_base: &str,
    ) {
        for key in keys {
            self.caps.push(CapsAd {
                scheme: key.scheme(),
                hash: key.hash().to_vec(),
                node_base: node_base.to_string(),
            });
        }
    }
}
