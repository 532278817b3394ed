use crate::compute_local_key;
use crate::test_utils::enable_logger;
use crate::test_utils::sample_info;
use crate::FeatureInfo;
use crate::HashScheme;
use crate::Identity;
use crate::Presence;

const NODE_BASE: &str = "https://example.org/client";

#[test]
fn test_canonical_bytes_ignore_identity_order() {
    enable_logger();
    let id_a = Identity {
        category: "client".to_string(),
        type_: "pc".to_string(),
        lang: None,
        name: None,
    };
    let id_b = Identity {
        category: "client".to_string(),
        type_: "web".to_string(),
        lang: None,
        name: None,
    };

    let forward = FeatureInfo {
        identities: vec![id_a.clone(), id_b.clone()],
        features: Default::default(),
    };
    let backward = FeatureInfo {
        identities: vec![id_b, id_a],
        features: Default::default(),
    };

    assert_eq!(forward.canonical_bytes(), backward.canonical_bytes());
}

#[test]
fn test_canonical_bytes_distinguish_field_boundaries() {
    let a = FeatureInfo {
        identities: vec![],
        features: ["ab".to_string(), "c".to_string()].into(),
    };
    let b = FeatureInfo {
        identities: vec![],
        features: ["a".to_string(), "bc".to_string()].into(),
    };

    assert_ne!(a.canonical_bytes(), b.canonical_bytes());
}

#[test]
fn test_put_then_extract_roundtrips_keys() {
    let info = sample_info();
    let key = compute_local_key(HashScheme::Sha256, &info, NODE_BASE);

    let mut presence = Presence::available("peer@example.org");
    presence.put_keys([&key], NODE_BASE);

    let extracted = presence.extract_keys(HashScheme::Sha256);
    assert_eq!(vec![key], extracted);
}

#[test]
fn test_extract_keys_filters_by_scheme() {
    let info = sample_info();
    let sha256 = compute_local_key(HashScheme::Sha256, &info, NODE_BASE);
    let sha512 = compute_local_key(HashScheme::Sha512, &info, NODE_BASE);

    let mut presence = Presence::available("peer@example.org");
    presence.put_keys([&sha256, &sha512], NODE_BASE);

    assert_eq!(vec![sha512], presence.extract_keys(HashScheme::Sha512));
    assert_eq!(vec![sha256], presence.extract_keys(HashScheme::Sha256));
}

#[test]
fn test_extract_keys_empty_presence() {
    let presence = Presence::available("peer@example.org");
    assert!(presence.extract_keys(HashScheme::Sha256).is_empty());
}
