use concord_types::{IdentifierFactory, ReplicaId, UuidIdentifierFactory};
use std::collections::HashSet;
use std::str::FromStr;

// ── ReplicaId ─────────────────────────────────────────────────────

#[test]
fn replica_id_new_is_unique() {
    let a = ReplicaId::new();
    let b = ReplicaId::new();
    assert_ne!(a, b);
}

#[test]
fn replica_id_from_uuid_roundtrip() {
    let uuid = uuid::Uuid::now_v7();
    let id = ReplicaId::from_uuid(uuid);
    assert_eq!(id.as_uuid(), uuid);
}

#[test]
fn replica_id_display_and_parse() {
    let id = ReplicaId::new();
    let parsed = ReplicaId::parse(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn replica_id_from_str() {
    let id = ReplicaId::new();
    let parsed = ReplicaId::from_str(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn replica_id_parse_invalid() {
    assert!(ReplicaId::parse("not-a-uuid").is_err());
    assert!(ReplicaId::from_str("garbage").is_err());
}

#[test]
fn replica_id_orders_by_uuid() {
    let low = ReplicaId::from_uuid(uuid::Uuid::from_u128(1));
    let high = ReplicaId::from_uuid(uuid::Uuid::from_u128(2));
    assert!(low < high);
}

#[test]
fn replica_id_hash_and_eq() {
    let id = ReplicaId::new();
    let mut set = HashSet::new();
    set.insert(id);
    set.insert(id);
    assert_eq!(set.len(), 1);
}

#[test]
fn replica_id_serializes_as_plain_string() {
    let id = ReplicaId::new();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{id}\""));
    let parsed: ReplicaId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, parsed);
}

// ── IdentifierFactory ─────────────────────────────────────────────

#[test]
fn uuid_factory_never_repeats() {
    let factory = UuidIdentifierFactory;
    let ids: HashSet<ReplicaId> = (0..1_000).map(|_| factory.create()).collect();
    assert_eq!(ids.len(), 1_000);
}

#[test]
fn factory_is_object_safe() {
    let factory: Box<dyn IdentifierFactory<ReplicaId>> = Box::new(UuidIdentifierFactory);
    assert_ne!(factory.create(), factory.create());
}
