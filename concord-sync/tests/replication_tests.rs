mod common;

use common::{fast_config, init_tracing, replica, settle};
use concord_crdt::{CrdtError, Dot, SetOperation, VersionVector};
use concord_sync::{
    CommutativeGSet, CommutativeTwoPhaseSet, GCounter, GSet, LWWRegister, LocalDeliveryExchange,
    OperationMessage, PNCounter, ReplicationError, TwoPhaseSet, Updatable,
};
use pretty_assertions::assert_eq;
use std::time::Duration;

// ── Counters ─────────────────────────────────────────────────────

#[tokio::test]
async fn gcounters_converge_to_sum() {
    init_tracing();
    let exchange = LocalDeliveryExchange::new(fast_config());
    let c1 = GCounter::new(exchange.clone()).unwrap();
    let c2 = GCounter::new(exchange.clone()).unwrap();

    c1.increment().unwrap();
    c1.increment().unwrap();
    c2.increment().unwrap();
    settle(&[&c1, &c2]).await;

    assert_eq!(c1.value(), 3);
    assert_eq!(c2.value(), 3);
    assert_eq!(c1.version(), c2.version());
}

#[tokio::test]
async fn gcounter_manual_snapshot_exchange_in_either_order() {
    let exchange = LocalDeliveryExchange::new(fast_config());
    let a = GCounter::new(exchange.clone()).unwrap();
    let b = GCounter::new(exchange.clone()).unwrap();
    a.increment().unwrap();
    b.increment().unwrap();

    let (snap_a, snap_b) = (a.snapshot(), b.snapshot());
    b.update(&snap_a).unwrap();
    a.update(&snap_b).unwrap();
    // Redundant redelivery changes nothing
    a.update(&snap_b).unwrap();
    b.update(&snap_a).unwrap();

    assert_eq!(a.value(), 2);
    assert_eq!(a.snapshot().state(), b.snapshot().state());
    assert_eq!(a.version(), b.version());
}

#[tokio::test]
async fn stale_snapshot_is_a_no_op() {
    let exchange = LocalDeliveryExchange::new(fast_config());
    let a = GCounter::new(exchange.clone()).unwrap();
    let b = GCounter::new(exchange.clone()).unwrap();
    a.increment().unwrap();
    let old = a.snapshot();
    a.increment().unwrap();

    b.update(&a.snapshot()).unwrap();
    let before = b.snapshot();
    b.update(&old).unwrap();
    assert_eq!(b.snapshot(), before);
    assert_eq!(b.value(), 2);
}

#[tokio::test]
async fn pn_counters_converge() {
    init_tracing();
    let exchange = LocalDeliveryExchange::new(fast_config());
    let a = PNCounter::new(exchange.clone()).unwrap();
    let b = PNCounter::new(exchange.clone()).unwrap();
    let c = PNCounter::new(exchange.clone()).unwrap();

    a.increment().unwrap();
    a.increment().unwrap();
    b.decrement().unwrap();
    c.decrement().unwrap();
    c.decrement().unwrap();
    settle(&[&a, &b, &c]).await;

    for counter in [&a, &b, &c] {
        assert_eq!(counter.value(), -1);
    }
    assert_eq!(a.version(), c.version());
}

// ── Sets ─────────────────────────────────────────────────────────

#[tokio::test]
async fn gsets_union_concurrent_adds() {
    let exchange = LocalDeliveryExchange::new(fast_config());
    let a = GSet::new(exchange.clone()).unwrap();
    let b = GSet::new(exchange.clone()).unwrap();

    a.add("apple").unwrap();
    b.add_all(["banana", "cherry"]).unwrap();
    settle(&[&a, &b]).await;

    assert_eq!(a.elements(), vec!["apple", "banana", "cherry"]);
    assert_eq!(b.elements(), a.elements());
}

#[tokio::test]
async fn gset_remove_is_unsupported() {
    let exchange = LocalDeliveryExchange::new(fast_config());
    let a: std::sync::Arc<GSet<u32>> = GSet::new(exchange).unwrap();
    a.add(1).unwrap();
    let version = a.version();

    let err = a.remove(1).unwrap_err();
    assert!(matches!(err, ReplicationError::Crdt(CrdtError::Unsupported(_))));
    assert!(a.contains(&1));
    assert_eq!(a.version(), version);
}

#[tokio::test]
async fn commutative_gset_replicates_operations() {
    init_tracing();
    let exchange = LocalDeliveryExchange::new(fast_config());
    let a = CommutativeGSet::new(exchange.clone()).unwrap();
    let b = CommutativeGSet::new(exchange.clone()).unwrap();

    a.add(1u32).unwrap();
    a.add(2).unwrap();
    b.add_all([3, 4]).unwrap();
    settle(&[&a, &b]).await;

    assert_eq!(a.elements(), vec![1, 2, 3, 4]);
    assert_eq!(b.elements(), vec![1, 2, 3, 4]);
    assert_eq!(a.version(), b.version());

    let err = a.remove(1).unwrap_err();
    assert!(matches!(err, ReplicationError::Crdt(CrdtError::Unsupported(_))));
}

#[tokio::test]
async fn commutative_gset_remove_on_closed_channel_reports_closed() {
    let exchange = LocalDeliveryExchange::new(fast_config());
    let a = CommutativeGSet::<u32>::new(exchange).unwrap();
    a.close().await.unwrap();

    let err = a.remove(1).unwrap_err();
    assert!(matches!(err, ReplicationError::ChannelClosed));
}

#[tokio::test]
async fn two_phase_set_concurrent_add_and_remove_resolves_to_removed() {
    init_tracing();
    let exchange = LocalDeliveryExchange::new(fast_config());
    let a = TwoPhaseSet::new(exchange.clone()).unwrap();
    let b = TwoPhaseSet::new(exchange.clone()).unwrap();

    a.add("x").unwrap();
    b.remove("x").unwrap();
    settle(&[&a, &b]).await;

    assert!(!a.contains(&"x"));
    assert!(!b.contains(&"x"));
    assert_eq!(a.state(), b.state());
}

#[tokio::test]
async fn two_phase_set_rejects_readding_removed_elements() {
    let exchange = LocalDeliveryExchange::new(fast_config());
    let a = TwoPhaseSet::new(exchange).unwrap();
    a.add_all([1, 2]).unwrap();
    a.remove(2).unwrap();
    let version = a.version();

    let err = a.add_all([3, 2]).unwrap_err();
    match err {
        ReplicationError::Crdt(CrdtError::InsertionFailed { elements }) => {
            assert_eq!(elements, vec!["2".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    // All-or-nothing: 3 was not added and no event was recorded
    assert_eq!(a.elements(), vec![1]);
    assert_eq!(a.version(), version);
}

#[tokio::test]
async fn commutative_two_phase_set_remove_wins_in_either_order() {
    init_tracing();
    let exchange = LocalDeliveryExchange::new(fast_config());
    let a = CommutativeTwoPhaseSet::new(exchange.clone()).unwrap();
    let b = CommutativeTwoPhaseSet::new(exchange.clone()).unwrap();

    a.add_all(["x".to_string(), "y".to_string()]).unwrap();
    b.remove("x".to_string()).unwrap();
    settle(&[&a, &b]).await;

    assert_eq!(a.elements(), vec!["y".to_string()]);
    assert_eq!(b.elements(), vec!["y".to_string()]);
    assert!(b.add("x".to_string()).is_err());
}

// ── Register ─────────────────────────────────────────────────────

#[tokio::test]
async fn lww_register_later_write_wins() {
    init_tracing();
    let exchange = LocalDeliveryExchange::new(fast_config());
    let r1 = LWWRegister::new(exchange.clone()).unwrap();
    let r2 = LWWRegister::new(exchange.clone()).unwrap();

    r1.assign("a").unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;
    r2.assign("b").unwrap();
    settle(&[&r1, &r2]).await;

    assert_eq!(r1.get(), Some("b"));
    assert_eq!(r2.get(), Some("b"));
    assert_eq!(r1.writer(), Some(r2.id()));
    assert_eq!(r1.timestamp(), r2.timestamp());
}

#[tokio::test]
async fn lww_register_write_after_seeing_another_wins_immediately() {
    init_tracing();
    let exchange = LocalDeliveryExchange::new(fast_config());
    let r1 = LWWRegister::new(exchange.clone()).unwrap();
    let r2 = LWWRegister::new(exchange.clone()).unwrap();

    r1.assign("a").unwrap();
    settle(&[&r1, &r2]).await;
    let seen = r2.timestamp();
    r2.assign("b").unwrap();
    assert!(r2.timestamp() > seen);
    settle(&[&r1, &r2]).await;

    assert_eq!(r1.get(), Some("b"));
    assert_eq!(r2.get(), Some("b"));
}

#[tokio::test]
async fn three_lww_registers_converge_on_one_write() {
    init_tracing();
    let exchange = LocalDeliveryExchange::new(fast_config());
    let r1 = LWWRegister::new(exchange.clone()).unwrap();
    let r2 = LWWRegister::new(exchange.clone()).unwrap();
    let r3 = LWWRegister::new(exchange.clone()).unwrap();

    r1.assign("one").unwrap();
    settle(&[&r1, &r2, &r3]).await;
    // r2 writes on top of r1 while r3 writes concurrently.
    r2.assign("two").unwrap();
    r3.assign("three").unwrap();
    settle(&[&r1, &r2, &r3]).await;

    let winner = r1.get();
    assert!(winner == Some("two") || winner == Some("three"));
    for r in [&r2, &r3] {
        assert_eq!(r.get(), winner);
        assert_eq!(r.writer(), r1.writer());
        assert_eq!(r.timestamp(), r1.timestamp());
        assert_eq!(r.version(), r1.version());
    }
}

#[tokio::test]
async fn lww_register_same_replica_rewrites_have_increasing_timestamps() {
    let exchange = LocalDeliveryExchange::new(fast_config());
    let r = LWWRegister::new(exchange).unwrap();
    r.assign(1).unwrap();
    let first = r.timestamp();
    r.assign(2).unwrap();
    assert!(r.timestamp() > first);
    assert_eq!(r.get(), Some(2));
}

// ── Operation ordering ───────────────────────────────────────────

fn add_op(origin: u8, event: u64, element: u32) -> OperationMessage<SetOperation<u32>> {
    OperationMessage::new(Dot::new(replica(origin), event), SetOperation::Add(vec![element]))
}

#[tokio::test]
async fn out_of_order_operation_is_rejected_then_accepted() {
    let exchange = LocalDeliveryExchange::new(fast_config());
    let set = CommutativeGSet::new(exchange).unwrap();

    let err = set.update(&add_op(9, 2, 20)).unwrap_err();
    match err {
        ReplicationError::OutOfOrder {
            origin,
            expected,
            received,
        } => {
            assert_eq!(origin, replica(9));
            assert_eq!(expected, 1);
            assert_eq!(received, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(set.is_empty());

    set.update(&add_op(9, 1, 10)).unwrap();
    set.update(&add_op(9, 2, 20)).unwrap();
    assert_eq!(set.elements(), vec![10, 20]);
    assert_eq!(set.version().get(&replica(9)), 2);
}

#[tokio::test]
async fn redelivered_operation_is_applied_once() {
    let exchange = LocalDeliveryExchange::new(fast_config());
    let set = CommutativeTwoPhaseSet::new(exchange).unwrap();
    let remove = OperationMessage::new(Dot::new(replica(7), 1u64), SetOperation::Remove(vec![5u32]));

    set.update(&remove).unwrap();
    let state = set.state();
    set.update(&remove).unwrap();
    assert_eq!(set.state(), state);
    assert_eq!(set.version().get(&replica(7)), 1);
}

#[tokio::test]
async fn inbox_holds_premature_operations_until_predecessor_arrives() {
    init_tracing();
    let exchange = LocalDeliveryExchange::new(fast_config());
    let set = CommutativeGSet::new(exchange).unwrap();

    set.channel().receive(add_op(3, 3, 30)).unwrap();
    set.channel().receive(add_op(3, 2, 20)).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(set.is_empty(), "nothing applies before event 1 arrives");
    assert!(set.channel().has_pending_updates());

    set.channel().receive(add_op(3, 1, 10)).unwrap();
    common::within(set.channel().wait_for_updates()).await;
    assert_eq!(set.elements(), vec![10, 20, 30]);
    assert!(!set.channel().has_pending_updates());
}

#[tokio::test]
async fn replica_restored_from_state_keeps_id_and_version() {
    let exchange = LocalDeliveryExchange::new(fast_config());
    let version: VersionVector = [(replica(1), 4)].into_iter().collect();
    let counter = GCounter::with_state(
        exchange,
        Some(replica(1)),
        version.clone(),
        concord_crdt::GCounter::from_counts(version.clone()),
    )
    .unwrap();

    assert_eq!(counter.id(), replica(1));
    assert_eq!(counter.value(), 4);
    counter.increment().unwrap();
    assert_eq!(counter.version().get(&replica(1)), 5);
}
