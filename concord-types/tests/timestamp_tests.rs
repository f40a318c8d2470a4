use concord_types::UtcTimestamp;
use proptest::prelude::*;

// ── Construction ─────────────────────────────────────────────────

#[test]
fn now_is_after_epoch() {
    assert!(UtcTimestamp::now() > UtcTimestamp::EPOCH);
}

#[test]
fn default_is_epoch() {
    assert_eq!(UtcTimestamp::default(), UtcTimestamp::EPOCH);
}

#[test]
fn millis_roundtrip() {
    let ts = UtcTimestamp::from_millis(1_700_000_000_123);
    assert_eq!(ts.as_millis(), 1_700_000_000_123);
}

#[test]
fn converts_to_datetime() {
    let ts = UtcTimestamp::from_millis(1_000);
    let dt = ts.to_datetime().unwrap();
    assert_eq!(dt.timestamp_millis(), 1_000);
    assert_eq!(UtcTimestamp::from(dt), ts);
}

#[test]
fn out_of_range_datetime_is_an_error() {
    assert!(UtcTimestamp::from_millis(i64::MAX).to_datetime().is_err());
}

#[test]
fn display_is_rfc3339() {
    let ts = UtcTimestamp::EPOCH;
    assert_eq!(ts.to_string(), "1970-01-01T00:00:00+00:00");
}

// ── Strict succession ────────────────────────────────────────────

#[test]
fn after_current_millisecond_waits_for_the_clock() {
    let now = UtcTimestamp::now();
    let next = UtcTimestamp::after(now);
    assert!(next > now);
}

#[test]
fn after_future_stamp_bumps_logically() {
    let future = UtcTimestamp::from_millis(UtcTimestamp::now().as_millis() + 60_000);
    let next = UtcTimestamp::after(future);
    assert_eq!(next.as_millis(), future.as_millis() + 1);
}

#[test]
fn next_millis_steps_one_and_saturates() {
    assert_eq!(UtcTimestamp::from_millis(7).next_millis().as_millis(), 8);
    let max = UtcTimestamp::from_millis(i64::MAX);
    assert_eq!(max.next_millis(), max);
}

#[test]
fn serialization_roundtrip() {
    let ts = UtcTimestamp::now();
    let json = serde_json::to_string(&ts).unwrap();
    let parsed: UtcTimestamp = serde_json::from_str(&json).unwrap();
    assert_eq!(ts, parsed);
}

proptest! {
    #[test]
    fn ordering_matches_millis(a in 0i64..1_000_000_000, b in 0i64..1_000_000_000) {
        let ta = UtcTimestamp::from_millis(a);
        let tb = UtcTimestamp::from_millis(b);
        prop_assert_eq!(ta.cmp(&tb), a.cmp(&b));
    }
}
