use super::*;
use std::sync::Arc;

fn record(code: &str, active: bool, used: u64, max: u64) -> AccessCodeRecord {
    AccessCodeRecord {
        code: code.to_owned(),
        active,
        used_count: used,
        max_uses: max,
        client_name: "Ana".to_owned(),
        event_name: "Wedding".to_owned(),
        last_used_at_ms: None,
    }
}

#[test]
fn codes_are_trimmed_and_uppercased() {
    assert_eq!(normalize_code("  abc123 ").unwrap(), "ABC123");
    assert_eq!(normalize_code("A1B2C3D4E5F6G7H8").unwrap(), "A1B2C3D4E5F6G7H8");
}

#[test]
fn malformed_codes_are_rejected() {
    for bad in ["", "ABC12", "A1B2C3D4E5F6G7H8I", "ABC-123", "ÄBC123", "abc 123"] {
        assert_eq!(normalize_code(bad), Err(AccessError::InvalidFormat), "{bad:?}");
    }
}

#[test]
fn redemption_increments_and_reports_the_grant() {
    let store = InMemoryCodeStore::new([record("abc123", true, 0, 2)]);
    let grant = store.validate_and_consume("abc123").unwrap();
    assert_eq!(grant.code, "ABC123");
    assert_eq!(grant.used_count, 1);
    assert_eq!(grant.max_uses, 2);
    assert_eq!(grant.client_name, "Ana");

    let rec = store.get("ABC123").unwrap();
    assert_eq!(rec.used_count, 1);
    assert!(rec.last_used_at_ms.is_some());
}

#[test]
fn usage_cap_is_enforced() {
    let store = InMemoryCodeStore::new([record("ABC123", true, 0, 2)]);
    assert!(store.validate_and_consume("ABC123").is_ok());
    assert!(store.validate_and_consume("ABC123").is_ok());
    assert_eq!(
        store.validate_and_consume("ABC123"),
        Err(AccessError::UsageCapReached)
    );
    assert_eq!(store.get("ABC123").unwrap().used_count, 2);
}

#[test]
fn unknown_and_inactive_codes_are_rejected_without_consuming() {
    let store = InMemoryCodeStore::new([record("OFF999", false, 0, 5)]);
    assert_eq!(
        store.validate_and_consume("NOPE123"),
        Err(AccessError::NotFound)
    );
    assert_eq!(
        store.validate_and_consume("off999"),
        Err(AccessError::Inactive)
    );
    assert_eq!(store.get("OFF999").unwrap().used_count, 0);
}

#[test]
fn json_records_fill_in_defaults() {
    let store = InMemoryCodeStore::from_json(
        r#"[{"code":"party01","active":true},{"code":"bad"},{"code":"LOCKED1"}]"#,
    )
    .unwrap();
    let rec = store.get("PARTY01").unwrap();
    assert_eq!(rec.used_count, 0);
    assert_eq!(rec.max_uses, DEFAULT_MAX_USES);
    assert!(store.get("bad").is_none());
    assert!(!store.get("LOCKED1").unwrap().active);

    store.validate_and_consume("PARTY01").unwrap();
    let reloaded = InMemoryCodeStore::from_json(&store.to_json().unwrap()).unwrap();
    assert_eq!(reloaded.get("PARTY01").unwrap().used_count, 1);
}

#[test]
fn concurrent_redemptions_never_exceed_the_cap() {
    let store = Arc::new(InMemoryCodeStore::new([record("RACE01", true, 0, 5)]));
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || store.validate_and_consume("RACE01").is_ok())
        })
        .collect();
    let wins = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(wins, 5);
    assert_eq!(store.get("RACE01").unwrap().used_count, 5);
}

#[test]
fn pass_expires_after_the_session_window() {
    let store = InMemoryCodeStore::new([record("ABC123", true, 0, 3)]);
    let now = 1_700_000_000_000;
    let pass = redeem(&store, "abc123", now).unwrap();
    let window = ACCESS_SESSION_HOURS * 60 * 60 * 1000;

    assert!(pass.is_unlocked_at(now));
    assert!(pass.is_unlocked_at(now + window - 1));
    assert!(!pass.is_unlocked_at(now + window));
    assert_eq!(pass.remaining_ms(now + 1000), window - 1000);
    assert_eq!(pass.remaining_ms(now + window + 5), 0);
}

#[test]
fn error_messages_are_user_facing() {
    assert_eq!(AccessError::NotFound.to_string(), "Code not found.");
    assert_eq!(AccessError::Inactive.to_string(), "Code is inactive.");
}
