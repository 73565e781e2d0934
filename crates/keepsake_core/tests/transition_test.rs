use chrono::{Duration, TimeZone, Utc};
use keepsake_core::{
    AcquiredAttrs, CompressionTier, Failure, MediaRecord, Mutation, ReplicaPolicy, Stage,
};

fn policy() -> ReplicaPolicy {
    ReplicaPolicy::new("nas", "pixel")
}

fn acquired() -> MediaRecord {
    let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let attrs = AcquiredAttrs::new("/media/photo123.jpg", 2_000, created);
    MediaRecord::acquired("r1", "photo123", &attrs, created + Duration::days(1))
}

#[test]
fn acquired_record_starts_clean() {
    let record = acquired();
    assert_eq!(record.stage(), &Stage::Acquired);
    assert_eq!(record.byte_size_original(), record.byte_size_current());
    assert!(record.replica_flags().is_empty());
    assert!(record.local_path().is_some());
}

#[test]
fn replication_order_does_not_matter() {
    let now = Utc::now();
    let p = policy();

    let a_first = acquired()
        .transition(&Mutation::advance_to(Stage::ReplicatedA).with_replica("nas"), &p, now)
        .unwrap()
        .transition(&Mutation::advance_to(Stage::ReplicatedBoth).with_replica("pixel"), &p, now)
        .unwrap();

    let b_first = acquired()
        .transition(&Mutation::advance_to(Stage::ReplicatedB).with_replica("pixel"), &p, now)
        .unwrap()
        .transition(&Mutation::advance_to(Stage::ReplicatedBoth).with_replica("nas"), &p, now)
        .unwrap();

    assert_eq!(a_first.stage(), &Stage::ReplicatedBoth);
    assert_eq!(a_first.replica_flags(), b_first.replica_flags());
}

#[test]
fn flags_must_justify_replication_stage() {
    let now = Utc::now();
    let record = acquired();

    let wrong_flag = Mutation::advance_to(Stage::ReplicatedA).with_replica("pixel");
    assert!(record.transition(&wrong_flag, &policy(), now).is_err());

    let no_flag = Mutation::advance_to(Stage::ReplicatedBoth);
    assert!(record.transition(&no_flag, &policy(), now).is_err());

    let unknown = Mutation::advance_to(Stage::ReplicatedA).with_replica("usb");
    assert!(record.transition(&unknown, &policy(), now).is_err());
}

#[test]
fn cannot_skip_compression_or_staging() {
    let now = Utc::now();
    let p = policy();
    let both = acquired()
        .transition(&Mutation::advance_to(Stage::ReplicatedA).with_replica("nas"), &p, now)
        .unwrap()
        .transition(&Mutation::advance_to(Stage::ReplicatedBoth).with_replica("pixel"), &p, now)
        .unwrap();

    let to_staged = Mutation::advance_to(Stage::RetirementStaged).with_deletion_token("t");
    assert!(both.transition(&to_staged, &p, now).is_err());
    assert!(both.transition(&Mutation::advance_to(Stage::Retired), &p, now).is_err());
}

#[test]
fn stage_never_regresses() {
    let now = Utc::now();
    let p = policy();
    let both = acquired()
        .transition(&Mutation::advance_to(Stage::ReplicatedB).with_replica("pixel"), &p, now)
        .unwrap()
        .transition(&Mutation::advance_to(Stage::ReplicatedBoth).with_replica("nas"), &p, now)
        .unwrap();

    for target in [Stage::Acquired, Stage::ReplicatedA, Stage::ReplicatedB] {
        let mutation = Mutation::advance_to(target).with_replica("nas");
        assert!(both.transition(&mutation, &p, now).is_err(), "{target}");
    }
}

#[test]
fn full_lifecycle_releases_local_file() {
    let now = Utc::now();
    let p = policy();
    let retired = acquired()
        .transition(&Mutation::advance_to(Stage::ReplicatedA).with_replica("nas"), &p, now)
        .unwrap()
        .transition(&Mutation::advance_to(Stage::ReplicatedBoth).with_replica("pixel"), &p, now)
        .unwrap()
        .transition(
            &Mutation::advance_to(Stage::Compressed)
                .with_compression_tier(CompressionTier::Light)
                .with_byte_size_current(900),
            &p,
            now,
        )
        .unwrap()
        .transition(
            &Mutation::advance_to(Stage::RetirementStaged).with_deletion_token("tok-1"),
            &p,
            now,
        )
        .unwrap()
        .transition(&Mutation::advance_to(Stage::Retired), &p, now)
        .unwrap();

    assert_eq!(retired.stage(), &Stage::Retired);
    assert!(retired.local_path().is_none());
    assert_eq!(retired.deletion_token().as_deref(), Some("tok-1"));
    assert_eq!(retired.compression_tier(), &Some(CompressionTier::Light));
    assert_eq!(retired.bytes_saved(), 1_100);
    assert!(p.is_satisfied_by(retired.replica_flags()));
}

#[test]
fn compression_requires_tier_and_staging_requires_token() {
    let now = Utc::now();
    let p = policy();
    let both = acquired()
        .transition(&Mutation::advance_to(Stage::ReplicatedA).with_replica("nas"), &p, now)
        .unwrap()
        .transition(&Mutation::advance_to(Stage::ReplicatedBoth).with_replica("pixel"), &p, now)
        .unwrap();
    assert!(both.transition(&Mutation::advance_to(Stage::Compressed), &p, now).is_err());

    let compressed = both
        .transition(
            &Mutation::advance_to(Stage::Compressed).with_compression_tier(CompressionTier::Heavy),
            &p,
            now,
        )
        .unwrap();
    assert!(
        compressed
            .transition(&Mutation::advance_to(Stage::RetirementStaged), &p, now)
            .is_err()
    );
}

#[test]
fn success_resets_consecutive_failures() {
    let now = Utc::now();
    let failed = acquired()
        .with_failure(&Failure::transient("timeout"), 5, now)
        .with_failure(&Failure::transient("timeout"), 5, now);
    assert_eq!(*failed.error_count(), 2);
    assert!(!failed.quarantined());

    let advanced = failed
        .transition(&Mutation::advance_to(Stage::ReplicatedA).with_replica("nas"), &policy(), now)
        .unwrap();
    assert_eq!(*advanced.error_count(), 0);
    assert_eq!(advanced.last_error().as_deref(), Some("timeout"));
}

#[test]
fn failures_quarantine_at_threshold_or_when_permanent() {
    let now = Utc::now();
    let mut record = acquired();
    for _ in 0..2 {
        record = record.with_failure(&Failure::transient("flaky"), 3, now);
        assert!(!record.quarantined());
    }
    record = record.with_failure(&Failure::transient("flaky"), 3, now);
    assert!(record.quarantined());
    assert_eq!(record.stage(), &Stage::Acquired);

    let permanent = acquired().with_failure(&Failure::permanent("not found"), 3, now);
    assert!(permanent.quarantined());
    assert_eq!(*permanent.error_count(), 1);

    let released = permanent.released(now);
    assert!(!released.quarantined());
    assert_eq!(*released.error_count(), 0);
    assert_eq!(released.last_error().as_deref(), Some("not found"));
}
