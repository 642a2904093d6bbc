use pretty_assertions::assert_eq;
use robot_core::{percent_of, JobEvent, ProgressState, Unit};

#[test]
fn percent_truncates_instead_of_rounding() {
    assert_eq!(percent_of(0, 0), 0);
    assert_eq!(percent_of(5, 0), 0);
    assert_eq!(percent_of(1, 3), 33);
    assert_eq!(percent_of(2, 3), 66);
    assert_eq!(percent_of(999, 1000), 99);
    assert_eq!(percent_of(u64::MAX, u64::MAX), 100);
}

#[test]
fn processed_without_total_keeps_percent_at_zero() {
    let mut progress = ProgressState::default();
    let events = progress.set_processed_amount(Unit::Bytes, 10);
    assert_eq!(
        events,
        vec![
            JobEvent::ProcessedAmount {
                unit: Unit::Bytes,
                amount: 10
            },
            JobEvent::ProcessedSize(10),
        ]
    );
    assert_eq!(progress.percent(), 0);
}

#[test]
fn percent_is_reported_only_when_it_changes() {
    let mut progress = ProgressState::new(Unit::Bytes);
    let events = progress.set_total_amount(Unit::Bytes, 300);
    assert_eq!(
        events,
        vec![
            JobEvent::TotalAmount {
                unit: Unit::Bytes,
                amount: 300
            },
            JobEvent::TotalSize(300),
        ]
    );

    let events = progress.set_processed_amount(Unit::Bytes, 100);
    assert_eq!(events.last(), Some(&JobEvent::Percent(33)));

    // 101/300 still truncates to 33: amount changes, percent does not.
    let events = progress.set_processed_amount(Unit::Bytes, 101);
    assert!(!events.iter().any(|e| matches!(e, JobEvent::Percent(_))));
    assert_eq!(progress.percent(), 33);
}

#[test]
fn unchanged_amounts_emit_nothing() {
    let mut progress = ProgressState::default();
    progress.set_total_amount(Unit::Files, 4);
    assert!(progress.set_total_amount(Unit::Files, 4).is_empty());
    assert!(progress.set_processed_amount(Unit::Files, 0).is_empty());
}

#[test]
fn other_units_do_not_drive_percent() {
    let mut progress = ProgressState::new(Unit::Bytes);
    progress.set_total_amount(Unit::Files, 2);
    let events = progress.set_processed_amount(Unit::Files, 1);
    assert_eq!(
        events,
        vec![JobEvent::ProcessedAmount {
            unit: Unit::Files,
            amount: 1
        }]
    );
    assert_eq!(progress.percent(), 0);
    assert_eq!(progress.processed_amount(Unit::Files), 1);
    assert_eq!(progress.total_amount(Unit::Files), 2);
    assert_eq!(progress.processed_amount(Unit::Other(7)), 0);
}

#[test]
fn changing_the_progress_unit_switches_the_percent_source() {
    let mut progress = ProgressState::new(Unit::Bytes);
    progress.set_progress_unit(Unit::Items);
    progress.set_total_amount(Unit::Items, 8);
    let events = progress.set_processed_amount(Unit::Items, 2);
    assert_eq!(events.last(), Some(&JobEvent::Percent(25)));
}

#[test]
fn zero_total_leaves_previous_percent() {
    let mut progress = ProgressState::new(Unit::Bytes);
    progress.set_total_amount(Unit::Bytes, 10);
    progress.set_processed_amount(Unit::Bytes, 5);
    assert_eq!(progress.percent(), 50);

    let events = progress.set_total_amount(Unit::Bytes, 0);
    assert!(!events.iter().any(|e| matches!(e, JobEvent::Percent(_))));
    assert_eq!(progress.percent(), 50);
}

#[test]
fn explicit_percent_dedupes() {
    let mut progress = ProgressState::default();
    assert_eq!(progress.set_percent(0), None);
    assert_eq!(progress.set_percent(42), Some(JobEvent::Percent(42)));
    assert_eq!(progress.set_percent(42), None);
}
