//! Usage prefix index tests
//!
//! Exhaustion-day lookups drive every limiter date, so these cover the
//! boundary cases: zero budgets, budgets landing exactly on a day, budgets
//! that outlast the horizon and rows with idle days.

use fleet_simulator_core_rs::models::{UsagePrefixIndex, ZERO_ROW};
use fleet_simulator_core_rs::schedule::ScheduleError;

fn index_with(daily: &[u64]) -> (UsagePrefixIndex, usize) {
    let mut index = UsagePrefixIndex::new(daily.len() as u32);
    let row = index.insert_group_row(1, daily).unwrap();
    (index, row)
}

#[test]
fn test_constant_usage_exhausts_on_exact_day() {
    let (index, row) = index_with(&[100; 30]);

    // 500 at 100/day starting at day 0 -> boundary 5
    assert_eq!(index.exhaustion_day(row, 0, 500), 5);
    // Starting later shifts the day
    assert_eq!(index.exhaustion_day(row, 12, 500), 17);
    // One unit over needs one more day
    assert_eq!(index.exhaustion_day(row, 0, 501), 6);
}

#[test]
fn test_zero_budget_exhausts_immediately() {
    let (index, row) = index_with(&[100; 10]);
    assert_eq!(index.exhaustion_day(row, 4, 0), 4);
}

#[test]
fn test_budget_beyond_horizon_returns_horizon() {
    let (index, row) = index_with(&[100; 10]);
    assert_eq!(index.exhaustion_day(row, 0, 1_001), 10);
    assert_eq!(index.exhaustion_day(row, 0, u64::MAX), 10);
}

#[test]
fn test_idle_days_are_skipped() {
    let (index, row) = index_with(&[0, 0, 50, 0, 50, 0, 100, 0]);

    assert_eq!(index.exhaustion_day(row, 0, 100), 5);
    assert_eq!(index.exhaustion_day(row, 3, 100), 7);
    assert_eq!(index.usage_between(row, 0, 8), 200);
    assert_eq!(index.usage_between(row, 2, 5), 100);
    assert_eq!(index.daily(row, 6), 100);
}

#[test]
fn test_zero_row_never_accrues() {
    let (index, _) = index_with(&[10; 5]);
    assert_eq!(index.usage_between(ZERO_ROW, 0, 5), 0);
    assert_eq!(index.exhaustion_day(ZERO_ROW, 0, 1), 5);
}

#[test]
fn test_entity_row_takes_precedence_over_group_row() {
    let mut index = UsagePrefixIndex::new(4);
    let group_row = index.insert_group_row(1, &[10; 4]).unwrap();
    let entity_row = index.insert_entity_row(7, &[1, 2, 3, 4]).unwrap();

    assert_eq!(index.row_for(7, 1), Some(entity_row));
    assert_eq!(index.row_for(8, 1), Some(group_row));
    assert_eq!(index.row_for(8, 2), None);
    assert_eq!(index.cumulative(entity_row, 4), 10);
}

#[test]
fn test_wrong_arity_is_rejected() {
    let mut index = UsagePrefixIndex::new(5);
    let err = index.insert_entity_row(3, &[1, 2, 3]).unwrap_err();
    assert!(matches!(
        err,
        ScheduleError::Arity {
            expected: 5,
            actual: 3,
            ..
        }
    ));
}
