//! Entity lifecycle: transition rules, accrual and repair handling

pub mod repair;
pub mod transitions;

pub use transitions::{Accrual, Action, StateMachine, Verdict};
