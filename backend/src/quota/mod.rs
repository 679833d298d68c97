//! Admission control: per-group tallies and promotion/demotion decisions

pub mod controller;

pub use controller::{Candidate, GroupDecision, GroupTally, QuotaController};
