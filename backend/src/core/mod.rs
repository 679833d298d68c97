//! Core primitives shared by every component

pub mod time;

pub use time::{Day, SimClock};
