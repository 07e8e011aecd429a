#![allow(dead_code)]

pub mod concurrent;
pub mod delay;
pub mod digital;

use std::time::Duration;

/// Returns a `time_fn` / `elapsed_since_fn` pair backed by the named fake clock, which counts
/// microseconds.
pub fn clock(name: &'static str) -> (impl Fn() -> u64, impl Fn(u64) -> Duration) {
    (
        move || concurrent::get_named_value(name),
        move |start: u64| {
            Duration::from_micros(concurrent::get_named_value(name).saturating_sub(start))
        },
    )
}

/// Moves the named fake clock forward.
pub fn advance(name: &'static str, duration: Duration) {
    concurrent::add_to_named_value(name, duration.as_micros() as u64);
}
