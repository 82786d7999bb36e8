//! Navigation metrics.
//!
//! # Metrics
//! - `statenav_transitions_total` (counter): transitions by outcome
//!   (`committed`, `cancelled`, `unchanged`)
//! - `statenav_interceptor_runs_total` (counter): pipelines that ran interceptors
//! - `statenav_interceptors_invoked_total` (counter): interceptors scheduled
//! - `statenav_unknown_addresses_total` (counter): addresses no route matched
//! - `statenav_propagation_dead_ends_total` (counter): branches no child claimed

use metrics::counter;

pub fn record_transition(outcome: &'static str) {
    counter!("statenav_transitions_total", "outcome" => outcome).increment(1);
}

pub fn record_interceptor_run(count: usize) {
    counter!("statenav_interceptor_runs_total").increment(1);
    counter!("statenav_interceptors_invoked_total").increment(count as u64);
}

pub fn record_unknown_address() {
    counter!("statenav_unknown_addresses_total").increment(1);
}

pub fn record_dead_end() {
    counter!("statenav_propagation_dead_ends_total").increment(1);
}
