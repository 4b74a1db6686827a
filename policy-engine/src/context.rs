//! Per-connection [`FilterContext`] (spec §3): the mutable state carried
//! alongside a connection across however many transactions it runs.
//!
//! The original's context also held a "pointer to the currently
//! suspended filter" and per-kind context slots for asynchronous
//! in-progress work (e.g. strlist's pending DNS results). In the
//! async/await realization those are folded into the suspended task's
//! own stack frame instead of an explicit field here — see DESIGN.md.

use policy_filters::Counters;

/// Carried by `policy-server` for the lifetime of one accepted
/// connection; reset whenever the MTA's `instance` attribute changes,
/// which marks the start of a new transaction sharing the same socket
/// (spec §3: "cleared when the MTA's `instance` attribute changes").
#[derive(Default)]
pub struct FilterContext {
    instance: Option<String>,
    pub counters: Counters,
    pub explanation: Option<String>,
}

impl FilterContext {
    pub fn new() -> FilterContext {
        FilterContext::default()
    }

    /// Called once per query with the MTA-supplied `instance` attribute.
    /// Resets the per-transaction state when it differs from the last
    /// one seen on this connection (spec §3 FilterContext lifecycle).
    pub fn begin_transaction(&mut self, instance: &str) {
        let changed = self.instance.as_deref() != Some(instance);
        if changed {
            self.counters.reset();
            self.explanation = None;
            self.instance = Some(instance.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_instance_keeps_counters() {
        let mut ctx = FilterContext::new();
        ctx.begin_transaction("abc123");
        ctx.counters.bump(0, 5);
        ctx.begin_transaction("abc123");
        assert_eq!(ctx.counters.get(0), 5);
    }

    #[test]
    fn new_instance_resets_counters_and_explanation() {
        let mut ctx = FilterContext::new();
        ctx.begin_transaction("abc123");
        ctx.counters.bump(0, 5);
        ctx.explanation = Some("spf fail".to_string());
        ctx.begin_transaction("def456");
        assert_eq!(ctx.counters.get(0), 0);
        assert_eq!(ctx.explanation, None);
    }

    #[test]
    fn first_transaction_on_a_fresh_connection_is_a_change() {
        let mut ctx = FilterContext::new();
        assert_eq!(ctx.instance, None);
        ctx.begin_transaction("first");
        assert_eq!(ctx.instance.as_deref(), Some("first"));
    }
}
