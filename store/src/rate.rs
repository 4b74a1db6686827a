//! Sliding-window rate counter store (spec §4.8, supplement 6: "the fixed
//! upper bound of 128 16-bit saturating slot counters is an actual array
//! bound in `RateState`, not an unbounded `Vec`").

use serde::{Deserialize, Serialize};

use crate::{decode, encode, Store, StoreError};

/// The fixed upper bound on window slots (spec §4.8).
pub const MAX_SLOTS: usize = 128;

#[derive(Clone, Serialize, Deserialize)]
struct RateState {
    /// Epoch second covered by `slots[0]`.
    start: i64,
    slots: [u16; MAX_SLOTS],
}

impl RateState {
    fn fresh(now: i64, len: usize) -> RateState {
        RateState {
            start: now - (len as i64 - 1),
            slots: [0; MAX_SLOTS],
        }
    }

    /// Advances the window so that `slots[len - 1]` covers `now`,
    /// zeroing every slot that ages out (spec §4.8: "slots older than
    /// `now - delay` are advanced out").
    fn advance(&mut self, now: i64, len: usize) {
        let newest_covered = self.start + len as i64 - 1;
        let elapsed = now - newest_covered;
        if elapsed <= 0 {
            return;
        }
        let shift = (elapsed as usize).min(len);
        self.slots.copy_within(shift..len, 0);
        for s in &mut self.slots[len - shift..len] {
            *s = 0;
        }
        self.start += shift as i64;
    }

    fn sum(&self, len: usize) -> u32 {
        self.slots[..len].iter().map(|&s| u32::from(s)).sum()
    }
}

/// The persistent backing for one `rate` filter instance.
pub struct RateStore {
    store: Store,
}

impl RateStore {
    pub fn new(store: Store) -> RateStore {
        RateStore { store }
    }

    /// Registers one hit against `key`'s window and returns the sum
    /// across the window before and after this hit, so the caller (the
    /// `rate` filter kind) can tell a threshold-crossing hit (`*_start`)
    /// from a subsequent one (spec §4.8).
    pub fn hit(&self, now: i64, key: &str, window_seconds: i64, key_namespace: &str) -> Result<(u32, u32), StoreError> {
        let len = (window_seconds.max(1) as usize).min(MAX_SLOTS);
        let full_key = format!("{}\0{}", key_namespace, key);
        let mut state: RateState = match self.store.get(full_key.as_bytes())? {
            Some(bytes) => decode(&bytes)?,
            None => RateState::fresh(now, len),
        };
        state.advance(now, len);
        let before = state.sum(len);
        let idx = len - 1;
        state.slots[idx] = state.slots[idx].saturating_add(1);
        let after = state.sum(len);
        self.store.put(full_key.as_bytes(), &encode(&state)?)?;
        Ok((before, after))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_hits_in_ten_seconds_cross_both_thresholds() {
        // Mirrors spec §8 scenario 5: delay=60, soft=3, hard=5.
        let rate = RateStore::new(Store::temporary().unwrap());
        let mut sums = Vec::new();
        for t in 0..6 {
            let (_, after) = rate.hit(1000 + t, "1.2.3.4", 60, "rate_1").unwrap();
            sums.push(after);
        }
        assert_eq!(sums, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn hits_outside_the_window_age_out() {
        let rate = RateStore::new(Store::temporary().unwrap());
        rate.hit(1000, "k", 5, "ns").unwrap();
        rate.hit(1001, "k", 5, "ns").unwrap();
        let (before, after) = rate.hit(1010, "k", 5, "ns").unwrap();
        assert_eq!(before, 0);
        assert_eq!(after, 1);
    }

    #[test]
    fn distinct_keys_are_independent() {
        let rate = RateStore::new(Store::temporary().unwrap());
        rate.hit(1000, "a", 60, "ns").unwrap();
        let (_, after) = rate.hit(1000, "b", 60, "ns").unwrap();
        assert_eq!(after, 1);
    }
}
