//! Greylist triplet table and client auto-whitelist (spec §4.7, and
//! supplement 5: "Greylist auto-whitelist TTL and amortized cleanup").

use serde::{Deserialize, Serialize};

use crate::cleanup;
use crate::{decode, encode, Store, StoreError};

const TRIPLET_PREFIX: u8 = 1;
const AWL_PREFIX: u8 = 2;

/// The one-hour auto-whitelist TTL (spec §4.7: "future contacts from
/// that client return whitelist for one hour").
pub const AWL_TTL_SECONDS: i64 = 3600;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Greylist,
    Whitelist,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct Triplet {
    first_seen: i64,
    last_seen: i64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct Awl {
    count: u32,
    window_start: i64,
}

fn triplet_key(client_class: &str, sender_class: &str, recipient: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + client_class.len() + sender_class.len() + recipient.len() + 2);
    key.push(TRIPLET_PREFIX);
    key.extend_from_slice(client_class.as_bytes());
    key.push(0);
    key.extend_from_slice(sender_class.as_bytes());
    key.push(0);
    key.extend_from_slice(recipient.as_bytes());
    key
}

fn awl_key(client_address: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + client_address.len());
    key.push(AWL_PREFIX);
    key.extend_from_slice(client_address.as_bytes());
    key
}

/// The persistent backing for one `greylist` filter instance (spec §3
/// Resource: filters citing the same file share one handle, so this
/// wraps a single [`Store`] rather than owning the file itself).
pub struct GreylistStore {
    store: Store,
}

impl GreylistStore {
    pub fn new(store: Store) -> GreylistStore {
        GreylistStore { store }
    }

    /// Triplet lookup (spec §4.7). `delay` is the maturation delay,
    /// `max_age` bounds how long a mature-or-not entry is kept at all,
    /// `retry_window` bounds how long an immature entry may go without a
    /// retry before it is treated as a fresh first contact.
    pub fn check_triplet(
        &self,
        now: i64,
        client_class: &str,
        sender_class: &str,
        recipient: &str,
        delay: i64,
        max_age: i64,
        retry_window: i64,
    ) -> Result<Decision, StoreError> {
        let key = triplet_key(client_class, sender_class, recipient);
        let existing: Option<Triplet> = match self.store.get(&key)? {
            Some(bytes) => Some(decode(&bytes)?),
            None => None,
        };

        let decision = match existing {
            None => {
                self.store
                    .put(&key, &encode(&Triplet { first_seen: now, last_seen: now })?)?;
                Decision::Greylist
            }
            Some(entry) => {
                let matured = now.saturating_sub(entry.first_seen) >= delay;
                let stale = now.saturating_sub(entry.first_seen) > max_age
                    || (!matured && now.saturating_sub(entry.last_seen) > retry_window);
                if stale {
                    self.store
                        .put(&key, &encode(&Triplet { first_seen: now, last_seen: now })?)?;
                    Decision::Greylist
                } else {
                    self.store.put(
                        &key,
                        &encode(&Triplet {
                            first_seen: entry.first_seen,
                            last_seen: now,
                        })?,
                    )?;
                    if matured {
                        Decision::Whitelist
                    } else {
                        Decision::Greylist
                    }
                }
            }
        };
        Ok(decision)
    }

    /// Checks the per-client auto-whitelist without touching the triplet
    /// table (spec §4.7). Returns `true` if this client has matured at
    /// least `threshold` triplets and the one-hour window is still open.
    pub fn check_awl(&self, now: i64, client_address: &str, threshold: u32) -> Result<bool, StoreError> {
        let key = awl_key(client_address);
        let entry: Option<Awl> = match self.store.get(&key)? {
            Some(bytes) => Some(decode(&bytes)?),
            None => None,
        };
        Ok(match entry {
            Some(e) => e.count >= threshold && now.saturating_sub(e.window_start) < AWL_TTL_SECONDS,
            None => false,
        })
    }

    /// Records one successful triplet maturation against the client's
    /// auto-whitelist counter, refreshing its one-hour window.
    pub fn record_maturity(&self, now: i64, client_address: &str) -> Result<u32, StoreError> {
        let key = awl_key(client_address);
        let mut entry: Awl = match self.store.get(&key)? {
            Some(bytes) => decode(&bytes)?,
            None => Awl { count: 0, window_start: now },
        };
        entry.count = entry.count.saturating_add(1);
        entry.window_start = now;
        self.store.put(&key, &encode(&entry)?)?;
        Ok(entry.count)
    }

    /// Amortized cleanup sweep (spec §4.7). Evicts triplet entries whose
    /// `last_seen` is older than `max_age` and AWL entries whose window
    /// has long since expired.
    pub fn cleanup(&self, now: i64, cleanup_period: i64, max_age: i64) -> Result<bool, StoreError> {
        cleanup::maybe_cleanup(&self.store, now, cleanup_period, |key, value| {
            match key.first() {
                Some(&TRIPLET_PREFIX) => match bincode::deserialize::<Triplet>(value) {
                    Ok(t) => now.saturating_sub(t.last_seen) <= max_age,
                    Err(_) => false,
                },
                Some(&AWL_PREFIX) => match bincode::deserialize::<Awl>(value) {
                    Ok(a) => now.saturating_sub(a.window_start) <= AWL_TTL_SECONDS,
                    Err(_) => false,
                },
                _ => true,
            }
        })
    }
}
