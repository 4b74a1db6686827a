use crate::{decode, encode, Store, StoreError};

/// The one reserved key in every store (spec §6): "the only reserved key
/// is the ASCII literal `@@cleanup@@` storing a binary `time_t` of the
/// last sweep".
pub const CLEANUP_KEY: &[u8] = b"@@cleanup@@";

pub fn last_cleanup(store: &Store) -> Result<Option<i64>, StoreError> {
    match store.get(CLEANUP_KEY)? {
        Some(bytes) => Ok(Some(decode(&bytes)?)),
        None => Ok(None),
    }
}

fn mark_cleanup(store: &Store, now: i64) -> Result<(), StoreError> {
    store.put(CLEANUP_KEY, &encode(&now)?)
}

/// Amortized cleanup (spec §4.7: "on open, if the recorded last cleanup is
/// older than `cleanup_period`, iterate all entries copying survivors to
/// a fresh file and atomically rename"). `sled` compacts its own log
/// incrementally, so there is no separate file to copy into and rename;
/// what this sweep still needs to do, and does, is apply `keep` to every
/// non-reserved entry and evict the ones it rejects, which is the
/// observable behavior that matters (stale entries stop being returned
/// and stop consuming space). Returns whether a sweep actually ran.
pub fn maybe_cleanup<F>(store: &Store, now: i64, cleanup_period: i64, mut keep: F) -> Result<bool, StoreError>
where
    F: FnMut(&[u8], &[u8]) -> bool,
{
    let due = match last_cleanup(store)? {
        Some(last) => now.saturating_sub(last) >= cleanup_period,
        None => true,
    };
    if !due {
        return Ok(false);
    }

    let mut evicted = 0usize;
    for entry in store.iterate() {
        let (key, value) = entry?;
        if key.as_ref() == CLEANUP_KEY {
            continue;
        }
        if !keep(key.as_ref(), value.as_ref()) {
            store.remove(key.as_ref())?;
            evicted += 1;
        }
    }
    tracing::info!(evicted, "persistent store cleanup swept stale entries");
    mark_cleanup(store, now)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_open_has_no_recorded_cleanup() {
        let store = Store::temporary().unwrap();
        assert_eq!(last_cleanup(&store).unwrap(), None);
    }

    #[test]
    fn sweep_evicts_rejected_entries_and_records_the_time() {
        let store = Store::temporary().unwrap();
        store.put(b"stale", b"x").unwrap();
        store.put(b"fresh", b"y").unwrap();
        let ran = maybe_cleanup(&store, 1000, 60, |k, _| k == b"fresh").unwrap();
        assert!(ran);
        assert!(store.get(b"stale").unwrap().is_none());
        assert!(store.get(b"fresh").unwrap().is_some());
        assert_eq!(last_cleanup(&store).unwrap(), Some(1000));
    }

    #[test]
    fn sweep_is_skipped_before_the_period_elapses() {
        let store = Store::temporary().unwrap();
        maybe_cleanup(&store, 1000, 60, |_, _| true).unwrap();
        store.put(b"x", b"y").unwrap();
        let ran = maybe_cleanup(&store, 1030, 60, |_, _| false).unwrap();
        assert!(!ran);
        assert!(store.get(b"x").unwrap().is_some());
    }
}
