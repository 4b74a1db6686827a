//! The [`Resources`](policy_filters::Resources) implementation that backs
//! real (non-test) filter construction: on-disk stores and compiled
//! static sets are shared by `(namespace, path)` and kept alive only
//! while some filter instance still references them (spec §3 Resource:
//! "destructor invoked when refcount reaches zero").
//!
//! Sharing is modeled with [`Weak`] rather than a hand-rolled counter: a
//! filter instance holds the `Arc`, the registry holds only a `Weak`, and
//! a resource is dropped the instant its last referring filter is. A
//! config reload (spec §3, supplement 4) drops the old generation's
//! `Vec<FilterData>` before building the new one, so unchanged resources
//! never see their strong count reach zero and are simply handed back out
//! of the same `Weak` on the next `acquire_*` call.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use policy_filters::{MatchMode, Orientation, Resources, StaticSet};

#[derive(Clone, PartialEq, Eq, Hash)]
struct SetKey {
    path: String,
    orientation: Orientation,
    mode: MatchMode,
}

/// The long-lived registry one `policyd` process holds for its whole
/// lifetime, across any number of config reloads.
#[derive(Default)]
pub struct ResourceRegistry {
    stores: HashMap<String, Weak<store::Store>>,
    sets: HashMap<SetKey, Weak<StaticSet>>,
}

impl ResourceRegistry {
    pub fn new() -> ResourceRegistry {
        ResourceRegistry::default()
    }
}

impl Resources for ResourceRegistry {
    fn acquire_store(&mut self, path: &str) -> anyhow::Result<Arc<store::Store>> {
        if path.is_empty() {
            // No `db` parameter: an unshared, private in-memory store.
            return Ok(Arc::new(store::Store::temporary()?));
        }
        if let Some(existing) = self.stores.get(path).and_then(Weak::upgrade) {
            return Ok(existing);
        }
        let handle = Arc::new(store::Store::open(std::path::Path::new(path))?);
        self.stores.insert(path.to_string(), Arc::downgrade(&handle));
        Ok(handle)
    }

    fn acquire_static_set(
        &mut self,
        path: &str,
        orientation: Orientation,
        mode: MatchMode,
    ) -> anyhow::Result<Arc<StaticSet>> {
        let key = SetKey {
            path: path.to_string(),
            orientation,
            mode,
        };
        if let Some(existing) = self.sets.get(&key).and_then(Weak::upgrade) {
            return Ok(existing);
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading strlist set {:?}: {}", path, e))?;
        let mut set = StaticSet::build(text.lines().map(|l| l.to_string()), orientation, mode);
        set.lock_resident();
        let handle = Arc::new(set);
        self.sets.insert(key, Arc::downgrade(&handle));
        Ok(handle)
    }
}
