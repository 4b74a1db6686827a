use std::sync::Arc;

use crate::trie::{MatchMode, Orientation, StaticSet};

/// The seam a filter kind's constructor uses to acquire a shared on-disk
/// resource (spec §3 Resource: "a named shared object ... keyed by
/// `(namespace, path)` with a refcount"). `policy-engine` implements this
/// against its `Resource` registry so that two filters citing the same
/// file reuse one handle and a reload drops the old generation's
/// references before constructing the new one's (spec §3, supplement 4).
///
/// Kept as a trait here, rather than in `policy-engine`, so `policy-filters`
/// does not need to depend back on the engine crate that drives it.
pub trait Resources {
    fn acquire_store(&mut self, path: &str) -> anyhow::Result<Arc<store::Store>>;

    fn acquire_static_set(
        &mut self,
        path: &str,
        orientation: Orientation,
        mode: MatchMode,
    ) -> anyhow::Result<Arc<StaticSet>>;
}

/// A trivial in-process [`Resources`] that never shares anything across
/// calls (one fresh temporary store/set per acquisition). Used by unit
/// tests of the filter kinds, which do not exercise cross-filter sharing.
#[derive(Default)]
pub struct StandaloneResources;

impl Resources for StandaloneResources {
    fn acquire_store(&mut self, path: &str) -> anyhow::Result<Arc<store::Store>> {
        if path.is_empty() {
            Ok(Arc::new(store::Store::temporary()?))
        } else {
            Ok(Arc::new(store::Store::open(std::path::Path::new(path))?))
        }
    }

    fn acquire_static_set(
        &mut self,
        path: &str,
        orientation: Orientation,
        mode: MatchMode,
    ) -> anyhow::Result<Arc<StaticSet>> {
        let text = std::fs::read_to_string(path)?;
        Ok(Arc::new(StaticSet::build(
            text.lines().map(|l| l.to_string()),
            orientation,
            mode,
        )))
    }
}
