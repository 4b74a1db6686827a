/// Key identifying a shared on-disk resource (spec §3 "Resource"): an
/// on-disk database handle or compiled trie keyed by `(namespace, path)`.
/// Two filters citing the same `(namespace, path)` share one handle.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub namespace: &'static str,
    pub path: String,
}

impl ResourceKey {
    pub fn new(namespace: &'static str, path: impl Into<String>) -> ResourceKey {
        ResourceKey {
            namespace,
            path: path.into(),
        }
    }
}
