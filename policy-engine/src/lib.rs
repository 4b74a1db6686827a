//! Configuration loading, resource sharing, and hook dispatch for the
//! policy daemon's filter graph (spec §3 Configuration/FilterContext/
//! Resource, §4.4 filter framework, §4.5 config loader's runtime half).
//!
//! `policy-config` only ever turns source text into a validated, static
//! [`policy_config_types::Config`]; this crate is what makes one of
//! those runnable — constructing the filter graph against shared
//! resources and a DNS gateway ([`loaded::LoadedConfig`]), dispatching
//! one query through it ([`dispatch::dispatch`]), and hot-swapping to a
//! freshly loaded generation on `SIGHUP` ([`Engine::reload`]).

pub mod context;
pub mod dispatch;
pub mod loaded;
pub mod resources;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;

use policy_dns::DnsGateway;
use policy_filters::SrsCodec;

pub use context::FilterContext;
pub use dispatch::{dispatch, DispatchAbort, DispatchResult};
pub use loaded::{LoadError, LoadedConfig};
pub use resources::ResourceRegistry;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("reading configuration file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error(transparent)]
    Config(#[from] policy_config::ConfigError),
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// The long-lived, process-wide service a `policyd` main loop holds: the
/// config path it reloads from, the resource registry that survives
/// every reload (spec §3 Resource, supplement 4), the DNS gateway and
/// SRS codec every generation's filters are built against, and an
/// [`ArcSwap`] holding the currently active generation.
///
/// Hot reload (spec §4.5): the original blocks new queries only while a
/// filter is suspended mid-query. Here every in-flight query already
/// holds its own `Arc<LoadedConfig>` clone (taken once, at the start of
/// `dispatch`, by whichever task is driving that connection), so
/// swapping `current` never blocks and never disrupts a query already
/// in progress: it simply finishes against the generation it started
/// with while new queries see the new one immediately. This is a
/// deliberate redesign from the original's blocking swap to a
/// lock-free one (see DESIGN.md).
pub struct Engine {
    config_path: PathBuf,
    resources: ResourceRegistry,
    dns: Option<Arc<DnsGateway>>,
    srs_codec: Option<Arc<dyn SrsCodec>>,
    current: ArcSwap<LoadedConfig>,
}

impl Engine {
    /// Loads `config_path` for the first time. Any error here is a
    /// startup configuration error (spec §7: "exit non-zero").
    pub fn load(
        config_path: impl Into<PathBuf>,
        dns: Option<Arc<DnsGateway>>,
        srs_codec: Option<Arc<dyn SrsCodec>>,
    ) -> Result<Engine, EngineError> {
        let config_path = config_path.into();
        let mut resources = ResourceRegistry::new();
        let loaded = load_one(&config_path, &mut resources, dns.as_ref(), srs_codec.as_ref())?;
        Ok(Engine {
            config_path,
            resources,
            dns,
            srs_codec,
            current: ArcSwap::from_pointee(loaded),
        })
    }

    /// The generation a new query should dispatch against. Cloning the
    /// `Arc` is the one thing every in-flight query does exactly once,
    /// at the start of its own `dispatch` call — see the struct doc.
    pub fn current(&self) -> Arc<LoadedConfig> {
        self.current.load_full()
    }

    /// Re-reads and re-resolves `config_path` and, on success, swaps it
    /// in (spec §4.5 "atomically swap the new configuration for the
    /// old"). On failure the previous generation keeps serving queries
    /// (spec §7 "configuration error at load: reject the reload, keep
    /// the previous configuration").
    pub fn reload(&mut self) -> Result<(), EngineError> {
        let loaded = load_one(
            &self.config_path,
            &mut self.resources,
            self.dns.as_ref(),
            self.srs_codec.as_ref(),
        )?;
        self.current.store(Arc::new(loaded));
        Ok(())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

/// A clonable, `Send + Sync` handle onto one [`Engine`] (spec §4.5 hot
/// reload): many connection tasks call [`SharedEngine::current`]
/// concurrently (and cheaply — it only takes a read lock around an
/// `ArcSwap` load), while the task driving `SIGHUP` calls
/// [`SharedEngine::reload`], which needs `&mut Engine` because it also
/// touches the non-atomic [`ResourceRegistry`]. Not a spec type itself —
/// just the seam `policyd` and `policy-server` share instead of each
/// picking their own locking scheme.
#[derive(Clone)]
pub struct SharedEngine(Arc<smol::lock::RwLock<Engine>>);

impl SharedEngine {
    pub fn new(engine: Engine) -> SharedEngine {
        SharedEngine(Arc::new(smol::lock::RwLock::new(engine)))
    }

    pub async fn current(&self) -> Arc<LoadedConfig> {
        self.0.read().await.current()
    }

    pub async fn reload(&self) -> Result<(), EngineError> {
        self.0.write().await.reload()
    }
}

fn load_one(
    path: &Path,
    resources: &mut ResourceRegistry,
    dns: Option<&Arc<DnsGateway>>,
    srs_codec: Option<&Arc<dyn SrsCodec>>,
) -> Result<LoadedConfig, EngineError> {
    let text = std::fs::read_to_string(path).map_err(|source| EngineError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = policy_config::load_str(&text)?;
    Ok(LoadedConfig::build(config, resources, dns, srs_codec)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("policyd.conf");
        writeln!(std::fs::File::create(&path).unwrap(), "{}", contents).unwrap();
        path
    }

    const MINIMAL: &str = r#"
        port = 10030;
        name = hang_1 {
            type = hang;
            delay_ms = 1;
            pass = postfix:OK;
        };
        entry_point = CONNECT:hang_1;
    "#;

    #[test]
    fn loads_then_dispatches_a_query() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, MINIMAL);
        let engine = Engine::load(path, None, None).unwrap();

        let mut unknown = Vec::new();
        let q = policy_message::Query::parse("protocol_state=CONNECT\n", &mut unknown).unwrap();
        let mut ctx = FilterContext::new();
        let result = smol::block_on(dispatch(&engine.current(), &q, &mut ctx)).unwrap();
        assert_eq!(result.action, "OK");
    }

    #[test]
    fn reload_with_a_broken_config_keeps_the_old_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, MINIMAL);
        let mut engine = Engine::load(&path, None, None).unwrap();

        std::fs::write(&path, "this is not valid config syntax {{{").unwrap();
        assert!(engine.reload().is_err());

        let mut unknown = Vec::new();
        let q = policy_message::Query::parse("protocol_state=CONNECT\n", &mut unknown).unwrap();
        let mut ctx = FilterContext::new();
        let result = smol::block_on(dispatch(&engine.current(), &q, &mut ctx)).unwrap();
        assert_eq!(result.action, "OK");
    }

    #[test]
    fn reload_with_a_good_config_swaps_in_the_new_graph() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, MINIMAL);
        let mut engine = Engine::load(&path, None, None).unwrap();

        write_config(
            &dir,
            r#"
            port = 10030;
            name = hang_1 {
                type = hang;
                delay_ms = 1;
                pass = postfix:CHANGED;
            };
            entry_point = CONNECT:hang_1;
        "#,
        );
        engine.reload().unwrap();

        let mut unknown = Vec::new();
        let q = policy_message::Query::parse("protocol_state=CONNECT\n", &mut unknown).unwrap();
        let mut ctx = FilterContext::new();
        let result = smol::block_on(dispatch(&engine.current(), &q, &mut ctx)).unwrap();
        assert_eq!(result.action, "CHANGED");
    }
}
