//! Turns a resolved [`policy_config_types::Config`] into a runnable
//! [`LoadedConfig`]: every [`policy_config_types::ResolvedFilter`]'s
//! `params` is consumed by its kind's constructor, acquiring whatever
//! shared resources it cites along the way (spec §4.5 "invoke each
//! kind's constructor").

use std::sync::Arc;

use policy_config_types::Config;
use policy_dns::DnsGateway;
use policy_filters::{ConstructError, FilterData, SrsCodec};
use thiserror::Error;

use crate::resources::ResourceRegistry;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("filter {name:?} (kind {kind:?}): {source}")]
    Construct {
        name: String,
        kind: String,
        source: ConstructError,
    },
}

/// One generation of configuration plus its constructed filter graph
/// (spec §3 Configuration + §4.4). `policy-engine`'s [`crate::Engine`]
/// swaps this whole value out on a successful reload; resources
/// referenced by both the old and new generation are kept alive by the
/// [`ResourceRegistry`]'s weak map, not by this struct (spec §3
/// Resource, supplement 4).
pub struct LoadedConfig {
    pub config: Config,
    pub filters: Vec<FilterData>,
}

impl LoadedConfig {
    pub fn build(
        config: Config,
        resources: &mut ResourceRegistry,
        dns: Option<&Arc<DnsGateway>>,
        srs_codec: Option<&Arc<dyn SrsCodec>>,
    ) -> Result<LoadedConfig, LoadError> {
        let mut filters = Vec::with_capacity(config.filters.len());
        for raw in &config.filters {
            let params = policy_filters::Params::new(&raw.params);
            let data = FilterData::construct(&raw.name, &raw.kind, &params, resources, dns, srs_codec).map_err(
                |source| LoadError::Construct {
                    name: raw.name.clone(),
                    kind: raw.kind.clone(),
                    source,
                },
            )?;
            filters.push(data);
        }
        Ok(LoadedConfig { config, filters })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_filters_in_declaration_order() {
        let src = r#"
            port = 10030;
            name = hang_1 {
                type = hang;
                delay_ms = 1;
                pass = postfix:DUNNO;
            };
            entry_point = CONNECT:hang_1;
        "#;
        let cfg = policy_config::load_str(src).unwrap();
        let mut resources = ResourceRegistry::new();
        let loaded = LoadedConfig::build(cfg, &mut resources, None, None).unwrap();
        assert_eq!(loaded.filters.len(), 1);
    }

    #[test]
    fn unknown_kind_surfaces_as_a_construct_error() {
        let src = r#"
            port = 10030;
            name = f1 {
                type = nope;
                pass = postfix:DUNNO;
            };
            entry_point = CONNECT:f1;
        "#;
        let cfg = policy_config::load_str(src).unwrap();
        let mut resources = ResourceRegistry::new();
        assert!(LoadedConfig::build(cfg, &mut resources, None, None).is_err());
    }
}
