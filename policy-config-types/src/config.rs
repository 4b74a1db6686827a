use crate::{entry_points::EntryPoints, filter::ResolvedFilter, listener::ListenerConfig};

/// The fully-loaded, fully-resolved configuration (spec §3
/// "Configuration"): filters indexed by declaration order, one entry
/// point per SMTP-state category, and the global fields.
#[derive(Clone, Debug)]
pub struct Config {
    pub filters: Vec<ResolvedFilter>,
    pub entry_points: EntryPoints,
    pub log_format: Option<String>,
    pub include_explanation: bool,
    pub listener: ListenerConfig,
}

impl Config {
    pub fn filter_by_name(&self, name: &str) -> Option<usize> {
        self.filters.iter().position(|f| f.name == name)
    }
}
