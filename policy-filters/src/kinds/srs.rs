//! `srs` (supplement 3: "the original's SRS support is a pass-through
//! stub; model it as a seam — a trait with one real implementation
//! deferred, not inlined dead code"). Rewrites (or reverses) the envelope
//! sender behind a `SrsCodec` so a real implementation can be dropped in
//! without touching filter-chain wiring.

use std::sync::Arc;

use policy_config_types::Outcome;
use policy_message::{Field, Query};
use thiserror::Error;

use crate::params::Params;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SrsError {
    #[error("SRS rewriting is not implemented by this build")]
    Unimplemented,
    #[error("address {0:?} is not a valid SRS address for this domain")]
    NotOurs(String),
}

/// The rewrite/reverse seam (spec supplement 3). `policyd` wires in the
/// real codec; unit tests and configurations that never use `srs` get
/// [`UnimplementedSrsCodec`].
pub trait SrsCodec: Send + Sync {
    fn encode(&self, sender: &str, domain: &str) -> Result<String, SrsError>;
    fn decode(&self, sender: &str, domain: &str) -> Result<String, SrsError>;
}

#[derive(Default)]
pub struct UnimplementedSrsCodec;

impl SrsCodec for UnimplementedSrsCodec {
    fn encode(&self, _sender: &str, _domain: &str) -> Result<String, SrsError> {
        Err(SrsError::Unimplemented)
    }

    fn decode(&self, _sender: &str, _domain: &str) -> Result<String, SrsError> {
        Err(SrsError::Unimplemented)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SrsMode {
    Encode,
    Decode,
}

pub struct SrsFilter {
    mode: SrsMode,
    domain: String,
    codec: Arc<dyn SrsCodec>,
}

impl SrsFilter {
    pub fn construct(params: &Params, codec: Arc<dyn SrsCodec>) -> anyhow::Result<SrsFilter> {
        let mode = match params.required_str("mode")? {
            "encode" => SrsMode::Encode,
            "decode" => SrsMode::Decode,
            other => anyhow::bail!("srs: unknown mode {:?}", other),
        };
        let domain = params.required_str("domain")?.to_string();
        Ok(SrsFilter { mode, domain, codec })
    }

    pub fn possible_outcomes() -> &'static [Outcome] {
        &[Outcome::Pass, Outcome::Fail]
    }

    /// Rewrites `query`'s sender and returns whether it succeeded. The
    /// rewritten address itself is not part of this closed `Outcome`
    /// vocabulary; the engine is expected to stash it (spec §4.4's
    /// per-hook `warn` format can surface it) rather than this kind
    /// returning a value out of band.
    pub fn run(&self, query: &Query<'_>) -> Outcome {
        let sender = query.field(Field::Sender);
        let result = match self.mode {
            SrsMode::Encode => self.codec.encode(sender, &self.domain),
            SrsMode::Decode => self.codec.decode(sender, &self.domain),
        };
        match result {
            Ok(_) => Outcome::Pass,
            Err(err) => {
                tracing::debug!(%err, "srs: rewrite did not apply");
                Outcome::Fail
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unimplemented_codec_always_fails() {
        let raw = vec![
            ("mode".to_string(), "encode".to_string()),
            ("domain".to_string(), "example.com".to_string()),
        ];
        let filter = SrsFilter::construct(&Params::new(&raw), Arc::new(UnimplementedSrsCodec)).unwrap();
        let mut unknown = Vec::new();
        let q = Query::parse("protocol_state=MAIL\nsender=a@b.com\n", &mut unknown).unwrap();
        assert_eq!(filter.run(&q), Outcome::Fail);
    }

    #[test]
    fn unknown_mode_is_rejected_at_construction() {
        let raw = vec![
            ("mode".to_string(), "rewrite".to_string()),
            ("domain".to_string(), "example.com".to_string()),
        ];
        assert!(SrsFilter::construct(&Params::new(&raw), Arc::new(UnimplementedSrsCodec)).is_err());
    }
}
