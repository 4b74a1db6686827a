use std::sync::Arc;

use policy_filters::{SrsCodec, UnimplementedSrsCodec};

/// The SRS codec this build wires into the filter graph (spec §1
/// Non-goals: "the SRS rewriting algorithm... is not part of the
/// core"). A real deployment would substitute an implementation backed
/// by whatever SRS library it trusts; absent that, `srs` filters still
/// construct successfully (so a configuration that declares one loads)
/// but every rewrite attempt resolves to a `Fail` outcome via
/// `policy_filters::SrsError::Unimplemented`.
pub fn codec() -> Arc<dyn SrsCodec> {
    Arc::new(UnimplementedSrsCodec)
}
