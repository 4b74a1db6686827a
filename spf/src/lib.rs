//! A from-scratch Sender Policy Framework (RFC 4408-style) evaluator
//! (spec §4.6): record fetch and parsing, macro expansion, mechanism
//! evaluation with the shared DNS-mechanism budget, recursive
//! `include`/`redirect`, and `exp=` explanation fetching.
//!
//! [`evaluate`] is the sole entry point; everything else here is the
//! supporting vocabulary (`record`'s directive types, `macros`' `%{...}`
//! expander, `cidr`'s prefix compare, `domain`'s label-syntax check) a
//! caller only needs when inspecting a parsed record directly.

mod cidr;
mod domain;
mod eval;
mod macros;
mod record;
mod resolver;
mod result;

pub use cidr::Cidr;
pub use domain::validate_domain;
pub use eval::{evaluate, SpfRequest};
pub use record::{Directive, Mechanism, MechanismKind, Modifier, Qualifier, Record};
pub use resolver::Resolver;
pub use result::{SpfOutcome, SpfResult};
