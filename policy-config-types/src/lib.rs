//! Shared configuration data types for the policy daemon: the
//! filter-graph DSL's parsed-but-unresolved ([`RawFilter`]) and
//! resolved ([`ResolvedFilter`], [`Config`]) representations, the closed
//! [`Outcome`] token set, and the small supporting types ([`EntryPoints`],
//! [`ListenerConfig`], [`ResourceKey`]).
//!
//! This crate plays the role `smtp-server-types`/`kannader-config-types`
//! play in their workspace: the `serde`-friendly schema shared between
//! the config loader and everything downstream of it, kept free of
//! parsing logic and of the filter kinds' own behavior.

mod config;
mod entry_points;
mod filter;
mod listener;
mod outcome;
mod resource;

pub use config::Config;
pub use entry_points::EntryPoints;
pub use filter::{sort_hooks, token_id, Action, Hook, RawAction, RawFilter, RawHook, ResolvedFilter};
pub use listener::ListenerConfig;
pub use outcome::Outcome;
pub use resource::ResourceKey;

pub use policy_message::SmtpState;
