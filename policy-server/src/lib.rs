//! The event loop, listeners, and client buffering component (spec
//! §4.1): the substrate `policy-engine`'s filter dispatch and `spf`'s
//! DNS-suspended evaluation run on top of.
//!
//! The original is a single-threaded cooperative scheduler built by hand
//! over level-triggered readiness (accept/listener/timer primitives,
//! object pools for clients and timers). This crate instead runs on
//! `smol`'s executor and reactor — the same pairing `yuubind::main`
//! already uses for its SMTP side — so one `smol::Task` per connection
//! plays the role the original's pooled `client` struct and its
//! readiness subscription did; see `client`'s module doc for the
//! per-connection detail and DESIGN.md for why this substitution is
//! faithful to spec §4.1's substance (accept, read/write,
//! suspend-and-resume) without the hand-rolled mechanism.

pub mod client;
pub mod listener;

pub use client::{ClientError, MAX_QUERY_BYTES};
pub use listener::serve_listeners;
