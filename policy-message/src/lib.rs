//! Parsing and formatting for the Postfix `smtpd_access_policy` delegation
//! protocol: the `key=value\n` attribute block a policy client receives
//! per transaction, and the `action=…` reply it must send back.
//!
//! This is the `smtp-message` of this workspace: a small, allocation-light,
//! line-oriented protocol layer, just for a different wire format (a flat
//! attribute block rather than SMTP commands).

mod field;
mod format;
mod normalize;
mod query;
mod reply;
mod smtp_state;

pub use field::Field;
pub use format::{query_format, query_format_len, validate_format, FormatError};
pub use normalize::{normalized_client, normalized_sender, split_domain};
pub use query::{ParseError, Query};
pub use reply::{Reply, DUNNO};
pub use smtp_state::SmtpState;

/// Scans `buf` for the blank line terminating one attribute block and
/// returns the byte offset just past it, i.e. where the *next* block (if
/// any) starts. `policy-server`'s connection buffer calls this on every
/// read to decide whether a full `Query` can be parsed yet (spec §2).
pub fn find_terminator(buf: &str) -> Option<usize> {
    buf.find("\n\n").map(|pos| pos + 2)
}
