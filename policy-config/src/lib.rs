//! Loader for the policy daemon's filter-graph configuration DSL (spec
//! §4.5). Three stages, mirroring how `kannader-config` separates
//! tokenizing, building the unresolved schema, and letting the caller
//! decide how resolved values get used: [`lexer::lex`] turns the file's
//! text into [`lexer::Item`]s, [`loader::parse`] turns those into
//! name-referencing [`policy_config_types::RawFilter`]s and globals, and
//! [`resolve::resolve`] resolves names to indices, runs the cycle check,
//! and validates the listener and `warn` format strings.
//!
//! Hot reload (spec §4.5 "SIGHUP triggers a reload; if a filter is
//! currently suspended mid-query the reload blocks until it completes")
//! is not this crate's concern: it only ever produces a fresh, fully
//! validated [`Config`] from source text, and it is up to the caller
//! (`policy-engine`) to decide when to call it again and how to swap the
//! result in.

mod lexer;
mod loader;
mod resolve;

pub use lexer::{Item, LexError};
pub use loader::{parse, parse_source, LoadError, RawGlobals};
pub use resolve::{resolve, ResolveError};

use policy_config_types::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Tokenizes, parses, and resolves a configuration file's full text in
/// one call.
pub fn load_str(input: &str) -> Result<Config, ConfigError> {
    let (filters, globals) = parse_source(input)?;
    Ok(resolve(filters, globals)?)
}

/// Reads and loads a configuration file from disk.
pub fn load_file(path: &std::path::Path) -> Result<Config, anyhow::Error> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading {}: {}", path.display(), e))?;
    Ok(load_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_minimal_config() {
        let src = r#"
            port = 10030;
            name = greylist_1 {
                type = greylist;
                delay = 300;
                greylist = postfix:DEFER_IF_REJECT greylisted, try again later;
                whitelist = postfix:DUNNO;
            };
            entry_point = RCPT:greylist_1;
        "#;
        let cfg = load_str(src).unwrap();
        assert_eq!(cfg.filters.len(), 1);
        assert_eq!(cfg.filters[0].kind, "greylist");
    }
}
