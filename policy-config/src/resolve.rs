use std::collections::HashMap;

use policy_config_types::{
    Action, Config, EntryPoints, Hook, ListenerConfig, RawAction, RawFilter, SmtpState,
};
use thiserror::Error;

use crate::loader::RawGlobals;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("line {line}: filter {from:?} references unknown filter {to:?}")]
    UnknownFilter {
        from: String,
        to: String,
        line: usize,
    },
    #[error("line {0}: entry_point names unknown SMTP state {1:?}")]
    UnknownState(usize, String),
    #[error("line {0}: entry_point references unknown filter {1:?}")]
    UnknownEntryPointFilter(usize, String),
    #[error("filter graph has a cycle reachable from {0:?}")]
    Cycle(String),
    #[error("listener configuration is invalid: {0}")]
    InvalidListener(String),
    #[error(transparent)]
    Format(#[from] policy_message::FormatError),
}

/// Resolves name references to indices and runs the cycle check (spec
/// §4.5: "run the cycle check (DFS marking each node with the current
/// root id)"). Implemented here as one whole-graph three-color DFS,
/// which finds the same cycles the per-root marking scheme would without
/// repeating work across roots.
pub fn resolve(filters: Vec<RawFilter>, globals: RawGlobals) -> Result<Config, ResolveError> {
    let index_of: HashMap<&str, usize> = filters
        .iter()
        .enumerate()
        .map(|(i, f)| (f.name.as_str(), i))
        .collect();

    let mut resolved = Vec::with_capacity(filters.len());
    for filter in &filters {
        let mut hooks = Vec::with_capacity(filter.hooks.len());
        for hook in &filter.hooks {
            if let Some(warn) = &hook.warn {
                policy_message::validate_format(warn)?;
            }
            let action = match &hook.action {
                RawAction::Reply(text) => Action::Reply(text.clone()),
                RawAction::Next(name) => {
                    let idx = *index_of.get(name.as_str()).ok_or_else(|| {
                        ResolveError::UnknownFilter {
                            from: filter.name.clone(),
                            to: name.clone(),
                            line: 0,
                        }
                    })?;
                    Action::Next(idx)
                }
            };
            hooks.push(Hook {
                token: hook.token,
                action,
                counter: hook.counter,
                warn: hook.warn.clone(),
            });
        }
        policy_config_types::sort_hooks(&mut hooks);
        resolved.push(policy_config_types::ResolvedFilter {
            name: filter.name.clone(),
            kind: filter.kind.clone(),
            params: filter.params.clone(),
            hooks,
        });
    }

    check_for_cycles(&resolved)?;

    let mut entry_points = EntryPoints::new();
    for (state_name, filter_name, line) in &globals.entry_points {
        let state = SmtpState::from_attr(state_name)
            .ok_or_else(|| ResolveError::UnknownState(*line, state_name.clone()))?;
        let idx = index_of
            .get(filter_name.as_str())
            .copied()
            .ok_or_else(|| ResolveError::UnknownEntryPointFilter(*line, filter_name.clone()))?;
        entry_points.set(state, idx);
    }

    let listener = ListenerConfig {
        port: globals.port,
        socketfile: globals.socketfile,
    };
    listener
        .validate()
        .map_err(ResolveError::InvalidListener)?;

    Ok(Config {
        filters: resolved,
        entry_points,
        log_format: globals.log_format,
        include_explanation: globals.include_explanation,
        listener,
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

fn check_for_cycles(filters: &[policy_config_types::ResolvedFilter]) -> Result<(), ResolveError> {
    let mut colors = vec![Color::White; filters.len()];

    fn visit(
        i: usize,
        filters: &[policy_config_types::ResolvedFilter],
        colors: &mut [Color],
    ) -> Result<(), ResolveError> {
        colors[i] = Color::Gray;
        for hook in &filters[i].hooks {
            if let Action::Next(j) = hook.action {
                match colors[j] {
                    Color::Gray => return Err(ResolveError::Cycle(filters[j].name.clone())),
                    Color::White => visit(j, filters, colors)?,
                    Color::Black => {}
                }
            }
        }
        colors[i] = Color::Black;
        Ok(())
    }

    for i in 0..filters.len() {
        if colors[i] == Color::White {
            visit(i, filters, &mut colors)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_source;

    fn build(src: &str) -> Result<Config, ResolveError> {
        let (filters, globals) = parse_source(src).unwrap();
        resolve(filters, globals)
    }

    #[test]
    fn resolves_a_simple_chain() {
        let src = r#"
            name = a { type = hang; pass = b; fail = postfix:REJECT; };
            name = b { type = hang; pass = postfix:DUNNO; };
            entry_point = CONNECT:a;
            port = 10030;
        "#;
        let cfg = build(src).unwrap();
        assert_eq!(cfg.filters.len(), 2);
        assert_eq!(cfg.entry_points.get(SmtpState::Connect), Some(0));
    }

    #[test]
    fn detects_a_two_node_cycle() {
        let src = r#"
            name = a { type = hang; pass = b; fail = postfix:REJECT; };
            name = b { type = hang; pass = a; fail = postfix:REJECT; };
            port = 10030;
        "#;
        assert!(matches!(build(src), Err(ResolveError::Cycle(_))));
    }

    #[test]
    fn unknown_jump_target_is_rejected() {
        let src = "name = a { type = hang; pass = nonexistent; }; port = 10030;";
        assert!(matches!(build(src), Err(ResolveError::UnknownFilter { .. })));
    }

    #[test]
    fn entry_point_to_unknown_filter_is_rejected() {
        let src = r#"
            name = a { type = hang; pass = postfix:DUNNO; };
            entry_point = CONNECT:nope;
            port = 10030;
        "#;
        assert!(matches!(
            build(src),
            Err(ResolveError::UnknownEntryPointFilter(_, _))
        ));
    }

    #[test]
    fn missing_listener_is_rejected() {
        let src = "name = a { type = hang; pass = postfix:DUNNO; };";
        assert!(matches!(build(src), Err(ResolveError::InvalidListener(_))));
    }
}
