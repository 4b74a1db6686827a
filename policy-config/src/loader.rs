use std::collections::HashMap;

use policy_config_types::{Outcome, RawAction, RawFilter, RawHook};
use thiserror::Error;

use crate::lexer::{self, Assignment, Item, LexError};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("line {line}: duplicate filter name {name:?}")]
    DuplicateFilterName { name: String, line: usize },
    #[error("line {0}: filter declaration is missing `type = <kind>;`")]
    MissingType(usize),
    #[error("line {0}: global assignment {1:?} is not recognized")]
    UnknownGlobal(usize, String),
    #[error("line {0}: {1:?} is not a valid hook-modifier suffix")]
    BadHookModifier(usize, String),
    #[error("line {0}: `{1}.cost` is not a valid integer")]
    BadCost(usize, String),
    #[error("line {0}: `{1}.counter` is not a valid integer")]
    BadCounter(usize, String),
    #[error("line {0}: include_explanation must be `true` or `false`, found {1:?}")]
    BadBool(usize, String),
    #[error("line {0}: port must be a 16-bit integer, found {1:?}")]
    BadPort(usize, String),
}

#[derive(Clone, Debug, Default)]
pub struct RawGlobals {
    pub entry_points: Vec<(String, String, usize)>,
    pub port: Option<u16>,
    pub socketfile: Option<String>,
    pub log_format: Option<String>,
    pub include_explanation: bool,
}

fn parse_action(value: &str) -> RawAction {
    match value.strip_prefix("postfix:") {
        Some(rest) => RawAction::Reply(rest.trim().to_string()),
        None => RawAction::Next(value.trim().to_string()),
    }
}

struct HookModifiers {
    counter: Option<usize>,
    cost: Option<i64>,
    warn: Option<String>,
}

fn parse_filter_body(body: &[Assignment]) -> Result<(String, Vec<(String, String)>, Vec<RawHook>), LoadError> {
    let mut kind = None;
    let mut params = Vec::new();
    let mut actions: HashMap<Outcome, (RawAction, usize)> = HashMap::new();
    let mut modifiers: HashMap<Outcome, HookModifiers> = HashMap::new();

    for assign in body {
        if assign.key == "type" {
            kind = Some(assign.value.clone());
            continue;
        }
        if let Some(dot) = assign.key.find('.') {
            let (hook_name, suffix) = (&assign.key[..dot], &assign.key[dot + 1..]);
            let outcome = match Outcome::from_str(hook_name) {
                Some(o) => o,
                None => {
                    params.push((assign.key.clone(), assign.value.clone()));
                    continue;
                }
            };
            let slot = modifiers.entry(outcome).or_insert(HookModifiers {
                counter: None,
                cost: None,
                warn: None,
            });
            match suffix {
                "counter" => {
                    slot.counter = Some(assign.value.parse().map_err(|_| {
                        LoadError::BadCounter(assign.line, assign.value.clone())
                    })?)
                }
                "cost" => {
                    slot.cost = Some(
                        assign
                            .value
                            .parse()
                            .map_err(|_| LoadError::BadCost(assign.line, assign.value.clone()))?,
                    )
                }
                "warn" => slot.warn = Some(assign.value.clone()),
                _ => return Err(LoadError::BadHookModifier(assign.line, assign.key.clone())),
            }
            continue;
        }
        match Outcome::from_str(&assign.key) {
            Some(outcome) => {
                actions.insert(outcome, (parse_action(&assign.value), assign.line));
            }
            None => params.push((assign.key.clone(), assign.value.clone())),
        }
    }

    let kind = kind.ok_or_else(|| {
        LoadError::MissingType(body.first().map(|a| a.line).unwrap_or(0))
    })?;

    let mut hooks: Vec<RawHook> = actions
        .into_iter()
        .map(|(token, (action, _line))| {
            let m = modifiers.remove(&token);
            let counter = m.as_ref().and_then(|m| m.counter).map(|idx| {
                (idx, m.as_ref().and_then(|m| m.cost).unwrap_or(1))
            });
            let warn = m.and_then(|m| m.warn);
            RawHook {
                token,
                action,
                counter,
                warn,
            }
        })
        .collect();
    hooks.sort_by_key(|h| policy_config_types::token_id(h.token));

    Ok((kind, params, hooks))
}

/// Parses lexed [`Item`]s into the raw (name-referencing, unresolved)
/// filter declarations plus the global settings (spec §4.5).
pub fn parse(items: Vec<Item>) -> Result<(Vec<RawFilter>, RawGlobals), LoadError> {
    let mut filters = Vec::new();
    let mut seen_names: HashMap<String, usize> = HashMap::new();
    let mut globals = RawGlobals::default();

    for item in items {
        match item {
            Item::FilterDecl { name, body, line } => {
                if let Some(_) = seen_names.insert(name.clone(), line) {
                    return Err(LoadError::DuplicateFilterName { name, line });
                }
                let (kind, params, hooks) = parse_filter_body(&body)?;
                filters.push(RawFilter {
                    name,
                    kind,
                    params,
                    hooks,
                });
            }
            Item::Assignment(Assignment { key, value, line }) => match key.as_str() {
                "entry_point" => {
                    let (state, filter) = value.split_once(':').ok_or_else(|| {
                        LoadError::UnknownGlobal(line, format!("entry_point = {}", value))
                    })?;
                    globals
                        .entry_points
                        .push((state.to_string(), filter.to_string(), line));
                }
                "port" => {
                    globals.port =
                        Some(value.parse().map_err(|_| LoadError::BadPort(line, value.clone()))?)
                }
                "socketfile" => globals.socketfile = Some(value),
                "log_format" => globals.log_format = Some(value),
                "include_explanation" => {
                    globals.include_explanation = match value.as_str() {
                        "true" => true,
                        "false" => false,
                        _ => return Err(LoadError::BadBool(line, value)),
                    }
                }
                _ => return Err(LoadError::UnknownGlobal(line, key)),
            },
        }
    }

    Ok((filters, globals))
}

/// Tokenizes and parses a configuration file's full text in one call.
pub fn parse_source(input: &str) -> Result<(Vec<RawFilter>, RawGlobals), LoadError> {
    let items = lexer::lex(input)?;
    parse(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hooks_params_and_modifiers() {
        let src = r#"
            name = rate_1 {
                type = rate;
                key = "${client_address}";
                delay = 60;
                soft_threshold = 3;
                hard_threshold = 5;
                hard_match = postfix:REJECT too fast;
                hard_match.counter = 0;
                hard_match.cost = 2;
                hard_match.warn = "rate limit hit by ${client_address}";
                pass = postfix:DUNNO;
            };
            entry_point = RCPT:rate_1;
            port = 10030;
        "#;
        let (filters, globals) = parse_source(src).unwrap();
        assert_eq!(filters.len(), 1);
        let f = &filters[0];
        assert_eq!(f.kind, "rate");
        assert!(f.params.iter().any(|(k, v)| k == "delay" && v == "60"));
        let hard = f
            .hooks
            .iter()
            .find(|h| h.token == Outcome::HardMatch)
            .unwrap();
        assert_eq!(hard.counter, Some((0, 2)));
        assert!(hard.warn.is_some());
        assert_eq!(globals.port, Some(10030));
        assert_eq!(globals.entry_points, vec![("RCPT".into(), "rate_1".into(), 10)]);
    }

    #[test]
    fn duplicate_filter_names_are_rejected() {
        let src = "name = f { type = hang; pass = postfix:OK; }; name = f { type = hang; pass = postfix:OK; };";
        assert!(matches!(
            parse_source(src),
            Err(LoadError::DuplicateFilterName { .. })
        ));
    }

    #[test]
    fn missing_type_is_rejected() {
        let src = "name = f { pass = postfix:OK; };";
        assert!(matches!(parse_source(src), Err(LoadError::MissingType(_))));
    }
}
