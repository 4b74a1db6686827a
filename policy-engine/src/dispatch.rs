//! Filter-graph dispatch (spec §4.4 "Running a filter", §2 "Control flow
//! of one query"): looks up the entry filter for the query's protocol
//! state, runs it, follows its hook table to either a terminal reply or
//! the next filter, and repeats.
//!
//! The original models an `async` outcome explicitly: a runner records a
//! continuation and the engine leaves the connection parked until a
//! globally registered handler posts the pending outcome back in. Here
//! every kind's runner is an `async fn` (`policy_filters::FilterData::run`),
//! so that suspension *is* the `.await` inside this loop's `run(..).await`
//! call — there is no separate resume path to model, and `Outcome::Async`
//! is never actually produced (see `policy-filters`' module doc and
//! DESIGN.md).

use policy_config_types::Action;
use policy_message::{query_format, Field, Query, DUNNO};
use thiserror::Error;

use crate::context::FilterContext;
use crate::loaded::LoadedConfig;

/// A query that cannot be dispatched at all: the connection is dropped
/// rather than answered (spec §7 "protocol malformed"/"configuration
/// error" families).
#[derive(Debug, Error)]
pub enum DispatchAbort {
    #[error("no entry_point is configured for protocol state {0}")]
    NoEntryPoint(policy_message::SmtpState),
    #[error(
        "filter {filter_name:?} requires at least {required} but the query is in {actual} (spec §3: a hard configuration error)"
    )]
    BelowMinState {
        filter_name: String,
        required: policy_message::SmtpState,
        actual: policy_message::SmtpState,
    },
}

/// The rendered outcome of one full dispatch: the `action=...` text and
/// an optional explanation (spec §6: appended as `: <explanation>` only
/// when `include_explanation` is set and the engine buffered one).
pub struct DispatchResult {
    pub action: String,
    pub explanation: Option<String>,
}

/// Runs `query` through `config`'s filter graph starting from the entry
/// point for its protocol state, returning the terminal reply (spec §4.4,
/// §4.5's "every filter's hook table covers every outcome the kind may
/// produce, else a default DUNNO reply is used with a warning" default).
pub async fn dispatch(
    config: &LoadedConfig,
    query: &Query<'_>,
    ctx: &mut FilterContext,
) -> Result<DispatchResult, DispatchAbort> {
    ctx.begin_transaction(query.field(Field::Instance));

    let state = query.protocol_state();
    let mut index = config
        .config
        .entry_points
        .get(state)
        .ok_or(DispatchAbort::NoEntryPoint(state))?;

    loop {
        let filter = &config.config.filters[index];
        let data = &config.filters[index];

        let min_state = data.min_state();
        if !state.at_least(min_state) {
            return Err(DispatchAbort::BelowMinState {
                filter_name: filter.name.clone(),
                required: min_state,
                actual: state,
            });
        }

        let outcome = data.run(query, &mut ctx.counters, &mut ctx.explanation).await;

        match filter.lookup(outcome) {
            Some(hook) => {
                if let Some((counter_idx, cost)) = hook.counter {
                    ctx.counters.bump(counter_idx, cost);
                }
                if let Some(warn_fmt) = &hook.warn {
                    let rendered = query_format(Some(query), warn_fmt).unwrap_or_else(|_| warn_fmt.clone());
                    tracing::warn!(filter = %filter.name, outcome = %outcome, "{}", rendered);
                }
                match &hook.action {
                    Action::Reply(text) => {
                        return Ok(DispatchResult {
                            action: text.clone(),
                            explanation: ctx.explanation.clone(),
                        });
                    }
                    Action::Next(next_index) => {
                        index = *next_index;
                    }
                }
            }
            None => {
                tracing::warn!(
                    filter = %filter.name,
                    kind = %filter.kind,
                    outcome = %outcome,
                    "no hook (and no forwarding fallback) matched this outcome; defaulting to {}",
                    DUNNO
                );
                return Ok(DispatchResult {
                    action: DUNNO.to_string(),
                    explanation: None,
                });
            }
        }
    }
}
