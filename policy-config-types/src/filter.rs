use crate::outcome::Outcome;

/// The terminal-or-jump target of a hook, with filters still referenced
/// by name (spec §4.5: "resolve hook references by filter name").
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawAction {
    /// `postfix:REPLY_TEXT` — a terminal MTA reply.
    Reply(String),
    /// The name of another filter to jump to.
    Next(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawHook {
    pub token: Outcome,
    pub action: RawAction,
    /// `(counter index, cost)`, bumped when this hook fires (spec §4.4).
    pub counter: Option<(usize, i64)>,
    /// Query-format string logged at warning level before the hook fires.
    pub warn: Option<String>,
}

/// A filter declaration as parsed straight out of the DSL, before names
/// are resolved to indices and before the kind's constructor has
/// consumed `params` (spec §4.5).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFilter {
    pub name: String,
    pub kind: String,
    /// In declaration order; a kind's constructor may require a
    /// parameter to appear at most once, which is a kind-specific
    /// validation performed in `policy-filters`, not here.
    pub params: Vec<(String, String)>,
    pub hooks: Vec<RawHook>,
}

/// The jump target of a resolved hook: either a terminal reply or the
/// index of another filter in [`crate::Config::filters`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Reply(String),
    Next(usize),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hook {
    pub token: Outcome,
    pub action: Action,
    pub counter: Option<(usize, i64)>,
    pub warn: Option<String>,
}

/// A filter declaration with its hook table sorted by token id (spec
/// §4.4: "Hook table. Sorted by token id at construction. Dispatch is
/// binary search") and its jump targets resolved to array indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedFilter {
    pub name: String,
    pub kind: String,
    pub params: Vec<(String, String)>,
    pub hooks: Vec<Hook>,
}

impl ResolvedFilter {
    /// Binary-searches the sorted hook table, following the outcome
    /// forwarding table on a miss (spec §4.4).
    pub fn lookup(&self, mut outcome: Outcome) -> Option<&Hook> {
        loop {
            if let Ok(idx) = self
                .hooks
                .binary_search_by_key(&token_id(outcome), |h| token_id(h.token))
            {
                return Some(&self.hooks[idx]);
            }
            match outcome.forwards_to() {
                Some(next) => outcome = next,
                None => return None,
            }
        }
    }
}

pub fn token_id(o: Outcome) -> usize {
    Outcome::ALL.iter().position(|&x| x == o).unwrap()
}

pub fn sort_hooks(hooks: &mut [Hook]) {
    hooks.sort_by_key(|h| token_id(h.token));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter_with(hooks: Vec<Hook>) -> ResolvedFilter {
        let mut hooks = hooks;
        sort_hooks(&mut hooks);
        ResolvedFilter {
            name: "f".into(),
            kind: "k".into(),
            params: vec![],
            hooks,
        }
    }

    #[test]
    fn lookup_finds_exact_token() {
        let f = filter_with(vec![Hook {
            token: Outcome::Pass,
            action: Action::Reply("OK".into()),
            counter: None,
            warn: None,
        }]);
        assert!(matches!(f.lookup(Outcome::Pass), Some(_)));
    }

    #[test]
    fn lookup_falls_back_through_forwarding_table() {
        let f = filter_with(vec![Hook {
            token: Outcome::HardMatch,
            action: Action::Reply("REJECT".into()),
            counter: None,
            warn: None,
        }]);
        // soft_match has no direct hook, but forwards to hard_match.
        assert!(f.lookup(Outcome::SoftMatch).is_some());
    }

    #[test]
    fn lookup_misses_when_nothing_in_the_forwarding_chain_matches() {
        let f = filter_with(vec![Hook {
            token: Outcome::Pass,
            action: Action::Reply("OK".into()),
            counter: None,
            warn: None,
        }]);
        assert!(f.lookup(Outcome::Fail).is_none());
    }
}
