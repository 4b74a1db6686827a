//! `counter` (supplement 7): compares one `FilterContext` counter slot
//! against configured thresholds, with no I/O of its own. Exists so a
//! chain can branch on cost accumulated by earlier hooks' `(counter,
//! cost)` bumps (spec §4.4) without re-deriving the total inline.

use crate::counters::Counters;
use crate::params::{ParamError, Params};
use policy_config_types::Outcome;

pub struct CounterFilter {
    index: usize,
    soft_threshold: Option<i64>,
    hard_threshold: Option<i64>,
}

impl CounterFilter {
    pub fn construct(params: &Params) -> Result<CounterFilter, ParamError> {
        Ok(CounterFilter {
            index: params.parse_required("index")?,
            soft_threshold: params.parse("soft_threshold")?,
            hard_threshold: params.parse("hard_threshold")?,
        })
    }

    pub fn possible_outcomes() -> &'static [Outcome] {
        &[Outcome::HardMatch, Outcome::SoftMatch, Outcome::Fail]
    }

    pub fn run(&self, counters: &Counters) -> Outcome {
        let value = counters.get(self.index);
        if let Some(hard) = self.hard_threshold {
            if value >= hard {
                return Outcome::HardMatch;
            }
        }
        if let Some(soft) = self.soft_threshold {
            if value >= soft {
                return Outcome::SoftMatch;
            }
        }
        Outcome::Fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(soft: &str, hard: &str) -> CounterFilter {
        let raw = vec![
            ("index".to_string(), "0".to_string()),
            ("soft_threshold".to_string(), soft.to_string()),
            ("hard_threshold".to_string(), hard.to_string()),
        ];
        CounterFilter::construct(&Params::new(&raw)).unwrap()
    }

    #[test]
    fn below_both_thresholds_fails() {
        let f = filter("5", "10");
        let mut c = Counters::default();
        c.bump(0, 1);
        assert_eq!(f.run(&c), Outcome::Fail);
    }

    #[test]
    fn crossing_hard_threshold_wins_over_soft() {
        let f = filter("5", "10");
        let mut c = Counters::default();
        c.bump(0, 10);
        assert_eq!(f.run(&c), Outcome::HardMatch);
    }

    #[test]
    fn crossing_only_soft_threshold() {
        let f = filter("5", "10");
        let mut c = Counters::default();
        c.bump(0, 6);
        assert_eq!(f.run(&c), Outcome::SoftMatch);
    }
}
