//! `rate` (spec §4.8, supplement 6): a sliding-window hit counter keyed by
//! a query-format string, with independent soft/hard thresholds and
//! distinct `*_start` tokens for the hit that first crosses a threshold.

use policy_message::query_format;
use policy_message::Query;
use store::rate::RateStore;

use crate::params::Params;
use crate::resources::Resources;
use crate::time::unix_now;
use policy_config_types::Outcome;

pub struct RateFilter {
    store: RateStore,
    key_format: String,
    window_seconds: i64,
    soft_threshold: Option<u32>,
    hard_threshold: Option<u32>,
    namespace: String,
}

impl RateFilter {
    pub fn construct(
        name: &str,
        params: &Params,
        resources: &mut dyn Resources,
    ) -> anyhow::Result<RateFilter> {
        let db_path = params.get("db").unwrap_or("");
        let key_format = params.required_str("key")?.to_string();
        policy_message::validate_format(&key_format)?;
        let window_seconds = params.parse_or("delay", 60i64)?;
        let soft_threshold = params.parse("soft_threshold")?;
        let hard_threshold = params.parse("hard_threshold")?;
        let handle = resources.acquire_store(db_path)?;
        Ok(RateFilter {
            store: RateStore::new((*handle).clone()),
            key_format,
            window_seconds,
            soft_threshold,
            hard_threshold,
            namespace: name.to_string(),
        })
    }

    pub fn possible_outcomes() -> &'static [Outcome] {
        &[
            Outcome::HardMatchStart,
            Outcome::HardMatch,
            Outcome::SoftMatchStart,
            Outcome::SoftMatch,
            Outcome::Pass,
            Outcome::Error,
        ]
    }

    pub fn run(&self, query: &Query<'_>) -> Outcome {
        let key = match query_format(Some(query), &self.key_format) {
            Ok(key) => key,
            Err(err) => {
                tracing::warn!(%err, "rate: key query-format expansion failed");
                return Outcome::Error;
            }
        };

        let (before, after) = match self.store.hit(unix_now(), &key, self.window_seconds, &self.namespace) {
            Ok(sums) => sums,
            Err(err) => {
                tracing::warn!(%err, "rate: store hit failed");
                return Outcome::Error;
            }
        };

        if let Some(hard) = self.hard_threshold {
            if after >= hard {
                return if before < hard {
                    Outcome::HardMatchStart
                } else {
                    Outcome::HardMatch
                };
            }
        }
        if let Some(soft) = self.soft_threshold {
            if after >= soft {
                return if before < soft {
                    Outcome::SoftMatchStart
                } else {
                    Outcome::SoftMatch
                };
            }
        }
        Outcome::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::StandaloneResources;

    fn filter() -> RateFilter {
        let raw = vec![
            ("key".to_string(), "${client_address}".to_string()),
            ("delay".to_string(), "60".to_string()),
            ("soft_threshold".to_string(), "3".to_string()),
            ("hard_threshold".to_string(), "5".to_string()),
        ];
        let mut resources = StandaloneResources::default();
        RateFilter::construct("rate_1", &Params::new(&raw), &mut resources).unwrap()
    }

    fn query() -> Query<'static> {
        let mut unknown = Vec::new();
        Query::parse("protocol_state=RCPT\nclient_address=1.2.3.4\n", &mut unknown).unwrap()
    }

    #[test]
    fn six_hits_reproduce_spec_scenario_five() {
        let f = filter();
        let q = query();
        let outcomes: Vec<Outcome> = (0..6).map(|_| f.run(&q)).collect();
        assert_eq!(
            outcomes,
            vec![
                Outcome::Pass,
                Outcome::Pass,
                Outcome::SoftMatchStart,
                Outcome::SoftMatch,
                Outcome::HardMatchStart,
                Outcome::HardMatch,
            ]
        );
    }
}
