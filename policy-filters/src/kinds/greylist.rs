//! `greylist` (spec §4.7, supplement 5): triplet-based greylisting with a
//! per-client auto-whitelist. The resource handle is acquired once at
//! construction time and shared with every other filter citing the same
//! `db` path (spec §3 Resource).

use policy_config_types::Outcome;
use policy_message::{Field, Query};
use store::greylist::{Decision, GreylistStore};

use crate::params::Params;
use crate::resources::Resources;
use crate::time::unix_now;

pub struct GreylistFilter {
    store: GreylistStore,
    delay: i64,
    max_age: i64,
    retry_window: i64,
    cleanup_period: i64,
    client_awl_threshold: Option<u32>,
}

impl GreylistFilter {
    pub fn construct(params: &Params, resources: &mut dyn Resources) -> anyhow::Result<GreylistFilter> {
        let db_path = params.get("db").unwrap_or("");
        let delay = params.parse_or("delay", 300i64)?;
        let max_age = params.parse_or("max_age", 36 * 3600i64)?;
        let retry_window = params.parse_or("retry_window", 2 * 3600i64)?;
        let cleanup_period = params.parse_or("cleanup_period", 24 * 3600i64)?;
        let client_awl_threshold = params.parse("client_awl")?;
        let handle = resources.acquire_store(db_path)?;
        Ok(GreylistFilter {
            store: GreylistStore::new((*handle).clone()),
            delay,
            max_age,
            retry_window,
            cleanup_period,
            client_awl_threshold,
        })
    }

    pub fn possible_outcomes() -> &'static [Outcome] {
        &[Outcome::Greylist, Outcome::Whitelist, Outcome::Error]
    }

    pub fn run(&self, query: &Query<'_>) -> Outcome {
        let now = unix_now();
        let client_address = query.field(Field::ClientAddress);

        if let Some(threshold) = self.client_awl_threshold {
            match self.store.check_awl(now, client_address, threshold) {
                Ok(true) => return Outcome::Whitelist,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(%err, "greylist: auto-whitelist lookup failed");
                    return Outcome::Error;
                }
            }
        }

        let client_class = query.field(Field::NormalizedClient);
        let sender_class = query.field(Field::NormalizedSender);
        let recipient = query.field(Field::Recipient);

        match self
            .store
            .check_triplet(now, client_class, sender_class, recipient, self.delay, self.max_age, self.retry_window)
        {
            Ok(Decision::Greylist) => Outcome::Greylist,
            Ok(Decision::Whitelist) => {
                if self.client_awl_threshold.is_some() {
                    if let Err(err) = self.store.record_maturity(now, client_address) {
                        tracing::warn!(%err, "greylist: failed to record auto-whitelist maturity");
                    }
                }
                Outcome::Whitelist
            }
            Err(err) => {
                tracing::warn!(%err, "greylist: triplet lookup failed");
                Outcome::Error
            }
        }
    }

    /// Amortized cleanup, called once per query by the engine before
    /// `run` (spec §4.7): cheap no-op unless `cleanup_period` has
    /// elapsed since the last sweep.
    pub fn maybe_cleanup(&self) {
        let now = unix_now();
        if let Err(err) = self.store.cleanup(now, self.cleanup_period, self.max_age) {
            tracing::warn!(%err, "greylist: cleanup sweep failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::StandaloneResources;

    fn filter(params: &[(String, String)]) -> GreylistFilter {
        let mut resources = StandaloneResources::default();
        GreylistFilter::construct(&Params::new(params), &mut resources).unwrap()
    }

    #[test]
    fn first_contact_greylists() {
        let f = filter(&[]);
        let mut unknown = Vec::new();
        let q = Query::parse(
            "protocol_state=RCPT\nclient_address=1.2.3.4\nsender=a@b.com\nrecipient=c@d.com\n",
            &mut unknown,
        )
        .unwrap();
        assert_eq!(f.run(&q), Outcome::Greylist);
    }

    #[test]
    fn missing_client_awl_threshold_skips_awl_check() {
        let f = filter(&[]);
        assert!(f.client_awl_threshold.is_none());
    }
}
