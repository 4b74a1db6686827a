//! `spf` (spec §4.6): adapts one query into a [`spf::SpfRequest`] and
//! maps its [`spf::SpfResult`] onto the closed `Outcome` vocabulary.

use std::net::IpAddr;
use std::sync::Arc;

use policy_config_types::Outcome;
use policy_dns::DnsGateway;
use policy_message::{Field, Query};
use spf::{SpfRequest, SpfResult};

use crate::params::{ParamError, Params};

pub struct SpfFilter {
    dns: Arc<DnsGateway>,
    no_spf_lookup: bool,
    local_hostname: Option<String>,
}

impl SpfFilter {
    pub fn construct(params: &Params, dns: Arc<DnsGateway>) -> Result<SpfFilter, ParamError> {
        Ok(SpfFilter {
            dns,
            no_spf_lookup: params.bool_or("no_spf_lookup", false)?,
            local_hostname: params.get("local_hostname").map(|s| s.to_string()),
        })
    }

    pub fn possible_outcomes() -> &'static [Outcome] {
        &[
            Outcome::Pass,
            Outcome::Fail,
            Outcome::SoftFail,
            Outcome::Neutral,
            Outcome::None,
            Outcome::TempError,
            Outcome::PermError,
        ]
    }

    /// Runs the evaluation and, for a `Fail` with an `exp=` explanation,
    /// writes it into `explanation` (spec §3 FilterContext: "buffer for
    /// the explanation text a filter kind may produce").
    pub async fn run(&self, query: &Query<'_>, explanation: &mut Option<String>) -> Outcome {
        let ip: IpAddr = match query.field(Field::ClientAddress).parse() {
            Ok(ip) => ip,
            Err(_) => return Outcome::PermError,
        };

        let sender = query.field(Field::Sender);
        let helo = query.field(Field::HeloName);
        let sender_domain = query.field(Field::SenderDomain);
        let domain = if sender_domain.is_empty() {
            helo.to_string()
        } else {
            sender_domain.to_string()
        };

        let request = SpfRequest {
            ip,
            helo: helo.to_string(),
            sender: sender.to_string(),
            domain,
            no_spf_lookup: self.no_spf_lookup,
            local_hostname: self.local_hostname.clone(),
        };

        let outcome = spf::evaluate(self.dns.as_ref(), &request).await;
        if let Some(exp) = outcome.explanation {
            *explanation = Some(exp);
        }
        match outcome.result {
            SpfResult::Pass => Outcome::Pass,
            SpfResult::Fail => Outcome::Fail,
            SpfResult::SoftFail => Outcome::SoftFail,
            SpfResult::Neutral => Outcome::Neutral,
            SpfResult::None => Outcome::None,
            SpfResult::TempError => Outcome::TempError,
            SpfResult::PermError => Outcome::PermError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_spf_lookup_defaults_to_false() {
        let raw = vec![];
        assert_eq!(Params::new(&raw).bool_or("no_spf_lookup", false), Ok(false));
    }

    #[test]
    fn no_spf_lookup_true_is_parsed() {
        let raw = vec![("no_spf_lookup".to_string(), "true".to_string())];
        assert_eq!(Params::new(&raw).bool_or("no_spf_lookup", false), Ok(true));
    }
}
