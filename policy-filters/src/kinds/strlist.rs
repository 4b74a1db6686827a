//! `strlist` (spec §4.9): weighted matching of one query field against
//! any number of static sets (local tries) and DNS RHBL lists, summed
//! into a single score compared against soft/hard thresholds.

use std::sync::Arc;

use futures::future::join_all;
use policy_dns::{CheckOutcome, DnsGateway, DnsQuery};
use policy_message::{Field, Query};

use crate::params::Params;
use crate::resources::Resources;
use crate::trie::{MatchMode, Orientation, StaticSet};
use policy_config_types::Outcome;

struct SetEntry {
    set: Arc<StaticSet>,
    weight: i64,
}

struct ListEntry {
    suffix: String,
    weight: i64,
}

/// Splits a `suffix:weight` RHBL list parameter value, defaulting the
/// weight to 1 when no `:weight` suffix is present.
fn split_weight(raw: &str) -> (&str, i64) {
    match raw.rsplit_once(':').and_then(|(head, tail)| tail.parse::<i64>().ok().map(|w| (head, w))) {
        Some((head, weight)) => (head, weight),
        None => (raw, 1),
    }
}

/// Parses one `set = path[:weight][:orientation=prefix|suffix][:mode=full|prefix];`
/// value. `path` is the only required field; the rest default to the
/// weight-1, suffix-oriented, prefix-match set every `set` used to be
/// hardcoded to, so existing `path` / `path:weight` configs keep their
/// old meaning (spec §4.9: "A set can be declared with prefix or suffix
/// orientation and as full-match or prefix-match").
fn parse_set_spec(raw: &str) -> (&str, i64, Orientation, MatchMode) {
    let mut fields = raw.split(':');
    let path = fields.next().unwrap_or("");
    let mut weight = 1i64;
    let mut orientation = Orientation::Suffix;
    let mut mode = MatchMode::Prefix;
    for field in fields {
        if let Some(value) = field.strip_prefix("orientation=") {
            match value {
                "prefix" => orientation = Orientation::Prefix,
                "suffix" => orientation = Orientation::Suffix,
                _ => {}
            }
        } else if let Some(value) = field.strip_prefix("mode=") {
            match value {
                "full" => mode = MatchMode::Full,
                "prefix" => mode = MatchMode::Prefix,
                _ => {}
            }
        } else if let Ok(w) = field.parse::<i64>() {
            weight = w;
        }
    }
    (path, weight, orientation, mode)
}

/// Formats the DNS name one list lookup issues for `value` (spec §4.9:
/// "`<field>.<list>.`"). IPv4 dotted-quad values are reversed first, the
/// standard DNSBL/RHBL query-name convention; any other value (a
/// hostname) is used as-is.
fn list_query_name(value: &str, suffix: &str) -> String {
    let octets: Vec<&str> = value.split('.').collect();
    let key = if octets.len() == 4 && octets.iter().all(|o| o.parse::<u8>().is_ok()) {
        octets.into_iter().rev().collect::<Vec<_>>().join(".")
    } else {
        value.to_string()
    };
    format!("{}.{}.", key, suffix.trim_end_matches('.'))
}

pub struct StrlistFilter {
    field: Field,
    sets: Vec<SetEntry>,
    lists: Vec<ListEntry>,
    soft_threshold: i64,
    hard_threshold: i64,
    dns: Option<Arc<DnsGateway>>,
}

impl StrlistFilter {
    pub fn construct(
        params: &Params,
        resources: &mut dyn Resources,
        dns: Arc<DnsGateway>,
    ) -> anyhow::Result<StrlistFilter> {
        let field_name = params.get("field").unwrap_or("client_address");
        let field = Field::from_attr(field_name)
            .ok_or_else(|| anyhow::anyhow!("strlist: unrecognized field {:?}", field_name))?;

        let mut sets = Vec::new();
        for raw in params.all("set") {
            let (path, weight, orientation, mode) = parse_set_spec(raw);
            let set = resources.acquire_static_set(path, orientation, mode)?;
            sets.push(SetEntry { set, weight });
        }

        let mut lists = Vec::new();
        for raw in params.all("list") {
            let (suffix, weight) = split_weight(raw);
            lists.push(ListEntry {
                suffix: suffix.to_string(),
                weight,
            });
        }

        let soft_threshold = params.parse_or("soft_threshold", i64::MAX)?;
        let hard_threshold = params.parse_or("hard_threshold", i64::MAX)?;

        Ok(StrlistFilter {
            field,
            sets,
            lists,
            soft_threshold,
            hard_threshold,
            dns: Some(dns),
        })
    }

    pub fn possible_outcomes() -> &'static [Outcome] {
        &[Outcome::HardMatch, Outcome::SoftMatch, Outcome::Pass, Outcome::Error]
    }

    pub async fn run(&self, query: &Query<'_>) -> Outcome {
        let value = query.field(self.field);
        if value.is_empty() {
            return Outcome::Pass;
        }

        let mut weight: i64 = 0;
        for entry in &self.sets {
            if entry.set.contains(value) {
                weight += entry.weight;
            }
        }

        if !self.lists.is_empty() {
            let dns = self
                .dns
                .as_ref()
                .expect("strlist configured with DNS lists requires a DNS gateway");
            let lookups = self.lists.iter().map(|entry| {
                let name = list_query_name(value, &entry.suffix);
                let dns = Arc::clone(dns);
                async move { (entry.weight, dns.check(DnsQuery::A(name)).await) }
            });
            let results = join_all(lookups).await;
            let mut any_succeeded = false;
            for (list_weight, outcome) in results {
                match outcome {
                    CheckOutcome::Found(_) => {
                        weight += list_weight;
                        any_succeeded = true;
                    }
                    CheckOutcome::NotFound => any_succeeded = true,
                    CheckOutcome::Error => {}
                }
            }
            if !any_succeeded {
                return Outcome::Error;
            }
        }

        if weight >= self.hard_threshold {
            Outcome::HardMatch
        } else if weight >= self.soft_threshold {
            Outcome::SoftMatch
        } else {
            Outcome::Pass
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_name_reverses_ipv4_octets() {
        assert_eq!(list_query_name("1.2.3.4", "rbl.example"), "4.3.2.1.rbl.example.");
    }

    #[test]
    fn list_query_name_leaves_hostnames_untouched() {
        assert_eq!(list_query_name("bad.example.net", "uribl.example"), "bad.example.net.uribl.example.");
    }

    #[test]
    fn split_weight_defaults_to_one() {
        assert_eq!(split_weight("/etc/policyd/bad.hosts"), ("/etc/policyd/bad.hosts", 1));
        assert_eq!(split_weight("rbl.example:3"), ("rbl.example", 3));
    }

    #[test]
    fn parse_set_spec_defaults_match_the_old_hardcoded_set_behavior() {
        let (path, weight, orientation, mode) = parse_set_spec("/etc/policyd/bad.hosts");
        assert_eq!(path, "/etc/policyd/bad.hosts");
        assert_eq!(weight, 1);
        assert_eq!(orientation, Orientation::Suffix);
        assert_eq!(mode, MatchMode::Prefix);
    }

    #[test]
    fn parse_set_spec_reads_weight_orientation_and_mode() {
        let (path, weight, orientation, mode) = parse_set_spec("/etc/policyd/ips:7:orientation=prefix:mode=full");
        assert_eq!(path, "/etc/policyd/ips");
        assert_eq!(weight, 7);
        assert_eq!(orientation, Orientation::Prefix);
        assert_eq!(mode, MatchMode::Full);
    }

    #[test]
    fn parse_set_spec_fields_are_order_independent() {
        let (path, weight, orientation, mode) = parse_set_spec("/etc/policyd/ips:mode=full:orientation=prefix:7");
        assert_eq!(path, "/etc/policyd/ips");
        assert_eq!(weight, 7);
        assert_eq!(orientation, Orientation::Prefix);
        assert_eq!(mode, MatchMode::Full);
    }

    #[test]
    fn static_set_match_crosses_hard_threshold() {
        let set = Arc::new(StaticSet::build(
            vec!["example.net".to_string()],
            Orientation::Suffix,
            MatchMode::Prefix,
        ));
        let filter = StrlistFilter {
            field: Field::ClientName,
            sets: vec![SetEntry { set, weight: 5 }],
            lists: vec![],
            soft_threshold: 3,
            hard_threshold: 5,
            dns: None,
        };
        let mut unknown = Vec::new();
        let q = Query::parse("protocol_state=RCPT\nclient_name=mail.example.net\n", &mut unknown).unwrap();
        let outcome = smol::block_on(filter.run(&q));
        assert_eq!(outcome, Outcome::HardMatch);
    }

    #[test]
    fn empty_field_value_passes_without_consulting_sets_or_lists() {
        let filter = StrlistFilter {
            field: Field::ClientName,
            sets: vec![],
            lists: vec![],
            soft_threshold: 1,
            hard_threshold: 1,
            dns: None,
        };
        let mut unknown = Vec::new();
        let q = Query::parse("protocol_state=RCPT\n", &mut unknown).unwrap();
        assert_eq!(smol::block_on(filter.run(&q)), Outcome::Pass);
    }
}
