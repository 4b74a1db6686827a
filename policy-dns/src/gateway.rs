use std::net::IpAddr;

use async_std_resolver::AsyncStdResolver;
use smol::lock::Semaphore;
use std::sync::Arc;
use trust_dns_resolver::{
    config::{ResolverConfig, ResolverOpts},
    error::ResolveErrorKind,
    proto::rr::{RData, RecordType},
};

use crate::query::{CheckOutcome, DnsQuery, RecordData};

/// One process-wide resolver context (spec §4.2: "One process-wide
/// resolver context with an asynchronous interface"). The bounded
/// semaphore plays the role of the "bounded pool of context objects" the
/// spec describes for the callback-driven original: in the async/await
/// realization, the continuation *is* the suspended future, so the pool
/// only needs to cap how many lookups are in flight at once.
pub struct DnsGateway {
    resolver: AsyncStdResolver,
    permits: Arc<Semaphore>,
}

const DEFAULT_MAX_IN_FLIGHT: usize = 256;

impl DnsGateway {
    pub async fn from_system_conf() -> anyhow::Result<DnsGateway> {
        let resolver = async_std_resolver::resolver_from_system_conf()
            .await
            .map_err(|e| anyhow::anyhow!("configuring the resolver from system config: {}", e))?;
        Ok(DnsGateway {
            resolver,
            permits: Arc::new(Semaphore::new(DEFAULT_MAX_IN_FLIGHT)),
        })
    }

    pub async fn with_config(config: ResolverConfig, opts: ResolverOpts) -> anyhow::Result<DnsGateway> {
        let resolver = async_std_resolver::resolver(config, opts)
            .await
            .map_err(|e| anyhow::anyhow!("configuring the resolver: {}", e))?;
        Ok(DnsGateway {
            resolver,
            permits: Arc::new(Semaphore::new(DEFAULT_MAX_IN_FLIGHT)),
        })
    }

    /// Issues one query and normalizes the result to Found/NotFound/Error
    /// (spec §4.2). Suspension across the DNS wait is the `.await` point
    /// itself; the caller (a filter runner) simply calls this from an
    /// async fn and the executor parks the connection's task until the
    /// resolver's socket becomes readable and dispatches the reply.
    pub async fn check(&self, query: DnsQuery) -> CheckOutcome {
        let _permit = self.permits.acquire().await;
        let kind = query.kind();
        let name = query.name().map(|n| n.to_string());
        let result = self.run(query).await;
        match &result {
            CheckOutcome::Error => {
                tracing::debug!(kind, name = name.as_deref().unwrap_or("?"), "dns query errored");
            }
            CheckOutcome::NotFound => {
                tracing::trace!(kind, name = name.as_deref().unwrap_or("?"), "dns query: not found");
            }
            CheckOutcome::Found(records) => {
                tracing::trace!(kind, count = records.len(), "dns query: found");
            }
        }
        result
    }

    async fn run(&self, query: DnsQuery) -> CheckOutcome {
        match query {
            DnsQuery::A(name) => normalize(self.resolver.ipv4_lookup(name).await, |lookup| {
                lookup
                    .iter()
                    .map(|ip| RecordData::Ip(IpAddr::V4(*ip)))
                    .collect()
            }),
            DnsQuery::Aaaa(name) => normalize(self.resolver.ipv6_lookup(name).await, |lookup| {
                lookup
                    .iter()
                    .map(|ip| RecordData::Ip(IpAddr::V6(*ip)))
                    .collect()
            }),
            DnsQuery::Mx(name) => normalize(self.resolver.mx_lookup(name).await, |lookup| {
                lookup
                    .iter()
                    .map(|mx| RecordData::Mx {
                        preference: mx.preference(),
                        exchange: mx.exchange().to_utf8(),
                    })
                    .collect()
            }),
            DnsQuery::Txt(name) => normalize(self.resolver.txt_lookup(name).await, |lookup| {
                lookup.iter().map(|txt| RecordData::Txt(txt_to_string(txt))).collect()
            }),
            DnsQuery::Spf(name) => normalize(
                self.resolver.lookup(name, RecordType::Unknown(99)).await,
                |lookup| {
                    lookup
                        .iter()
                        .filter_map(|rdata| match rdata {
                            RData::Unknown { rdata, .. } => {
                                Some(RecordData::Txt(String::from_utf8_lossy(rdata.anything()).into_owned()))
                            }
                            RData::TXT(txt) => Some(RecordData::Txt(txt_to_string(txt))),
                            _ => None,
                        })
                        .collect()
                },
            ),
            DnsQuery::Ptr(ip) => normalize(self.resolver.reverse_lookup(ip).await, |lookup| {
                lookup
                    .iter()
                    .map(|name| RecordData::Ptr(name.to_utf8()))
                    .collect()
            }),
        }
    }
}

fn txt_to_string(txt: &trust_dns_resolver::proto::rr::rdata::TXT) -> String {
    txt.iter()
        .map(|chunk| String::from_utf8_lossy(chunk))
        .collect::<Vec<_>>()
        .concat()
}

fn normalize<T, F>(result: Result<T, trust_dns_resolver::error::ResolveError>, extract: F) -> CheckOutcome
where
    F: FnOnce(T) -> Vec<RecordData>,
{
    match result {
        Ok(lookup) => {
            let records = extract(lookup);
            if records.is_empty() {
                CheckOutcome::NotFound
            } else {
                CheckOutcome::Found(records)
            }
        }
        Err(e) => match e.kind() {
            ResolveErrorKind::NoRecordsFound { .. } => CheckOutcome::NotFound,
            _ => CheckOutcome::Error,
        },
    }
}
