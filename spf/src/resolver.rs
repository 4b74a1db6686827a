//! Seam between the evaluator and whatever answers its DNS queries (spec
//! §4.6's "every DNS wait parks the filter context"). [`policy_dns::DnsGateway`]
//! is the only production implementation; tests substitute a canned
//! responder so the evaluator's mechanism/macro/limit logic (spec §8's
//! SPF scenarios and DNS-budget invariant) can run without a resolver.

use std::future::Future;
use std::pin::Pin;

use policy_dns::{CheckOutcome, DnsGateway, DnsQuery};

/// Object-safe resolver seam: anything that can answer one [`DnsQuery`]
/// at a time with a normalized [`CheckOutcome`].
pub trait Resolver: Send + Sync {
    fn check<'a>(&'a self, query: DnsQuery) -> Pin<Box<dyn Future<Output = CheckOutcome> + Send + 'a>>;
}

impl Resolver for DnsGateway {
    fn check<'a>(&'a self, query: DnsQuery) -> Pin<Box<dyn Future<Output = CheckOutcome> + Send + 'a>> {
        Box::pin(DnsGateway::check(self, query))
    }
}
