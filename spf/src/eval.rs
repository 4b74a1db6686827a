use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::pin::Pin;

use policy_dns::{CheckOutcome, DnsQuery, RecordData};

use crate::cidr::{ipv4_matches, ipv6_matches};
use crate::domain::validate_domain;
use crate::macros::{self, MacroContext};
use crate::record::{Directive, Mechanism, MechanismKind, Modifier, Record};
use crate::resolver::Resolver;
use crate::result::{SpfOutcome, SpfResult};

const MAX_DNS_MECHANISMS: u32 = 10;
const MAX_RECURSION: u32 = 15;
const MAX_MX_RECORDS: usize = 10;
const MAX_PTR_NAMES: usize = 10;

/// The fixed per-query inputs to one SPF evaluation (spec §4.6 "Given
/// (ip, helo, sender, mail_from_domain)").
#[derive(Clone, Debug)]
pub struct SpfRequest {
    pub ip: IpAddr,
    pub helo: String,
    pub sender: String,
    pub domain: String,
    pub no_spf_lookup: bool,
    /// This policy daemon's own hostname, used for the `exp=` context's
    /// `%{r}` macro. Falls back to `"unknown"` when not configured.
    pub local_hostname: Option<String>,
}

/// Evaluation-wide counters threaded through recursive `include`/
/// `redirect` calls: the shared DNS-mechanism budget, recursion depth,
/// and the cached validated PTR name (spec §4.6, supplement 9).
struct EvalState {
    dns_mechanisms_used: u32,
    recursion_depth: u32,
    validated_name: Option<String>,
}

impl EvalState {
    fn bump(&mut self) -> bool {
        self.dns_mechanisms_used += 1;
        self.dns_mechanisms_used <= MAX_DNS_MECHANISMS
    }
}

fn normalize_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        },
        v4 => v4,
    }
}

/// Entry point (spec §4.6 "Entry"). Normalizes the sender, validates
/// `request.domain`, fetches and selects the SPF record, walks the rule
/// list, and — on an overall `Fail` — attempts to fetch the `exp=`
/// explanation.
pub async fn evaluate(dns: &dyn Resolver, request: &SpfRequest) -> SpfOutcome {
    if !validate_domain(&request.domain) {
        return SpfOutcome::new(SpfResult::None);
    }
    let ip = normalize_ip(request.ip);
    let sender = if request.sender.is_empty() {
        format!("postmaster@{}", request.helo)
    } else {
        request.sender.clone()
    };

    let record = match fetch_record(dns, &request.domain, request.no_spf_lookup).await {
        Ok(record) => record,
        Err(result) => return SpfOutcome::new(result),
    };

    let mut state = EvalState {
        dns_mechanisms_used: 0,
        recursion_depth: 0,
        validated_name: None,
    };

    let (result, exp) = eval_directives(
        dns,
        &mut state,
        &record,
        &request.domain,
        ip,
        &sender,
        &request.helo,
    )
    .await;

    if result == SpfResult::Fail {
        if let Some(exp_domain) = exp {
            if let Ok(text) = fetch_explanation(
                dns,
                &mut state,
                &exp_domain,
                &request.domain,
                ip,
                &sender,
                &request.helo,
                request.local_hostname.as_deref().unwrap_or("unknown"),
            )
            .await
            {
                return SpfOutcome::with_explanation(result, text);
            }
        }
    }
    SpfOutcome::new(result)
}

async fn fetch_record(dns: &dyn Resolver, domain: &str, no_spf_lookup: bool) -> Result<Record, SpfResult> {
    let spf_outcome = if no_spf_lookup {
        CheckOutcome::NotFound
    } else {
        dns.check(DnsQuery::Spf(domain.to_string())).await
    };
    let candidates = match spf_outcome {
        CheckOutcome::Error => return Err(SpfResult::TempError),
        CheckOutcome::Found(records) => {
            let matches = filter_spf_texts(records);
            if !matches.is_empty() {
                matches
            } else {
                fetch_txt_candidates(dns, domain).await?
            }
        }
        CheckOutcome::NotFound => fetch_txt_candidates(dns, domain).await?,
    };

    if candidates.is_empty() {
        return Err(SpfResult::None);
    }
    if candidates.len() > 1 {
        return Err(SpfResult::PermError);
    }
    let body = candidates[0]
        .strip_prefix("v=spf1")
        .unwrap_or(&candidates[0])
        .trim_start();
    Ok(Record::parse(body))
}

async fn fetch_txt_candidates(dns: &dyn Resolver, domain: &str) -> Result<Vec<String>, SpfResult> {
    match dns.check(DnsQuery::Txt(domain.to_string())).await {
        CheckOutcome::Error => Err(SpfResult::TempError),
        CheckOutcome::Found(records) => Ok(filter_spf_texts(records)),
        CheckOutcome::NotFound => Ok(Vec::new()),
    }
}

fn filter_spf_texts(records: Vec<RecordData>) -> Vec<String> {
    records
        .into_iter()
        .filter_map(|r| match r {
            RecordData::Txt(s) => {
                if s == "v=spf1" || s.starts_with("v=spf1 ") {
                    Some(s)
                } else {
                    None
                }
            }
            _ => None,
        })
        .collect()
}

fn macro_ctx<'a>(domain: &'a str, ip: IpAddr, sender: &'a str, helo: &'a str, validated_name: Option<&'a str>) -> MacroContext<'a> {
    MacroContext {
        sender,
        domain,
        ip,
        validated_name,
        helo,
        exp_local_hostname: None,
        exp_unix_time: None,
    }
}

enum MechOutcome {
    Match,
    NoMatch,
    /// `a`/`mx`/`ptr` per spec §4.6: recorded as tentative and overridable
    /// by a later mechanism that actually matches.
    TempError,
    /// `include`/`exists` per spec §4.6: propagates as the overall result
    /// immediately, since the lookup needed to decide it failed outright
    /// rather than merely finding no match.
    ImmediateTempError,
    PermError,
}

/// Walks one record's directives in order (spec §4.6 "Mechanism
/// evaluation"); returns the result plus, if an `exp=` modifier was seen
/// and survives (no `redirect=` discarded it), its unexpanded domain-spec
/// for the caller to fetch only on an overall `Fail`.
fn eval_directives<'a>(
    dns: &'a dyn Resolver,
    state: &'a mut EvalState,
    record: &'a Record,
    domain: &'a str,
    ip: IpAddr,
    sender: &'a str,
    helo: &'a str,
) -> Pin<Box<dyn Future<Output = (SpfResult, Option<String>)> + Send + 'a>> {
    Box::pin(async move {
        let mut redirect = None;
        let mut exp = None;
        let mut tentative_temperror = false;

        for directive in &record.directives {
            let directive = match directive {
                Ok(d) => d,
                Err(()) => return (SpfResult::PermError, None),
            };
            match directive {
                Directive::Modifier(Modifier::Redirect(dom)) => {
                    if redirect.is_some() {
                        // A modifier name must not repeat; reaching a second
                        // occurrence is a syntax error at that point in the
                        // record (spec §4.6 "Record parsing").
                        return (SpfResult::PermError, None);
                    }
                    redirect = Some(dom.clone());
                }
                Directive::Modifier(Modifier::Exp(dom)) => {
                    if exp.is_some() {
                        return (SpfResult::PermError, None);
                    }
                    exp = Some(dom.clone());
                }
                Directive::Modifier(Modifier::Unknown(_, _)) => {}
                Directive::Mechanism(m) => {
                    match eval_mechanism(dns, state, m, domain, ip, sender, helo).await {
                        MechOutcome::Match => return (m.qualifier.as_result(), exp),
                        MechOutcome::NoMatch => {}
                        MechOutcome::TempError => tentative_temperror = true,
                        MechOutcome::ImmediateTempError => return (SpfResult::TempError, exp),
                        MechOutcome::PermError => return (SpfResult::PermError, None),
                    }
                }
            }
        }

        if let Some(redirect_domain) = redirect {
            // redirect= takes over the result and drops any prior exp=.
            if mentions_validated_name(&redirect_domain) {
                ensure_validated_name(dns, state, ip).await;
            }
            let ctx = macro_ctx(domain, ip, sender, helo, state.validated_name.as_deref());
            let expanded = match macros::expand(&redirect_domain, &ctx) {
                Ok(d) if validate_domain(&d) => d,
                _ => return (SpfResult::PermError, None),
            };
            if !state.bump() {
                return (SpfResult::PermError, None);
            }
            state.recursion_depth += 1;
            if state.recursion_depth > MAX_RECURSION {
                return (SpfResult::PermError, None);
            }
            let result = match fetch_record(dns, &expanded, false).await {
                Ok(sub_record) => {
                    eval_directives(dns, state, &sub_record, &expanded, ip, sender, helo)
                        .await
                        .0
                }
                Err(SpfResult::None) => SpfResult::PermError,
                Err(other) => other,
            };
            state.recursion_depth -= 1;
            return (result, None);
        }

        if tentative_temperror {
            (SpfResult::TempError, exp)
        } else {
            (SpfResult::Neutral, exp)
        }
    })
}

async fn eval_mechanism(
    dns: &dyn Resolver,
    state: &mut EvalState,
    m: &Mechanism,
    domain: &str,
    ip: IpAddr,
    sender: &str,
    helo: &str,
) -> MechOutcome {
    match m.kind {
        MechanismKind::All => MechOutcome::Match,
        MechanismKind::Ip4 => match (ip, m.domain_spec.as_deref().and_then(|s| s.parse::<Ipv4Addr>().ok())) {
            (IpAddr::V4(ip4), Some(net)) => {
                if ipv4_matches(ip4, net, m.cidr.v4) {
                    MechOutcome::Match
                } else {
                    MechOutcome::NoMatch
                }
            }
            (IpAddr::V4(_), None) => MechOutcome::PermError,
            (IpAddr::V6(_), _) => MechOutcome::NoMatch,
        },
        MechanismKind::Ip6 => match (ip, m.domain_spec.as_deref().and_then(|s| s.parse::<Ipv6Addr>().ok())) {
            (IpAddr::V6(ip6), Some(net)) => {
                if ipv6_matches(ip6, net, m.cidr.v6) {
                    MechOutcome::Match
                } else {
                    MechOutcome::NoMatch
                }
            }
            (IpAddr::V6(_), None) => MechOutcome::PermError,
            (IpAddr::V4(_), _) => MechOutcome::NoMatch,
        },
        MechanismKind::A => eval_a_or_mx(dns, state, m, domain, ip, sender, helo, false).await,
        MechanismKind::Mx => eval_a_or_mx(dns, state, m, domain, ip, sender, helo, true).await,
        MechanismKind::Ptr => eval_ptr(dns, state, m, domain, ip, sender, helo).await,
        MechanismKind::Include => eval_include(dns, state, m, domain, ip, sender, helo).await,
        MechanismKind::Exists => eval_exists(dns, state, m, domain, ip, sender, helo).await,
    }
}

fn expand_domain_spec(
    m: &Mechanism,
    domain: &str,
    ip: IpAddr,
    sender: &str,
    helo: &str,
    validated_name: Option<&str>,
) -> Result<String, ()> {
    match &m.domain_spec {
        Some(spec) => {
            let ctx = macro_ctx(domain, ip, sender, helo, validated_name);
            let expanded = macros::expand(spec, &ctx)?;
            if validate_domain(&expanded) {
                Ok(expanded)
            } else {
                Err(())
            }
        }
        None => Ok(domain.to_string()),
    }
}

/// Whether `spec` references the `%{p}` validated-domain-name macro
/// (case-insensitive, as `P` is the uppercase/url-escaped spelling).
fn mentions_validated_name(spec: &str) -> bool {
    spec.to_ascii_lowercase().contains("%{p")
}

/// Resolves and caches the PTR "validated domain name" (spec §4.6,
/// supplement 9: `%{p}` "triggers PTR resolution if none is cached yet")
/// if `state` does not already have one. A lookup failure or no PTR
/// record at all simply leaves the cache empty, so `%{p}` falls back to
/// `"unknown"` as before.
async fn ensure_validated_name(dns: &dyn Resolver, state: &mut EvalState, ip: IpAddr) {
    if state.validated_name.is_some() {
        return;
    }
    let candidates = match dns.check(DnsQuery::Ptr(ip)).await {
        CheckOutcome::Found(records) => records
            .into_iter()
            .filter_map(|r| match r {
                RecordData::Ptr(name) => Some(name),
                _ => None,
            })
            .take(MAX_PTR_NAMES)
            .collect::<Vec<_>>(),
        _ => return,
    };
    for name in candidates {
        if addresses_match(dns, &name, ip).await == Some(true) {
            state.validated_name = Some(name);
            return;
        }
    }
}

async fn eval_a_or_mx(
    dns: &dyn Resolver,
    state: &mut EvalState,
    m: &Mechanism,
    domain: &str,
    ip: IpAddr,
    sender: &str,
    helo: &str,
    is_mx: bool,
) -> MechOutcome {
    if !state.bump() {
        return MechOutcome::PermError;
    }
    if m.domain_spec.as_deref().is_some_and(mentions_validated_name) {
        ensure_validated_name(dns, state, ip).await;
    }
    let target = match expand_domain_spec(m, domain, ip, sender, helo, state.validated_name.as_deref()) {
        Ok(t) => t,
        Err(()) => return MechOutcome::PermError,
    };

    let names: Vec<String> = if is_mx {
        match dns.check(DnsQuery::Mx(target)).await {
            CheckOutcome::Found(records) => records
                .into_iter()
                .filter_map(|r| match r {
                    RecordData::Mx { exchange, .. } => Some(exchange),
                    _ => None,
                })
                .take(MAX_MX_RECORDS)
                .collect(),
            CheckOutcome::NotFound => return MechOutcome::NoMatch,
            CheckOutcome::Error => return MechOutcome::TempError,
        }
    } else {
        vec![target]
    };

    let mut any_error = false;
    for name in names {
        match addresses_match(dns, &name, ip).await {
            Some(true) => return MechOutcome::Match,
            Some(false) => {}
            None => any_error = true,
        }
    }
    if any_error {
        MechOutcome::TempError
    } else {
        MechOutcome::NoMatch
    }
}

/// Resolves `name`'s A/AAAA records and checks whether any equals `ip`.
/// `None` means the lookup errored.
async fn addresses_match(dns: &dyn Resolver, name: &str, ip: IpAddr) -> Option<bool> {
    let outcome = match ip {
        IpAddr::V4(_) => dns.check(DnsQuery::A(name.to_string())).await,
        IpAddr::V6(_) => dns.check(DnsQuery::Aaaa(name.to_string())).await,
    };
    match outcome {
        CheckOutcome::Found(records) => Some(records.into_iter().any(|r| matches!(r, RecordData::Ip(found) if found == ip))),
        CheckOutcome::NotFound => Some(false),
        CheckOutcome::Error => None,
    }
}

async fn eval_ptr(
    dns: &dyn Resolver,
    state: &mut EvalState,
    m: &Mechanism,
    domain: &str,
    ip: IpAddr,
    sender: &str,
    helo: &str,
) -> MechOutcome {
    if !state.bump() {
        return MechOutcome::PermError;
    }
    let target = match expand_domain_spec(m, domain, ip, sender, helo, None) {
        Ok(t) => t,
        Err(()) => return MechOutcome::PermError,
    };

    let candidates = match dns.check(DnsQuery::Ptr(ip)).await {
        CheckOutcome::Found(records) => records
            .into_iter()
            .filter_map(|r| match r {
                RecordData::Ptr(name) => Some(name),
                _ => None,
            })
            .take(MAX_PTR_NAMES)
            .collect::<Vec<_>>(),
        CheckOutcome::NotFound => return MechOutcome::NoMatch,
        CheckOutcome::Error => return MechOutcome::TempError,
    };

    for name in candidates {
        if addresses_match(dns, &name, ip).await == Some(true) {
            if state.validated_name.is_none() {
                state.validated_name = Some(name.clone());
            }
            let name = name.trim_end_matches('.');
            if name.eq_ignore_ascii_case(&target)
                || name
                    .to_ascii_lowercase()
                    .ends_with(&format!(".{}", target.to_ascii_lowercase()))
            {
                return MechOutcome::Match;
            }
        }
    }
    MechOutcome::NoMatch
}

async fn eval_include(
    dns: &dyn Resolver,
    state: &mut EvalState,
    m: &Mechanism,
    domain: &str,
    ip: IpAddr,
    sender: &str,
    helo: &str,
) -> MechOutcome {
    if !state.bump() {
        return MechOutcome::PermError;
    }
    if m.domain_spec.as_deref().is_some_and(mentions_validated_name) {
        ensure_validated_name(dns, state, ip).await;
    }
    let target = match expand_domain_spec(m, domain, ip, sender, helo, state.validated_name.as_deref()) {
        Ok(t) => t,
        Err(()) => return MechOutcome::PermError,
    };
    state.recursion_depth += 1;
    if state.recursion_depth > MAX_RECURSION {
        state.recursion_depth -= 1;
        return MechOutcome::PermError;
    }

    let sub_result = match fetch_record(dns, &target, false).await {
        Ok(record) => eval_directives(dns, state, &record, &target, ip, sender, helo).await.0,
        Err(result) => result,
    };
    state.recursion_depth -= 1;

    match sub_result {
        SpfResult::Pass => MechOutcome::Match,
        SpfResult::Fail | SpfResult::SoftFail | SpfResult::Neutral => MechOutcome::NoMatch,
        // Unlike a/mx/ptr, include's TempError propagates as the overall
        // result right away rather than waiting to see if a later
        // mechanism matches (spec §4.6).
        SpfResult::TempError => MechOutcome::ImmediateTempError,
        SpfResult::PermError | SpfResult::None => MechOutcome::PermError,
    }
}

async fn eval_exists(
    dns: &dyn Resolver,
    state: &mut EvalState,
    m: &Mechanism,
    domain: &str,
    ip: IpAddr,
    sender: &str,
    helo: &str,
) -> MechOutcome {
    if !state.bump() {
        return MechOutcome::PermError;
    }
    if m.domain_spec.as_deref().is_some_and(mentions_validated_name) {
        ensure_validated_name(dns, state, ip).await;
    }
    let target = match expand_domain_spec(m, domain, ip, sender, helo, state.validated_name.as_deref()) {
        Ok(t) => t,
        Err(()) => return MechOutcome::PermError,
    };
    match dns.check(DnsQuery::A(target)).await {
        CheckOutcome::Found(_) => MechOutcome::Match,
        CheckOutcome::NotFound => MechOutcome::NoMatch,
        // Same immediate-propagation treatment as include, above.
        CheckOutcome::Error => MechOutcome::ImmediateTempError,
    }
}

async fn fetch_explanation(
    dns: &dyn Resolver,
    state: &mut EvalState,
    exp_domain_spec: &str,
    domain: &str,
    ip: IpAddr,
    sender: &str,
    helo: &str,
    local_hostname: &str,
) -> Result<String, ()> {
    if mentions_validated_name(exp_domain_spec) {
        ensure_validated_name(dns, state, ip).await;
    }
    let ctx = macro_ctx(domain, ip, sender, helo, state.validated_name.as_deref());
    let target = macros::expand(exp_domain_spec, &ctx)?;
    if !validate_domain(&target) {
        return Err(());
    }
    let texts = match dns.check(DnsQuery::Txt(target)).await {
        CheckOutcome::Found(records) => records
            .into_iter()
            .filter_map(|r| match r {
                RecordData::Txt(s) => Some(s),
                _ => None,
            })
            .collect::<Vec<_>>(),
        _ => return Err(()),
    };
    if texts.len() != 1 || !texts[0].is_ascii() {
        return Err(());
    }
    if mentions_validated_name(&texts[0]) {
        ensure_validated_name(dns, state, ip).await;
    }
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let exp_ctx = MacroContext {
        sender,
        domain,
        ip,
        validated_name: state.validated_name.as_deref(),
        helo,
        exp_local_hostname: Some(local_hostname),
        exp_unix_time: Some(now),
    };
    macros::expand(&texts[0], &exp_ctx)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::net::Ipv4Addr;

    use super::*;

    /// Canned TXT-only responder; every other RR type is `NotFound`. Logs
    /// every query name so tests can assert a short-circuit path never
    /// touched the resolver at all.
    struct StubResolver {
        txt: HashMap<String, Vec<RecordData>>,
        ptr: HashMap<IpAddr, Vec<RecordData>>,
        a: HashMap<String, Vec<IpAddr>>,
        errors: std::collections::HashSet<String>,
        log: RefCell<Vec<String>>,
    }

    impl StubResolver {
        fn new() -> Self {
            StubResolver {
                txt: HashMap::new(),
                ptr: HashMap::new(),
                a: HashMap::new(),
                errors: std::collections::HashSet::new(),
                log: RefCell::new(Vec::new()),
            }
        }

        fn with_txt(mut self, domain: &str, text: &str) -> Self {
            self.txt
                .insert(domain.to_string(), vec![RecordData::Txt(text.to_string())]);
            self
        }

        /// Every query naming `domain` resolves to `CheckOutcome::Error`.
        fn with_error(mut self, domain: &str) -> Self {
            self.errors.insert(domain.to_string());
            self
        }

        fn with_ptr(mut self, ip: IpAddr, name: &str) -> Self {
            self.ptr.insert(ip, vec![RecordData::Ptr(name.to_string())]);
            self
        }

        fn with_a(mut self, name: &str, ip: IpAddr) -> Self {
            self.a.entry(name.to_string()).or_default().push(ip);
            self
        }
    }

    impl Resolver for StubResolver {
        fn check<'a>(&'a self, query: DnsQuery) -> Pin<Box<dyn Future<Output = CheckOutcome> + Send + 'a>> {
            Box::pin(async move {
                if let Some(name) = query.name() {
                    self.log.borrow_mut().push(name.to_string());
                    if self.errors.contains(name) {
                        return CheckOutcome::Error;
                    }
                }
                match &query {
                    DnsQuery::Txt(name) | DnsQuery::Spf(name) => match self.txt.get(name) {
                        Some(records) => CheckOutcome::Found(records.clone()),
                        None => CheckOutcome::NotFound,
                    },
                    DnsQuery::Ptr(ip) => match self.ptr.get(ip) {
                        Some(names) => CheckOutcome::Found(names.clone()),
                        None => CheckOutcome::NotFound,
                    },
                    DnsQuery::A(name) => match self.a.get(name) {
                        Some(ips) => CheckOutcome::Found(ips.iter().map(|ip| RecordData::Ip(*ip)).collect()),
                        None => CheckOutcome::NotFound,
                    },
                    _ => CheckOutcome::NotFound,
                }
            })
        }
    }

    fn request(domain: &str, no_spf_lookup: bool) -> SpfRequest {
        SpfRequest {
            ip: IpAddr::V4(Ipv4Addr::new(203, 0, 113, 5)),
            helo: "mail.example.net".to_string(),
            sender: "sender@example.net".to_string(),
            domain: domain.to_string(),
            no_spf_lookup,
            local_hostname: None,
        }
    }

    // Spec §8 scenario 2: published `v=spf1 +all`.
    #[test]
    fn published_plus_all_record_passes() {
        let dns = StubResolver::new().with_txt("example.com", "v=spf1 +all");
        let outcome = smol::block_on(evaluate(&dns, &request("example.com", true)));
        assert_eq!(outcome.result, SpfResult::Pass);
    }

    // Spec §8 scenario 3: a record with two `exp=` modifiers.
    #[test]
    fn duplicate_exp_modifier_is_a_permerror() {
        let dns = StubResolver::new().with_txt("example.com", "v=spf1 exp=one.example exp=two.example -all");
        let outcome = smol::block_on(evaluate(&dns, &request("example.com", true)));
        assert_eq!(outcome.result, SpfResult::PermError);
        assert_eq!(outcome.explanation, None);
    }

    // Spec §8 invariant: no evaluation issues more than 10 DNS-causing
    // mechanisms before returning PermError.
    #[test]
    fn dns_mechanism_budget_caps_at_ten() {
        let record = "v=spf1 exists:e1.test exists:e2.test exists:e3.test exists:e4.test \
                       exists:e5.test exists:e6.test exists:e7.test exists:e8.test \
                       exists:e9.test exists:e10.test exists:e11.test -all";
        let dns = StubResolver::new().with_txt("example.com", record);
        let outcome = smol::block_on(evaluate(&dns, &request("example.com", true)));
        assert_eq!(outcome.result, SpfResult::PermError);
    }

    #[test]
    fn missing_record_yields_none() {
        let dns = StubResolver::new();
        let outcome = smol::block_on(evaluate(&dns, &request("example.com", true)));
        assert_eq!(outcome.result, SpfResult::None);
    }

    #[test]
    fn malformed_domain_short_circuits_before_any_query() {
        let dns = StubResolver::new();
        let outcome = smol::block_on(evaluate(&dns, &request("not a domain", true)));
        assert_eq!(outcome.result, SpfResult::None);
        assert!(dns.log.borrow().is_empty());
    }

    #[test]
    fn empty_sender_is_synthesized_from_helo() {
        let dns = StubResolver::new().with_txt("example.com", "v=spf1 +all");
        let mut req = request("example.com", true);
        req.sender = String::new();
        let outcome = smol::block_on(evaluate(&dns, &req));
        assert_eq!(outcome.result, SpfResult::Pass);
    }

    // spec §4.6: an include whose target errors propagates TempError
    // immediately rather than letting -all decide the outcome instead.
    #[test]
    fn include_temperror_propagates_over_a_later_all() {
        let dns = StubResolver::new()
            .with_txt("example.com", "v=spf1 include:temp.example -all")
            .with_error("temp.example");
        let outcome = smol::block_on(evaluate(&dns, &request("example.com", true)));
        assert_eq!(outcome.result, SpfResult::TempError);
    }

    // Same immediate-propagation treatment for exists.
    #[test]
    fn exists_temperror_propagates_over_a_later_all() {
        let dns = StubResolver::new()
            .with_txt("example.com", "v=spf1 exists:temp.example -all")
            .with_error("temp.example");
        let outcome = smol::block_on(evaluate(&dns, &request("example.com", true)));
        assert_eq!(outcome.result, SpfResult::TempError);
    }

    // spec §4.6, supplement 9: `%{p}` triggers PTR resolution when no
    // validated name is cached yet, instead of falling back to "unknown".
    #[test]
    fn p_macro_triggers_ptr_resolution_when_uncached() {
        let ip: IpAddr = "203.0.113.5".parse().unwrap();
        let dns = StubResolver::new()
            .with_txt("example.com", "v=spf1 exists:%{p}.sbl.example -all")
            .with_ptr(ip, "mail.example.net")
            .with_a("mail.example.net", ip)
            .with_a("mail.example.net.sbl.example", "127.0.0.2".parse().unwrap());
        let mut req = request("example.com", true);
        req.ip = ip;
        let outcome = smol::block_on(evaluate(&dns, &req));
        // The PTR lookup ran, resolved `mail.example.net`, and the
        // `exists` target was built from it rather than "unknown".
        assert!(dns.log.borrow().iter().any(|q| q == "mail.example.net.sbl.example"));
        assert_eq!(outcome.result, SpfResult::Pass);
    }

    #[test]
    fn multiple_matching_records_is_a_permerror() {
        // Two independent v=spf1 TXT records for the same name is a
        // PermError (spec §4.6 "if multiple records of the selected type
        // exist, PermError").
        let mut dns = StubResolver::new();
        dns.txt.insert(
            "example.com".to_string(),
            vec![
                RecordData::Txt("v=spf1 +all".to_string()),
                RecordData::Txt("v=spf1 -all".to_string()),
            ],
        );
        let outcome = smol::block_on(evaluate(&dns, &request("example.com", true)));
        assert_eq!(outcome.result, SpfResult::PermError);
    }
}
