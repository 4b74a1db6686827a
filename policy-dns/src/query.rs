use std::net::IpAddr;

/// The RR types the gateway answers (spec §4.2): A, AAAA, MX, TXT, the
/// historical SPF record type (RFC 4408 RR type 99), and PTR.
#[derive(Clone, Debug)]
pub enum DnsQuery {
    A(String),
    Aaaa(String),
    Mx(String),
    Txt(String),
    Spf(String),
    Ptr(IpAddr),
}

impl DnsQuery {
    pub fn name(&self) -> Option<&str> {
        match self {
            DnsQuery::A(n) | DnsQuery::Aaaa(n) | DnsQuery::Mx(n) | DnsQuery::Txt(n) | DnsQuery::Spf(n) => {
                Some(n)
            }
            DnsQuery::Ptr(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DnsQuery::A(_) => "A",
            DnsQuery::Aaaa(_) => "AAAA",
            DnsQuery::Mx(_) => "MX",
            DnsQuery::Txt(_) => "TXT",
            DnsQuery::Spf(_) => "SPF",
            DnsQuery::Ptr(_) => "PTR",
        }
    }
}

/// One returned resource record, shaped per RR type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordData {
    Ip(IpAddr),
    Mx { preference: u16, exchange: String },
    Txt(String),
    Ptr(String),
}

/// The three-state normalization spec §4.2 requires of every lookup:
/// `Error` folds together any rcode other than NOERROR/NXDOMAIN, transport
/// failure, and resolver-internal error, so callers never need to inspect
/// trust-dns's own error taxonomy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckOutcome {
    Found(Vec<RecordData>),
    NotFound,
    Error,
}

impl CheckOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, CheckOutcome::Found(_))
    }
}
