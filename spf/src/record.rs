use crate::cidr::{parse_cidr, Cidr};
use crate::result::SpfResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Qualifier {
    Pass,
    Fail,
    SoftFail,
    Neutral,
}

impl Qualifier {
    pub fn as_result(self) -> SpfResult {
        match self {
            Qualifier::Pass => SpfResult::Pass,
            Qualifier::Fail => SpfResult::Fail,
            Qualifier::SoftFail => SpfResult::SoftFail,
            Qualifier::Neutral => SpfResult::Neutral,
        }
    }

    fn from_char(c: char) -> Option<Qualifier> {
        match c {
            '+' => Some(Qualifier::Pass),
            '-' => Some(Qualifier::Fail),
            '~' => Some(Qualifier::SoftFail),
            '?' => Some(Qualifier::Neutral),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MechanismKind {
    All,
    Include,
    A,
    Mx,
    Ptr,
    Ip4,
    Ip6,
    Exists,
}

impl MechanismKind {
    fn from_name(name: &str) -> Option<MechanismKind> {
        match name {
            "all" => Some(MechanismKind::All),
            "include" => Some(MechanismKind::Include),
            "a" => Some(MechanismKind::A),
            "mx" => Some(MechanismKind::Mx),
            "ptr" => Some(MechanismKind::Ptr),
            "ip4" => Some(MechanismKind::Ip4),
            "ip6" => Some(MechanismKind::Ip6),
            "exists" => Some(MechanismKind::Exists),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mechanism {
    pub qualifier: Qualifier,
    pub kind: MechanismKind,
    /// The raw (unexpanded) domain-spec, or the literal address for
    /// `ip4`/`ip6`. Absent for `all`, and for `a`/`mx` when the rule has
    /// no explicit domain (defaults to the current domain at eval time).
    pub domain_spec: Option<String>,
    pub cidr: Cidr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Modifier {
    Redirect(String),
    Exp(String),
    Unknown(String, String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    Mechanism(Mechanism),
    Modifier(Modifier),
}

fn split_name(token: &str) -> (&str, &str) {
    let end = token
        .find(|c: char| c == ':' || c == '/' || c == '=')
        .unwrap_or(token.len());
    (&token[..end], &token[end..])
}

fn parse_token(token: &str) -> Option<Directive> {
    let (qualifier, rest) = match token.chars().next().and_then(Qualifier::from_char) {
        Some(q) => (q, &token[1..]),
        None => (Qualifier::Pass, token),
    };
    let (name, tail) = split_name(rest);
    if name.is_empty() {
        return None;
    }

    if let Some(value) = tail.strip_prefix('=') {
        return match name {
            "redirect" => Some(Directive::Modifier(Modifier::Redirect(value.to_string()))),
            "exp" => Some(Directive::Modifier(Modifier::Exp(value.to_string()))),
            other => Some(Directive::Modifier(Modifier::Unknown(
                other.to_string(),
                value.to_string(),
            ))),
        };
    }

    let kind = MechanismKind::from_name(name)?;
    let (domain_spec, cidr_part) = if let Some(after_colon) = tail.strip_prefix(':') {
        match after_colon.find('/') {
            Some(pos) => (Some(after_colon[..pos].to_string()), &after_colon[pos..]),
            None => (Some(after_colon.to_string()), ""),
        }
    } else {
        (None, tail)
    };
    let cidr = parse_cidr(cidr_part)?;

    match kind {
        MechanismKind::All if domain_spec.is_some() => return None,
        _ => {}
    }

    Some(Directive::Mechanism(Mechanism {
        qualifier,
        kind,
        domain_spec,
        cidr,
    }))
}

/// A parsed `v=spf1` record (spec §4.6 "Record parsing"). Directives
/// that fail to parse are kept as `Err(())` placeholders so directives
/// before them can still match during evaluation; only reaching a broken
/// directive during the walk turns into PermError.
#[derive(Clone, Debug)]
pub struct Record {
    pub directives: Vec<Result<Directive, ()>>,
}

impl Record {
    /// `body` is the record text with the leading `v=spf1` (and the
    /// single following space) already stripped.
    pub fn parse(body: &str) -> Record {
        let directives = body
            .split_ascii_whitespace()
            .map(|token| parse_token(token).ok_or(()))
            .collect();
        Record { directives }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_with_qualifier() {
        let r = Record::parse("-all");
        assert_eq!(r.directives.len(), 1);
        match r.directives[0].as_ref().unwrap() {
            Directive::Mechanism(m) => {
                assert_eq!(m.qualifier, Qualifier::Fail);
                assert_eq!(m.kind, MechanismKind::All);
            }
            _ => panic!("expected mechanism"),
        }
    }

    #[test]
    fn parses_ip4_with_cidr() {
        let r = Record::parse("ip4:203.0.113.0/24");
        match r.directives[0].as_ref().unwrap() {
            Directive::Mechanism(m) => {
                assert_eq!(m.kind, MechanismKind::Ip4);
                assert_eq!(m.domain_spec.as_deref(), Some("203.0.113.0"));
                assert_eq!(m.cidr.v4, 24);
            }
            _ => panic!("expected mechanism"),
        }
    }

    #[test]
    fn parses_include_and_redirect() {
        let r = Record::parse("include:_spf.example.com redirect=_spf2.example.com");
        assert!(matches!(
            r.directives[0].as_ref().unwrap(),
            Directive::Mechanism(Mechanism {
                kind: MechanismKind::Include,
                ..
            })
        ));
        assert_eq!(
            r.directives[1].as_ref().unwrap(),
            &Directive::Modifier(Modifier::Redirect("_spf2.example.com".to_string()))
        );
    }

    #[test]
    fn unknown_modifiers_parse_without_error() {
        let r = Record::parse("custom=somevalue -all");
        assert!(r.directives[0].is_ok());
    }

    #[test]
    fn malformed_token_is_a_parse_error_placeholder() {
        let r = Record::parse("all garbage!! -all");
        assert!(r.directives[0].is_ok());
        assert!(r.directives[1].is_err());
        assert!(r.directives[2].is_ok());
    }
}
