//! `match` (spec §4.9, REDESIGN FLAGS: "postlicyd's `match.c` is a stub
//! upstream; implement the documented operator set fully and
//! consistently rather than leaving it a pass-through"). Compares a
//! query-format expansion against a literal value with one of ten
//! operators: case-sensitive/insensitive string equality, inequality,
//! ordering, and integer equality.

use std::cmp::Ordering;

use policy_message::{query_format, Query};

use crate::params::Params;
use policy_config_types::Outcome;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Eq,
    EqCi,
    Ne,
    NeCi,
    Ge,
    GeCi,
    Le,
    LeCi,
    IntEq,
    /// `#i`: integer equality tolerant of surrounding whitespace, the
    /// closest sensible reading of "case-insensitive" applied to a
    /// numeric comparison (decided in DESIGN.md).
    IntEqLenient,
}

impl Op {
    fn parse(token: &str) -> Option<Op> {
        Some(match token {
            "==" => Op::Eq,
            "=i" => Op::EqCi,
            "!=" => Op::Ne,
            "!i" => Op::NeCi,
            ">=" => Op::Ge,
            ">i" => Op::GeCi,
            "<=" => Op::Le,
            "<i" => Op::LeCi,
            "#=" => Op::IntEq,
            "#i" => Op::IntEqLenient,
            _ => return None,
        })
    }

    fn evaluate(self, lhs: &str, rhs: &str) -> bool {
        match self {
            Op::Eq => lhs == rhs,
            Op::EqCi => lhs.eq_ignore_ascii_case(rhs),
            Op::Ne => lhs != rhs,
            Op::NeCi => !lhs.eq_ignore_ascii_case(rhs),
            Op::Ge => lhs.cmp(rhs) != Ordering::Less,
            Op::GeCi => lhs.to_ascii_lowercase().cmp(&rhs.to_ascii_lowercase()) != Ordering::Less,
            Op::Le => lhs.cmp(rhs) != Ordering::Greater,
            Op::LeCi => lhs.to_ascii_lowercase().cmp(&rhs.to_ascii_lowercase()) != Ordering::Greater,
            Op::IntEq => match (lhs.parse::<i64>(), rhs.parse::<i64>()) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            },
            Op::IntEqLenient => match (lhs.trim().parse::<i64>(), rhs.trim().parse::<i64>()) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            },
        }
    }
}

pub struct MatchFilter {
    lhs_format: String,
    op: Op,
    rhs: String,
}

impl MatchFilter {
    pub fn construct(params: &Params) -> anyhow::Result<MatchFilter> {
        let lhs_format = params.required_str("field")?.to_string();
        policy_message::validate_format(&lhs_format)?;
        let op_token = params.required_str("op")?;
        let op = Op::parse(op_token).ok_or_else(|| anyhow::anyhow!("match: unknown operator {:?}", op_token))?;
        let rhs = params.required_str("value")?.to_string();
        Ok(MatchFilter { lhs_format, op, rhs })
    }

    pub fn possible_outcomes() -> &'static [Outcome] {
        &[Outcome::True, Outcome::False]
    }

    pub fn run(&self, query: &Query<'_>) -> Outcome {
        let lhs = match query_format(Some(query), &self.lhs_format) {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(%err, "match: field query-format expansion failed");
                return Outcome::False;
            }
        };
        if self.op.evaluate(&lhs, &self.rhs) {
            Outcome::True
        } else {
            Outcome::False
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> Query<'static> {
        let mut unknown = Vec::new();
        Query::parse("protocol_state=RCPT\nsender=Foo@Example.com\nsize=42\n", &mut unknown).unwrap()
    }

    fn filter(field: &str, op: &str, value: &str) -> MatchFilter {
        let raw = vec![
            ("field".to_string(), field.to_string()),
            ("op".to_string(), op.to_string()),
            ("value".to_string(), value.to_string()),
        ];
        MatchFilter::construct(&Params::new(&raw)).unwrap()
    }

    #[test]
    fn case_sensitive_equality() {
        let f = filter("${sender}", "==", "Foo@Example.com");
        assert_eq!(f.run(&query()), Outcome::True);
        let f = filter("${sender}", "==", "foo@example.com");
        assert_eq!(f.run(&query()), Outcome::False);
    }

    #[test]
    fn case_insensitive_equality() {
        let f = filter("${sender}", "=i", "foo@example.com");
        assert_eq!(f.run(&query()), Outcome::True);
    }

    #[test]
    fn integer_equality() {
        let f = filter("${size}", "#=", "42");
        assert_eq!(f.run(&query()), Outcome::True);
    }

    #[test]
    fn lenient_integer_equality_tolerates_whitespace() {
        let f = filter("${size}", "#i", " 42 ");
        assert_eq!(f.run(&query()), Outcome::True);
    }

    #[test]
    fn ordering_operator() {
        let f = filter("${size}", ">=", "10");
        assert_eq!(f.run(&query()), Outcome::True);
        let f = filter("${size}", "<=", "10");
        assert_eq!(f.run(&query()), Outcome::False);
    }

    #[test]
    fn unknown_operator_is_rejected_at_construction() {
        let raw = vec![
            ("field".to_string(), "${sender}".to_string()),
            ("op".to_string(), "=~".to_string()),
            ("value".to_string(), "x".to_string()),
        ];
        assert!(MatchFilter::construct(&Params::new(&raw)).is_err());
    }
}
