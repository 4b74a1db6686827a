use std::fmt;

/// The final SPF verdict (spec §4.6).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpfResult {
    None,
    Neutral,
    Pass,
    Fail,
    SoftFail,
    TempError,
    PermError,
}

impl fmt::Display for SpfResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SpfResult::None => "none",
            SpfResult::Neutral => "neutral",
            SpfResult::Pass => "pass",
            SpfResult::Fail => "fail",
            SpfResult::SoftFail => "softfail",
            SpfResult::TempError => "temperror",
            SpfResult::PermError => "permerror",
        };
        f.write_str(s)
    }
}

/// The result plus, for a `Fail` with an applicable `exp=` modifier, the
/// fetched and macro-expanded explanation text (spec §4.6 "exp
/// modifier").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpfOutcome {
    pub result: SpfResult,
    pub explanation: Option<String>,
}

impl SpfOutcome {
    pub fn new(result: SpfResult) -> SpfOutcome {
        SpfOutcome {
            result,
            explanation: None,
        }
    }

    pub fn with_explanation(result: SpfResult, explanation: String) -> SpfOutcome {
        SpfOutcome {
            result,
            explanation: Some(explanation),
        }
    }
}
