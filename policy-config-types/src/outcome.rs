use std::fmt;

/// The closed set of outcome tokens a filter runner may produce (spec
/// §4.4). Kinds only ever emit a subset of these; a kind's declared hook
/// tokens are checked against this set at registration time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Outcome {
    Fail,
    Pass,
    Match,
    SoftMatch,
    HardMatch,
    SoftMatchStart,
    HardMatchStart,
    None,
    Neutral,
    TempError,
    PermError,
    SoftFail,
    Error,
    Async,
    Abort,
    Whitelist,
    Greylist,
    Timeout,
    True,
    False,
}

impl Outcome {
    pub const ALL: &'static [Outcome] = &[
        Outcome::Fail,
        Outcome::Pass,
        Outcome::Match,
        Outcome::SoftMatch,
        Outcome::HardMatch,
        Outcome::SoftMatchStart,
        Outcome::HardMatchStart,
        Outcome::None,
        Outcome::Neutral,
        Outcome::TempError,
        Outcome::PermError,
        Outcome::SoftFail,
        Outcome::Error,
        Outcome::Async,
        Outcome::Abort,
        Outcome::Whitelist,
        Outcome::Greylist,
        Outcome::Timeout,
        Outcome::True,
        Outcome::False,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Fail => "fail",
            Outcome::Pass => "pass",
            Outcome::Match => "match",
            Outcome::SoftMatch => "soft_match",
            Outcome::HardMatch => "hard_match",
            Outcome::SoftMatchStart => "soft_match_start",
            Outcome::HardMatchStart => "hard_match_start",
            Outcome::None => "none",
            Outcome::Neutral => "neutral",
            Outcome::TempError => "temp_error",
            Outcome::PermError => "perm_error",
            Outcome::SoftFail => "soft_fail",
            Outcome::Error => "error",
            Outcome::Async => "async",
            Outcome::Abort => "abort",
            Outcome::Whitelist => "whitelist",
            Outcome::Greylist => "greylist",
            Outcome::Timeout => "timeout",
            Outcome::True => "true",
            Outcome::False => "false",
        }
    }

    pub fn from_str(s: &str) -> Option<Outcome> {
        Self::ALL.iter().copied().find(|o| o.as_str() == s)
    }

    /// The "forwarding" table fallback used when a filter's hook table has
    /// no entry for this outcome (spec §4.4): config authors who only
    /// distinguish `hard_match` can still be matched by a kind that
    /// reports the finer-grained `soft_match`.
    pub fn forwards_to(self) -> Option<Outcome> {
        match self {
            Outcome::SoftMatch | Outcome::SoftMatchStart => Some(Outcome::HardMatch),
            Outcome::HardMatchStart => Some(Outcome::HardMatch),
            Outcome::SoftFail => Some(Outcome::Fail),
            Outcome::Neutral => Some(Outcome::None),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
