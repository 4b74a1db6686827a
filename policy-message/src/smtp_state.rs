use std::fmt;

/// The SMTP transaction state the MTA was in when it asked for a policy
/// decision (`protocol_state` attribute). `Helo` covers both `HELO` and
/// `EHLO`; the distinction is carried in [`SmtpState::is_ehlo`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SmtpState {
    Connect,
    Helo { ehlo: bool },
    Mail,
    Rcpt,
    Data,
    EndOfMessage,
    Vrfy,
    Etrn,
}

impl SmtpState {
    /// Ordering used to enforce a filter's minimum required state (spec
    /// §3: "running a filter outside its valid state is a hard
    /// configuration error"). Connect is the least advanced, EndOfMessage
    /// the most; Vrfy/Etrn do not participate in a transaction and always
    /// satisfy any minimum (they are their own category).
    pub fn rank(self) -> u8 {
        match self {
            SmtpState::Connect => 0,
            SmtpState::Helo { .. } => 1,
            SmtpState::Mail => 2,
            SmtpState::Rcpt => 3,
            SmtpState::Data => 4,
            SmtpState::EndOfMessage => 5,
            SmtpState::Vrfy => 6,
            SmtpState::Etrn => 7,
        }
    }

    pub fn at_least(self, min: SmtpState) -> bool {
        self.rank() >= min.rank()
    }

    pub fn from_attr(value: &str) -> Option<SmtpState> {
        match value {
            "CONNECT" => Some(SmtpState::Connect),
            "HELO" => Some(SmtpState::Helo { ehlo: false }),
            "EHLO" => Some(SmtpState::Helo { ehlo: true }),
            "MAIL" => Some(SmtpState::Mail),
            "RCPT" => Some(SmtpState::Rcpt),
            "DATA" => Some(SmtpState::Data),
            "END-OF-MESSAGE" => Some(SmtpState::EndOfMessage),
            "VRFY" => Some(SmtpState::Vrfy),
            "ETRN" => Some(SmtpState::Etrn),
            _ => None,
        }
    }

    pub fn as_attr(self) -> &'static str {
        match self {
            SmtpState::Connect => "CONNECT",
            SmtpState::Helo { ehlo: false } => "HELO",
            SmtpState::Helo { ehlo: true } => "EHLO",
            SmtpState::Mail => "MAIL",
            SmtpState::Rcpt => "RCPT",
            SmtpState::Data => "DATA",
            SmtpState::EndOfMessage => "END-OF-MESSAGE",
            SmtpState::Vrfy => "VRFY",
            SmtpState::Etrn => "ETRN",
        }
    }
}

impl fmt::Display for SmtpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_attr())
    }
}
