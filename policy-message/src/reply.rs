/// A single Postfix policy-delegation reply (spec §6). Unlike SMTP's
/// closed reply-code space, Postfix's `access(5)` action grammar is open
/// ended (`DUNNO`, `OK`, `REJECT text`, `450 text`, `PREPEND header: …`,
/// a bare numeric code, …), so the action text itself is just whatever
/// literal string configuration supplied after a `postfix:` prefix (spec
/// §4.5); this type only owns the wire framing and the optional
/// explanation suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply<'a> {
    pub action: &'a str,
    pub explanation: Option<&'a str>,
}

impl<'a> Reply<'a> {
    pub fn new(action: &'a str) -> Reply<'a> {
        Reply {
            action,
            explanation: None,
        }
    }

    pub fn with_explanation(action: &'a str, explanation: &'a str) -> Reply<'a> {
        Reply {
            action,
            explanation: Some(explanation),
        }
    }

    /// Renders the full reply, including the terminating blank line (spec
    /// §6: "The server replies with exactly one `action=…` line followed
    /// by an empty line").
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(8 + self.action.len());
        out.push_str("action=");
        out.push_str(self.action);
        if let Some(exp) = self.explanation {
            if !exp.is_empty() {
                out.push_str(": ");
                out.push_str(exp);
            }
        }
        out.push_str("\n\n");
        out
    }
}

pub const DUNNO: &str = "DUNNO";
