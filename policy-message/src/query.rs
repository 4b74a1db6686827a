use std::cell::OnceCell;

use thiserror::Error;

use crate::{field::Field, normalize, smtp_state::SmtpState};

/// Number of slots in [`Query`]'s raw-attribute table: one per
/// wire-recognized [`Field`] variant (the two normalized pseudo-fields are
/// never stored here, only computed on access).
const NUM_ATTRS: usize = 27;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The attribute block had no terminating blank line within the
    /// configured ceiling (spec §7 "over-budget").
    #[error("policy query exceeded the maximum buffered size without a terminator")]
    OverBudget,
    /// A line was neither `key=value` nor the terminating blank line
    /// (spec §7 "protocol malformed").
    #[error("malformed attribute line: {0:?}")]
    MalformedLine(String),
    /// `protocol_state` was absent or not one of the recognized tokens
    /// (spec §4.3: "a missing or unrecognized state fails the parse").
    #[error("missing or unrecognized protocol_state")]
    BadProtocolState,
}

/// One in-flight policy query. All borrowed fields are slices into the
/// connection's input buffer and are valid only until that buffer is
/// reused (spec §3: "lifetime = until reply is written").
pub struct Query<'a> {
    raw: &'a str,
    attrs: [Option<&'a str>; NUM_ATTRS],
    protocol_state: SmtpState,
    normalized_sender: OnceCell<String>,
    normalized_client: OnceCell<String>,
}

fn attr_index(field: Field) -> Option<usize> {
    use Field::*;
    Some(match field {
        Request => 0,
        ProtocolState => 1,
        ProtocolName => 2,
        HeloName => 3,
        QueueId => 4,
        Sender => 5,
        SenderDomain => 6,
        Recipient => 7,
        RecipientDomain => 8,
        ClientAddress => 9,
        ClientName => 10,
        ReverseClientName => 11,
        Instance => 12,
        SaslMethod => 13,
        SaslUsername => 14,
        SaslSender => 15,
        Size => 16,
        CcertSubject => 17,
        CcertIssuer => 18,
        CcertFingerprint => 19,
        CcertPubkeyFingerprint => 20,
        EncryptionProtocol => 21,
        EncryptionCipher => 22,
        EncryptionKeysize => 23,
        EtrnDomain => 24,
        Stress => 25,
        ClientPort => 26,
        NormalizedSender | NormalizedClient => return None,
    })
}

impl<'a> Query<'a> {
    /// Parses the attribute block `block` (the `key=value\n` lines of one
    /// transaction, with the terminating blank line already stripped by
    /// the caller's buffer scan). Unknown keys are returned in
    /// `unknown_keys` for the caller to log, per spec §4.3.
    pub fn parse(block: &'a str, unknown_keys: &mut Vec<&'a str>) -> Result<Query<'a>, ParseError> {
        let mut attrs: [Option<&'a str>; NUM_ATTRS] = [None; NUM_ATTRS];

        for line in block.split('\n') {
            if line.is_empty() {
                continue;
            }
            let eq = line
                .find('=')
                .ok_or_else(|| ParseError::MalformedLine(line.to_string()))?;
            let (key, value) = (&line[..eq], &line[eq + 1..]);
            if key.is_empty() {
                return Err(ParseError::MalformedLine(line.to_string()));
            }
            let value = value.trim_end();
            match Field::from_attr(key) {
                Some(field) => {
                    if let Some(idx) = attr_index(field) {
                        attrs[idx] = Some(value);
                    }
                }
                None => unknown_keys.push(key),
            }
        }

        let protocol_state = attrs[attr_index(Field::ProtocolState).unwrap()]
            .and_then(SmtpState::from_attr)
            .ok_or(ParseError::BadProtocolState)?;

        Ok(Query {
            raw: block,
            attrs,
            protocol_state,
            normalized_sender: OnceCell::new(),
            normalized_client: OnceCell::new(),
        })
    }

    pub fn raw(&self) -> &'a str {
        self.raw
    }

    pub fn protocol_state(&self) -> SmtpState {
        self.protocol_state
    }

    /// Looks up a single field by token, computing and caching derived
    /// values on demand (spec §4.3). Returns `""` for any attribute the
    /// MTA did not send, matching Postfix's own convention of sending
    /// empty strings for absent attributes rather than omitting them.
    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::SenderDomain => normalize::split_domain(self.field(Field::Sender)).1,
            Field::RecipientDomain => normalize::split_domain(self.field(Field::Recipient)).1,
            Field::ProtocolState => self.protocol_state.as_attr(),
            Field::NormalizedSender => self
                .normalized_sender
                .get_or_init(|| normalize::normalized_sender(self.field(Field::Sender))),
            Field::NormalizedClient => self.normalized_client.get_or_init(|| {
                normalize::normalized_client(
                    self.field(Field::ClientAddress),
                    self.field(Field::ClientName),
                )
            }),
            other => attr_index(other)
                .and_then(|idx| self.attrs[idx])
                .unwrap_or(""),
        }
    }
}
