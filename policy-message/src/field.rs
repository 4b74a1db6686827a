/// The closed set of attribute names this daemon understands, per the
/// Postfix `SMTPD_POLICY_README` schema (spec §3 and §6). Unknown keys
/// are tolerated (logged and skipped) rather than rejected.
///
/// `SenderDomain`/`RecipientDomain` and the two normalized pseudo-fields
/// are never present as literal keys in the wire protocol: they are
/// computed on access (spec §4.3) and are included here so that a single
/// token space covers both real attributes and derived/pseudo fields, as
/// `query_format`'s `${field}` grammar requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Field {
    Request,
    ProtocolState,
    ProtocolName,
    HeloName,
    QueueId,
    Sender,
    SenderDomain,
    Recipient,
    RecipientDomain,
    ClientAddress,
    ClientName,
    ReverseClientName,
    Instance,
    SaslMethod,
    SaslUsername,
    SaslSender,
    Size,
    CcertSubject,
    CcertIssuer,
    CcertFingerprint,
    CcertPubkeyFingerprint,
    EncryptionProtocol,
    EncryptionCipher,
    EncryptionKeysize,
    EtrnDomain,
    Stress,
    ClientPort,
    NormalizedSender,
    NormalizedClient,
}

impl Field {
    /// Parses a wire attribute name into its token. Returns `None` for any
    /// key outside the recognized set, or for the two pseudo-fields which
    /// never appear literally on the wire (normalized_sender and
    /// normalized_client are reached only through `${normalized_sender}` /
    /// `${normalized_client}` in a query-format string, not as a protocol
    /// attribute).
    pub fn from_attr(key: &str) -> Option<Field> {
        Some(match key {
            "request" => Field::Request,
            "protocol_state" => Field::ProtocolState,
            "protocol_name" => Field::ProtocolName,
            "helo_name" => Field::HeloName,
            "queue_id" => Field::QueueId,
            "sender" => Field::Sender,
            "sender_domain" => Field::SenderDomain,
            "recipient" => Field::Recipient,
            "recipient_domain" => Field::RecipientDomain,
            "client_address" => Field::ClientAddress,
            "client_name" => Field::ClientName,
            "reverse_client_name" => Field::ReverseClientName,
            "instance" => Field::Instance,
            "sasl_method" => Field::SaslMethod,
            "sasl_username" => Field::SaslUsername,
            "sasl_sender" => Field::SaslSender,
            "size" => Field::Size,
            "ccert_subject" => Field::CcertSubject,
            "ccert_issuer" => Field::CcertIssuer,
            "ccert_fingerprint" => Field::CcertFingerprint,
            "ccert_pubkey_fingerprint" => Field::CcertPubkeyFingerprint,
            "encryption_protocol" => Field::EncryptionProtocol,
            "encryption_cipher" => Field::EncryptionCipher,
            "encryption_keysize" => Field::EncryptionKeysize,
            "etrn_domain" => Field::EtrnDomain,
            "stress" => Field::Stress,
            "client_port" => Field::ClientPort,
            _ => return None,
        })
    }

    /// Parses the name used inside a `${...}` query-format template,
    /// which additionally recognizes the two normalized pseudo-fields.
    pub fn from_format_name(name: &str) -> Option<Field> {
        match name {
            "normalized_sender" => Some(Field::NormalizedSender),
            "normalized_client" => Some(Field::NormalizedClient),
            _ => Field::from_attr(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_normalized_pseudo_fields_only_in_format_names() {
        assert_eq!(Field::from_attr("normalized_sender"), None);
        assert_eq!(
            Field::from_format_name("normalized_sender"),
            Some(Field::NormalizedSender)
        );
    }

    #[test]
    fn unknown_key_is_none() {
        assert_eq!(Field::from_attr("x-something-made-up"), None);
    }
}
