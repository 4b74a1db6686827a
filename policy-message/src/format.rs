use thiserror::Error;

use crate::{field::Field, query::Query};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("unterminated ${{ in query-format string")]
    UnterminatedField,
    #[error("invalid index selector {0:?}")]
    BadIndex(String),
}

/// Splits `value` on `.` and returns the `n`-th part (spec §4.3): `n >= 0`
/// counts from the left, `n == -1` is the rightmost part, any other
/// negative or out-of-range index yields the literal `(none)`.
fn select_part(value: &str, n: i64) -> &str {
    let parts: Vec<&str> = value.split('.').collect();
    let len = parts.len() as i64;
    let idx = if n == -1 { len - 1 } else { n };
    if idx < 0 || idx >= len {
        "(none)"
    } else {
        parts[idx as usize]
    }
}

/// Expands a `query_format` template (spec §4.3). `query` is `None` in
/// dry-run mode: field lookups then return the field's name-shaped
/// placeholder (`(null)` for an unrecognized field, `(none)` for an
/// out-of-range selector) so that a configuration-time syntax check does
/// not need a live transaction, matching the C implementation's "dry-run
/// mode with a null query".
pub fn query_format(query: Option<&Query>, fmt: &str) -> Result<String, FormatError> {
    let mut out = String::with_capacity(fmt.len());
    let bytes = fmt.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
            let close = fmt[i + 2..]
                .find('}')
                .map(|p| i + 2 + p)
                .ok_or(FormatError::UnterminatedField)?;
            let inner = &fmt[i + 2..close];

            let (name, selector) = match inner.find('[') {
                Some(bpos) => {
                    let end = inner
                        .rfind(']')
                        .filter(|&e| e > bpos)
                        .ok_or_else(|| FormatError::BadIndex(inner.to_string()))?;
                    let idx_str = &inner[bpos + 1..end];
                    let n: i64 = idx_str
                        .parse()
                        .map_err(|_| FormatError::BadIndex(idx_str.to_string()))?;
                    (&inner[..bpos], Some(n))
                }
                None => (inner, None),
            };

            let rendered = match (Field::from_format_name(name), query) {
                (None, _) => "(null)".to_string(),
                (Some(field), Some(q)) => q.field(field).to_string(),
                // Dry-run: emit a value-shaped placeholder so length/syntax
                // checks succeed without a live query.
                (Some(_), None) => String::new(),
            };
            let rendered = match selector {
                Some(n) => select_part(&rendered, n).to_string(),
                None => rendered,
            };
            out.push_str(&rendered);

            i = close + 1;
        } else if bytes[i] == b'$' && bytes.get(i + 1).is_some() {
            // Not `${`: copy the `$` literally and move on.
            out.push('$');
            i += 1;
        } else {
            let ch_len = fmt[i..].chars().next().map(char::len_utf8).unwrap_or(1);
            out.push_str(&fmt[i..i + ch_len]);
            i += ch_len;
        }
    }
    Ok(out)
}

/// The length `query_format` would have written. Rust's growable `String`
/// makes the C two-pass "measure, then fill a big-enough buffer" dance
/// unnecessary; this exists to make the "template length" testable
/// property (spec §8) checkable without duplicating the expansion logic.
pub fn query_format_len(query: Option<&Query>, fmt: &str) -> Result<usize, FormatError> {
    query_format(query, fmt).map(|s| s.len())
}

/// Validates a query-format string at configuration-load time (spec
/// §4.3's dry-run mode), without requiring a live `Query`.
pub fn validate_format(fmt: &str) -> Result<(), FormatError> {
    query_format(None, fmt).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;

    fn q(block: &'static str) -> Query<'static> {
        let mut unknown = Vec::new();
        Query::parse(block, &mut unknown).unwrap()
    }

    #[test]
    fn expands_simple_field() {
        let query = q("protocol_state=MAIL\nsender=a@b.example.com\n");
        assert_eq!(
            query_format(Some(&query), "from=${sender}").unwrap(),
            "from=a@b.example.com"
        );
    }

    #[test]
    fn selector_picks_nth_dot_separated_part() {
        let query = q("protocol_state=MAIL\nclient_address=1.2.3.4\n");
        assert_eq!(
            query_format(Some(&query), "${client_address[0]}").unwrap(),
            "1"
        );
        assert_eq!(
            query_format(Some(&query), "${client_address[-1]}").unwrap(),
            "4"
        );
        assert_eq!(
            query_format(Some(&query), "${client_address[9]}").unwrap(),
            "(none)"
        );
    }

    #[test]
    fn unknown_field_renders_null() {
        assert_eq!(query_format(None, "${nope}").unwrap(), "(null)");
        let _ = Field::Request; // keep import used across cfg(test) builds
    }

    #[test]
    fn unterminated_field_is_an_error() {
        assert_eq!(
            query_format(None, "${sender"),
            Err(FormatError::UnterminatedField)
        );
    }

    #[test]
    fn template_length_matches_rendered_length() {
        let fmt = "client=${client_address} sender=${sender}";
        assert_eq!(
            query_format_len(None, fmt).unwrap(),
            query_format(None, fmt).unwrap().len()
        );
    }

    #[test]
    fn dollar_not_followed_by_brace_is_literal() {
        assert_eq!(query_format(None, "cost: $5").unwrap(), "cost: $5");
    }
}
