/// Validates domain syntax per spec §4.6: labels 1..63 chars,
/// alphanumerics with `-`/`_`, at least two labels.
pub fn validate_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > 253 {
        return false;
    }
    let labels: Vec<&str> = domain.trim_end_matches('.').split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_normal_domain() {
        assert!(validate_domain("example.com"));
    }

    #[test]
    fn rejects_a_single_label() {
        assert!(!validate_domain("localhost"));
    }

    #[test]
    fn rejects_an_empty_label() {
        assert!(!validate_domain("example..com"));
    }

    #[test]
    fn accepts_underscores_and_hyphens() {
        assert!(validate_domain("_dmarc.example-mail.com"));
    }
}
