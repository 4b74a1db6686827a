/// Splits `address` at its first `@`, the way `sender_domain`/
/// `recipient_domain` are defined (spec §3 invariant): the domain is
/// whatever follows the first `@`, or empty if there is none.
pub fn split_domain(address: &str) -> (&str, &str) {
    match address.find('@') {
        Some(pos) => (&address[..pos], &address[pos + 1..]),
        None => (address, ""),
    }
}

/// `local-part with runs of digits replaced by '#', VERP '+ext' stripped,
/// then '#' then domain` (spec §3). Returns the empty string for an empty
/// sender, matching end-to-end scenario 1 (`sender=`).
pub fn normalized_sender(sender: &str) -> String {
    if sender.is_empty() {
        return String::new();
    }
    let (local, domain) = split_domain(sender);
    let local = match local.find('+') {
        Some(pos) => &local[..pos],
        None => local,
    };

    let mut out = String::with_capacity(local.len() + domain.len() + 1);
    let mut chars = local.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            out.push('#');
            while matches!(chars.peek(), Some(c) if c.is_ascii_digit()) {
                chars.next();
            }
        } else {
            out.push(c);
        }
    }
    out.push('#');
    out.push_str(domain);
    out
}

/// The dial-up-pool-evasion defeat described in spec §3: reduces an IPv4
/// client address to its /24 prefix unless the client's PTR hostname
/// already embeds the address's last two octets (in which case the pool
/// is considered stable enough that greylisting the full address is
/// meaningful). IPv6 addresses and addresses with no reported hostname
/// pass through unchanged.
pub fn normalized_client(client_address: &str, client_name: &str) -> String {
    let octets: Vec<&str> = client_address.split('.').collect();
    if octets.len() != 4 || !octets.iter().all(|o| o.parse::<u8>().is_ok()) {
        return client_address.to_string();
    }
    let (c, d) = (octets[2], octets[3]);
    if !client_name.is_empty() && client_name.contains(c) && client_name.contains(d) {
        return client_address.to_string();
    }
    format!("{}.{}.{}", octets[0], octets[1], octets[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_verp_extension_before_digit_folding() {
        assert_eq!(normalized_sender("user+bounce123@example.com"), "user#@example.com");
    }

    #[test]
    fn folds_digit_runs_of_any_length_the_same_way() {
        assert_eq!(normalized_sender("a1b22c333@x"), "a#b#c###@x");
    }

    #[test]
    fn empty_sender_normalizes_to_empty() {
        assert_eq!(normalized_sender(""), "");
    }

    #[test]
    fn stability_under_digit_run_length_change() {
        // Testable property (spec §8): replacing a digit run with another
        // run of the SAME length must not change normalized_sender.
        assert_eq!(normalized_sender("a42b@x"), normalized_sender("a99b@x"));
    }

    #[test]
    fn client_without_matching_ptr_collapses_to_slash_24() {
        assert_eq!(normalized_client("1.2.3.4", "host.example.net"), "1.2.3");
    }

    #[test]
    fn client_with_octets_embedded_in_ptr_is_kept_whole() {
        assert_eq!(
            normalized_client("1.2.3.4", "pool-3-4.isp.example.net"),
            "1.2.3.4"
        );
    }

    #[test]
    fn non_ipv4_passes_through() {
        assert_eq!(normalized_client("2001:db8::1", ""), "2001:db8::1");
    }
}
