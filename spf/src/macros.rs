use std::net::IpAddr;

/// Inputs a macro expansion can draw on (spec §4.6 "Macros"). `c`/`r`/`t`
/// are only meaningful in an `exp=` explanation context; callers outside
/// that context leave them `None`.
pub struct MacroContext<'a> {
    pub sender: &'a str,
    pub domain: &'a str,
    pub ip: IpAddr,
    pub validated_name: Option<&'a str>,
    pub helo: &'a str,
    pub exp_local_hostname: Option<&'a str>,
    pub exp_unix_time: Option<u64>,
}

fn sender_local(sender: &str) -> &str {
    sender.split('@').next().unwrap_or(sender)
}

fn sender_domain(sender: &str) -> &str {
    sender.split('@').nth(1).unwrap_or("")
}

fn ip_presentation(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => {
            let mut nibbles = Vec::with_capacity(32);
            for segment in v6.segments() {
                for shift in (0..4).rev() {
                    nibbles.push(format!("{:x}", (segment >> (shift * 4)) & 0xf));
                }
            }
            nibbles.join(".")
        }
    }
}

fn url_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

/// Splits `value` on any byte in `delims` (default `.` when empty), keeps
/// the rightmost `n` parts if given, reverses order if `reverse` is set,
/// and rejoins with `.` (spec §4.6).
fn transform(value: &str, digits: &str, reverse: bool, delims: &str) -> Result<String, ()> {
    let delims = if delims.is_empty() { "." } else { delims };
    let mut parts: Vec<&str> = value.split(|c| delims.contains(c)).collect();
    if !digits.is_empty() {
        let n: usize = digits.parse().map_err(|_| ())?;
        if n == 0 {
            return Err(());
        }
        if n < parts.len() {
            parts = parts[parts.len() - n..].to_vec();
        }
    }
    if reverse {
        parts.reverse();
    }
    Ok(parts.join("."))
}

fn base_value(letter: char, ctx: &MacroContext) -> Result<String, ()> {
    // `c`/`r`/`t` are only meaningful inside an `exp=` explanation;
    // `exp_local_hostname` is the context's own exp-only marker.
    let in_exp_context = ctx.exp_local_hostname.is_some();
    Ok(match letter {
        's' => ctx.sender.to_string(),
        'l' => sender_local(ctx.sender).to_string(),
        'o' => sender_domain(ctx.sender).to_string(),
        'd' => ctx.domain.to_string(),
        'i' => ip_presentation(ctx.ip),
        'c' => {
            if !in_exp_context {
                return Err(());
            }
            ip_presentation(ctx.ip)
        }
        'p' => ctx.validated_name.unwrap_or("unknown").to_string(),
        'v' => match ctx.ip {
            IpAddr::V4(_) => "in-addr".to_string(),
            IpAddr::V6(_) => "ip6".to_string(),
        },
        'h' => ctx.helo.to_string(),
        'r' => ctx.exp_local_hostname.ok_or(())?.to_string(),
        't' => ctx.exp_unix_time.ok_or(())?.to_string(),
        _ => return Err(()),
    })
}

/// Expands one `%{...}` macro body (the part between the braces,
/// excluding `%{` and `}`).
fn expand_macro_body(body: &str, ctx: &MacroContext) -> Result<String, ()> {
    let mut chars = body.chars();
    let letter = chars.next().ok_or(())?;
    let upper = letter.is_ascii_uppercase();
    let letter = letter.to_ascii_lowercase();
    if !"slodipvhcrt".contains(letter) {
        return Err(());
    }
    let rest: String = chars.collect();
    let digit_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let digits = &rest[..digit_end];
    let rest = &rest[digit_end..];
    let reverse = rest.starts_with('r');
    let delims = if reverse { &rest[1..] } else { rest };

    let value = base_value(letter, ctx)?;
    let transformed = transform(&value, digits, reverse, delims)?;
    Ok(if upper { url_escape(&transformed) } else { transformed })
}

/// Expands a full domain-spec/explanation template: `%{...}` macros and
/// the `%%`/`%_`/`%-` escapes, leaving all other text untouched (spec
/// §4.6).
pub fn expand(template: &str, ctx: &MacroContext) -> Result<String, ()> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('_') => out.push(' '),
            Some('-') => out.push_str("%20"),
            Some('{') => {
                let mut body = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => body.push(c),
                        None => return Err(()),
                    }
                }
                out.push_str(&expand_macro_body(&body, ctx)?);
            }
            _ => return Err(()),
        }
    }
    Ok(out)
}
