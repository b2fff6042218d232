//! Input hygiene for user-supplied text, addresses and media URLs.

use crate::errors::ServiceError;

pub const MAX_POST_CHARS: usize = 5000;
pub const MAX_REPLY_CHARS: usize = 2000;
pub const MAX_MEDIA_URL_LEN: usize = 2048;
pub const MAX_DISPLAY_NAME_CHARS: usize = 100;
pub const MAX_BIO_CHARS: usize = 500;
const MAX_TAG_LEN: usize = 256;

/// Lowercase and validate a wallet / account address (`0x` + 40 hex).
pub fn normalize_address(raw: &str) -> Result<String, ServiceError> {
    let addr = raw.trim().to_ascii_lowercase();
    let valid = addr.len() == 42
        && addr.starts_with("0x")
        && addr[2..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(ServiceError::validation(format!("invalid address: {raw:?}")));
    }
    Ok(addr)
}

/// Strip markup and control characters, tidy whitespace and enforce a
/// character limit. May return an empty string.
pub fn sanitize_content(raw: &str, max_chars: usize) -> Result<String, ServiceError> {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(unified.len());
    // held back until a `>` closes it; an unclosed `<b` is text
    let mut tag: Option<String> = None;
    let mut chars = unified.chars().peekable();
    while let Some(c) = chars.next() {
        if let Some(mut buf) = tag.take() {
            match c {
                '>' => continue,
                '<' => push_text(&mut out, &buf),
                _ => {
                    buf.push(c);
                    if buf.len() > MAX_TAG_LEN {
                        push_text(&mut out, &buf);
                    } else {
                        tag = Some(buf);
                    }
                    continue;
                }
            }
        }
        // only `<tag`, `</tag` and `<!...` open markup; "1 < 2" stays text
        if c == '<' && chars.peek().is_some_and(|n| n.is_ascii_alphabetic() || *n == '/' || *n == '!') {
            tag = Some(String::from('<'));
            continue;
        }
        push_char(&mut out, c);
    }
    if let Some(buf) = tag {
        push_text(&mut out, &buf);
    }

    let mut collapsed = String::with_capacity(out.len());
    let mut newlines = 0;
    for c in out.chars() {
        if c == '\n' {
            newlines += 1;
            if newlines > 2 {
                continue;
            }
        } else {
            newlines = 0;
        }
        collapsed.push(c);
    }

    let trimmed = collapsed.trim().to_string();
    let count = trimmed.chars().count();
    if count > max_chars {
        return Err(ServiceError::validation(format!(
            "content too long: {count} characters (max {max_chars})"
        )));
    }
    Ok(trimmed)
}

fn push_char(out: &mut String, c: char) {
    match c {
        '\n' | '\t' => out.push(c),
        c if c.is_control() => {}
        c => out.push(c),
    }
}

fn push_text(out: &mut String, text: &str) {
    text.chars().for_each(|c| push_char(out, c));
}

/// Accept only URL schemes a client can safely render as media.
pub fn validate_media_url(raw: &str) -> Result<String, ServiceError> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(ServiceError::validation("media url is empty"));
    }
    if url.len() > MAX_MEDIA_URL_LEN {
        return Err(ServiceError::validation("media url too long"));
    }
    if url.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ServiceError::validation("media url contains whitespace"));
    }

    let lower = url.to_ascii_lowercase();
    let rest = ["https://", "ipfs://", "ar://", "lens://"]
        .iter()
        .find_map(|scheme| lower.strip_prefix(scheme));
    let Some(rest) = rest else {
        return Err(ServiceError::validation(format!("unsupported media url scheme: {url}")));
    };

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if authority.is_empty() || authority.contains('@') {
        return Err(ServiceError::validation("media url has no valid host or identifier"));
    }
    Ok(url.to_string())
}

/// Lens-style handle: 3..=26 of `[a-z0-9_]`, stored lowercase without `@`.
pub fn normalize_handle(raw: &str) -> Result<String, ServiceError> {
    let handle = raw.trim().trim_start_matches('@').to_ascii_lowercase();
    let ok = (3..=26).contains(&handle.len())
        && handle.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !ok {
        return Err(ServiceError::validation("handle must be 3-26 characters of a-z, 0-9 or _"));
    }
    Ok(handle)
}

/// Sanitize a short single-purpose text field; empty means "clear".
pub fn sanitize_field(raw: &str, max_chars: usize, field: &str) -> Result<Option<String>, ServiceError> {
    let clean = sanitize_content(raw, max_chars)
        .map_err(|_| ServiceError::validation(format!("{field} exceeds {max_chars} characters")))?;
    Ok(if clean.is_empty() { None } else { Some(clean) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_normalization() {
        let a = normalize_address("  0xAbCDEF0123456789abcdef0123456789ABCDEF01 ").unwrap();
        assert_eq!(a, "0xabcdef0123456789abcdef0123456789abcdef01");
        assert!(normalize_address("0x123").is_err());
        assert!(normalize_address("abcdef0123456789abcdef0123456789abcdef0123").is_err());
        assert!(normalize_address("0xZZcdef0123456789abcdef0123456789abcdef01").is_err());
    }

    #[test]
    fn strips_tags_and_controls() {
        let s = sanitize_content("  <script>alert(1)</script>hello\u{0007} <b>world</b>  ", 100).unwrap();
        assert_eq!(s, "alert(1)hello world");
    }

    #[test]
    fn bare_angle_brackets_survive() {
        assert_eq!(sanitize_content("1 < 2 and 3 > 2", 100).unwrap(), "1 < 2 and 3 > 2");
    }

    #[test]
    fn unclosed_tag_is_kept_as_text() {
        assert_eq!(sanitize_content("if a<b then c", 100).unwrap(), "if a<b then c");
        assert_eq!(sanitize_content("I said <hello and left", 100).unwrap(), "I said <hello and left");
        assert_eq!(sanitize_content("a<b <i>x</i>", 100).unwrap(), "a<b x");
    }

    #[test]
    fn overlong_tag_is_kept_as_text() {
        let raw = format!("<a{}>", "x".repeat(300));
        assert_eq!(sanitize_content(&raw, 1000).unwrap(), raw);
    }

    #[test]
    fn collapses_blank_lines_and_keeps_tabs() {
        let s = sanitize_content("a\r\n\r\n\r\n\r\nb\tc", 100).unwrap();
        assert_eq!(s, "a\n\nb\tc");
    }

    #[test]
    fn enforces_char_limit_on_chars_not_bytes() {
        assert!(sanitize_content(&"é".repeat(10), 10).is_ok());
        assert!(sanitize_content(&"é".repeat(11), 10).is_err());
    }

    #[test]
    fn whitespace_only_becomes_empty() {
        assert_eq!(sanitize_content(" \n\t <br/> ", 10).unwrap(), "");
    }

    #[test]
    fn media_url_rules() {
        assert!(validate_media_url("https://cdn.example.com/a.png").is_ok());
        assert!(validate_media_url("ipfs://bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi").is_ok());
        assert!(validate_media_url("ar://abc123").is_ok());
        assert!(validate_media_url("lens://4f91cab87ab5e4f5066f878b72").is_ok());

        assert!(validate_media_url("http://cdn.example.com/a.png").is_err());
        assert!(validate_media_url("javascript:alert(1)").is_err());
        assert!(validate_media_url("data:image/png;base64,AAAA").is_err());
        assert!(validate_media_url("https:///nohost").is_err());
        assert!(validate_media_url("https://user@evil.example/a.png").is_err());
        assert!(validate_media_url("https://cdn.example.com/a b.png").is_err());
        assert!(validate_media_url(&format!("https://x.io/{}", "a".repeat(3000))).is_err());
    }

    #[test]
    fn handle_rules() {
        assert_eq!(normalize_handle("@Alice_01").unwrap(), "alice_01");
        assert!(normalize_handle("ab").is_err());
        assert!(normalize_handle("has-dash").is_err());
    }

    #[test]
    fn field_sanitizing_clears_on_empty() {
        assert_eq!(sanitize_field("   ", 10, "bio").unwrap(), None);
        assert_eq!(sanitize_field(" hi ", 10, "bio").unwrap().as_deref(), Some("hi"));
        assert!(sanitize_field(&"x".repeat(11), 10, "bio").is_err());
    }
}
