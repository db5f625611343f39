//! Distinguished name and filter value handling.

/// Escape a value for use inside a DN attribute value (RFC 4514).
pub fn escape_dn_value(value: &str) -> String {
    let char_count = value.chars().count();
    let mut result = String::with_capacity(value.len() * 2);

    for (i, ch) in value.chars().enumerate() {
        let is_first = i == 0;
        let is_last = i + 1 == char_count;

        match ch {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                result.push('\\');
                result.push(ch);
            }
            '\0' => result.push_str("\\00"),
            ' ' if is_first || is_last => result.push_str("\\20"),
            '#' if is_first => result.push_str("\\23"),
            _ => result.push(ch),
        }
    }

    result
}

/// Escape a value for use inside a search filter (RFC 4515).
pub fn escape_filter_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => result.push_str("\\5c"),
            '*' => result.push_str("\\2a"),
            '(' => result.push_str("\\28"),
            ')' => result.push_str("\\29"),
            '\0' => result.push_str("\\00"),
            _ => result.push(ch),
        }
    }
    result
}

/// Byte offset of the first unescaped comma, if any.
fn first_separator(dn: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, ch) in dn.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            ',' => return Some(i),
            _ => {}
        }
    }
    None
}

/// The leading RDN of a DN, still escaped (`OU=PROD_SRV01`).
pub fn leading_rdn(dn: &str) -> &str {
    match first_separator(dn) {
        Some(i) => dn[..i].trim(),
        None => dn.trim(),
    }
}

/// The DN of the containing entry, or `None` for a single-RDN DN.
pub fn parent_dn(dn: &str) -> Option<&str> {
    first_separator(dn).map(|i| dn[i + 1..].trim())
}

/// The unescaped value of the leading RDN (`OU=PROD_SRV01,...` -> `PROD_SRV01`).
pub fn rdn_value(dn: &str) -> String {
    let rdn = leading_rdn(dn);
    let raw = match rdn.find('=') {
        Some(i) => &rdn[i + 1..],
        None => rdn,
    };
    unescape_dn_value(raw)
}

/// Hex escapes are raw bytes; consecutive ones may form one UTF-8 character.
fn unescape_dn_value(value: &str) -> String {
    let mut bytes = Vec::with_capacity(value.len());
    let mut buf = [0u8; 4];
    let mut chars = value.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let Some(next) = chars.next() else { break };
        if let (Some(high), Some(low)) = (
            next.to_digit(16),
            chars.peek().and_then(|c| c.to_digit(16)),
        ) {
            chars.next();
            bytes.push((high * 16 + low) as u8);
            continue;
        }
        bytes.extend_from_slice(next.encode_utf8(&mut buf).as_bytes());
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Case-insensitive DN comparison, ignoring whitespace around separators.
pub fn dn_eq(a: &str, b: &str) -> bool {
    normalize_dn(a) == normalize_dn(b)
}

/// Lowercased DN with whitespace trimmed around each RDN.
pub fn normalize_dn(dn: &str) -> String {
    let mut parts = Vec::new();
    let mut rest = dn;
    loop {
        parts.push(leading_rdn(rest).to_lowercase());
        match parent_dn(rest) {
            Some(parent) => rest = parent,
            None => break,
        }
    }
    parts.join(",")
}

/// Whether `dn` lies strictly below `ancestor`.
pub fn is_descendant(dn: &str, ancestor: &str) -> bool {
    let dn = normalize_dn(dn);
    let ancestor = normalize_dn(ancestor);
    dn.len() > ancestor.len() && dn.ends_with(&format!(",{ancestor}"))
}
