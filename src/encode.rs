//! Value-to-C-text encoders.
//!
//! Everything here is pure and deterministic: same input, same bytes.
use regex::Regex;

// ------------------------------- Literals --------------------------------- //

/// Escape one byte for use inside a C string literal.
///
/// Non-printables use 3-digit octal escapes: unlike `\x`, they never swallow
/// a following literal digit.
fn push_escaped(out: &mut String, b: u8) {
    match b {
        b'"' => out.push_str("\\\""),
        b'\\' => out.push_str("\\\\"),
        b'\n' => out.push_str("\\n"),
        b'\r' => out.push_str("\\r"),
        // `??x` would be a trigraph in older C dialects
        b'?' => out.push_str("\\?"),
        0x20..=0x7e => out.push(b as char),
        _ => out.push_str(&format!("\\{b:03o}")),
    }
}

/// Quoted C string literal for arbitrary bytes.
pub fn c_bytes_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    for &b in bytes {
        push_escaped(&mut out, b);
    }
    out.push('"');
    out
}

/// Quoted C string literal; non-ASCII text is emitted as escaped UTF-8 bytes.
pub fn c_string_literal(s: &str) -> String {
    c_bytes_literal(s.as_bytes())
}

/// Brace initializer for an array of C strings, e.g. `{"/a", "/b"}`.
pub fn c_string_list(items: &[String]) -> String {
    let parts: Vec<String> = items.iter().map(|s| c_string_literal(s)).collect();
    format!("{{{}}}", parts.join(", "))
}

/// Option name → macro name.
pub fn macro_name(option: &str) -> String {
    option.to_ascii_uppercase()
}

// ------------------------------- Bitmask ---------------------------------- //

/// One bit per byte value.
pub const MASK_BYTES: usize = 32;
pub const MASK_LEN_MACRO: &str = "WHITELIST_MASK_LEN";

pub type Bitmask = [u8; MASK_BYTES];

/// Compile a whitelist pattern with whole-string semantics.
pub fn whitelist_regex(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

/// Bit `i` (byte `i / 8`, bit `i % 8`, LSB first) is set iff the one-character
/// string with code point `i` matches `re`.
pub fn whitelist_mask(re: &Regex) -> Bitmask {
    let mut mask = [0u8; MASK_BYTES];
    let mut buf = [0u8; 4];
    for code in 0..=u8::MAX {
        let c = char::from(code);
        if re.is_match(c.encode_utf8(&mut buf)) {
            mask[usize::from(code / 8)] |= 1 << (code % 8);
        }
    }
    mask
}

pub fn mask_contains(mask: &Bitmask, code: u8) -> bool {
    mask[usize::from(code / 8)] & (1 << (code % 8)) != 0
}

// -------------------------------- Flags ----------------------------------- //

pub const HTTP_FLAG_PREFIX: &str = "HTTP_REQ_";

/// Allowed request methods, in flag-bit order of the consumer's header.
pub const HTTP_METHODS: [&str; 7] = ["HEAD", "GET", "POST", "PUT", "DELETE", "TRACE", "CONNECT"];

/// Canonicalize a method list against [`HTTP_METHODS`]: vocabulary order, no
/// duplicates. Returns the first method outside the vocabulary on failure.
pub fn canonical_methods<'a, I>(methods: I) -> Result<Vec<&'static str>, String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = [false; HTTP_METHODS.len()];
    for method in methods {
        match HTTP_METHODS.iter().position(|m| *m == method) {
            Some(i) => seen[i] = true,
            None => return Err(method.to_string()),
        }
    }
    Ok(HTTP_METHODS
        .iter()
        .zip(seen)
        .filter_map(|(m, on)| on.then_some(*m))
        .collect())
}

/// `(HTTP_REQ_GET | HTTP_REQ_POST)`; a single flag is bare, none is `0`.
pub fn http_flags_expr(methods: &[&str]) -> String {
    let flags: Vec<String> = methods
        .iter()
        .map(|m| format!("{HTTP_FLAG_PREFIX}{}", m.to_ascii_uppercase()))
        .collect();
    match flags.len() {
        0 => String::from("0"),
        1 => flags.into_iter().collect(),
        _ => format!("({})", flags.join(" | ")),
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    /// Parse a C string literal produced by [`c_bytes_literal`] back to bytes.
    fn decode_c_literal(lit: &str) -> Vec<u8> {
        let inner = lit
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .expect("quoted literal");
        let bytes = inner.as_bytes();
        let mut out = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] != b'\\' {
                out.push(bytes[i]);
                i += 1;
                continue;
            }
            let next = bytes[i + 1];
            match next {
                b'"' | b'\\' | b'?' => { out.push(next); i += 2; }
                b'n' => { out.push(b'\n'); i += 2; }
                b'r' => { out.push(b'\r'); i += 2; }
                b'0'..=b'7' => {
                    let digits = std::str::from_utf8(&bytes[i + 1..i + 4]).unwrap();
                    out.push(u8::from_str_radix(digits, 8).unwrap());
                    i += 4;
                }
                other => panic!("unexpected escape \\{}", other as char),
            }
        }
        out
    }

    #[test]
    fn string_literal_escapes_specials() {
        assert_eq!(c_string_literal("a\"b"), r#""a\"b""#);
        assert_eq!(c_string_literal("back\\slash"), r#""back\\slash""#);
        assert_eq!(c_string_literal("l1\nl2\r"), r#""l1\nl2\r""#);
        assert_eq!(c_string_literal("tab\t"), r#""tab\011""#);
        assert_eq!(c_string_literal("é"), r#""\303\251""#);
    }

    #[test]
    fn octal_escape_does_not_eat_following_digits() {
        let lit = c_bytes_literal(&[0x01, b'7']);
        assert_eq!(lit, r#""\0017""#);
        assert_eq!(decode_c_literal(&lit), vec![0x01, b'7']);
    }

    #[test]
    fn all_byte_values_survive_literal_encoding() {
        let bytes: Vec<u8> = (0..=u8::MAX).collect();
        let lit = c_bytes_literal(&bytes);
        assert!(lit.is_ascii());
        assert_eq!(decode_c_literal(&lit), bytes);
    }

    #[test]
    fn mask_bits_reproduce_regex_matches() {
        for pattern in ["[a-z0-9_]", "[^\"\\\\]", "\\s", ".", "[\\x00-\\x1f]", "é|ÿ"] {
            let re = whitelist_regex(pattern).unwrap();
            let mask = whitelist_mask(&re);
            let decoded: Vec<u8> = decode_c_literal(&c_bytes_literal(&mask));
            let decoded: Bitmask = decoded.try_into().unwrap();
            for code in 0..=u8::MAX {
                let expected = re.is_match(&char::from(code).to_string());
                assert_eq!(mask_contains(&decoded, code), expected, "pattern {pattern:?}, code {code}");
            }
        }
    }

    #[test]
    fn mask_uses_whole_string_matching() {
        let re = whitelist_regex("a|").unwrap();
        let mask = whitelist_mask(&re);
        assert!(mask_contains(&mask, b'a'));
        assert!(!mask_contains(&mask, b'b'));
    }

    #[test]
    fn flags_or_exactly_the_listed_methods() {
        let methods = canonical_methods(["POST", "GET"]).unwrap();
        assert_eq!(methods, vec!["GET", "POST"]);
        assert_eq!(http_flags_expr(&methods), "(HTTP_REQ_GET | HTTP_REQ_POST)");
    }

    #[test]
    fn flags_edge_cases() {
        assert_eq!(http_flags_expr(&[]), "0");
        assert_eq!(http_flags_expr(&["HEAD"]), "HTTP_REQ_HEAD");
        assert_eq!(canonical_methods(["GET", "GET"]).unwrap(), vec!["GET"]);
        assert_eq!(canonical_methods(["GET", "PATCH"]).unwrap_err(), "PATCH");
    }

    #[test]
    fn string_list_initializer() {
        let items = vec!["/a".to_string(), "/b".to_string()];
        assert_eq!(c_string_list(&items), r#"{"/a", "/b"}"#);
    }
}
