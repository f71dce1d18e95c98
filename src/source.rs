//! Input preprocessing: comment stripping and JSON parsing.
use serde_json::Value;

/// Lines whose first non-whitespace character is this marker are ignored.
pub const COMMENT_MARKER: char = '#';

/// Blank out comment lines.
///
/// Comment lines are replaced by empty lines rather than removed so that line
/// numbers in parse errors still point into the original file.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        if !line.trim_start().starts_with(COMMENT_MARKER) {
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

pub fn parse_document(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str::<Value>(&strip_comments(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn comment_lines_are_dropped() {
        let src = "# leading comment\n{\n    # indented comment\n    \"a\": 1\n}\n";
        let value = parse_document(src).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn markers_inside_strings_are_kept() {
        let src = "{\"whitelist\": \"[#a-z]\"}";
        let value = parse_document(src).unwrap();
        assert_eq!(value["whitelist"], "[#a-z]");
    }

    #[test]
    fn line_numbers_survive_stripping() {
        let src = "# one\n# two\n{ oops }\n";
        let err = parse_document(src).unwrap_err();
        assert_eq!(err.line(), 3);
    }
}
