//! String and code-list text handling
//!
//! Unescaping for single-line strings, indentation trimming for multiline
//! strings, and the tolerant splitters for comma-delimited sequence and
//! code lists.

/// Unescape a single-line string literal's body: `\\` then `\"`
pub fn unescape_string(raw: &str) -> String {
    let body = raw.strip_prefix('"').unwrap_or(raw);
    let body = body.strip_suffix('"').unwrap_or(body);

    let mut result = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(ch);
        }
    }
    result
}

/// Trim a multiline string literal
///
/// 1. Strip the `"""` delimiters (and a single newline right after the
///    opening delimiter).
/// 2. Drop a trailing whitespace-only line.
/// 3. Strip the minimum leading-space count of the non-blank lines from
///    every line.
pub fn trim_multiline_string(raw: &str) -> String {
    let body = raw.strip_prefix("\"\"\"").unwrap_or(raw);
    let body = body.strip_suffix("\"\"\"").unwrap_or(body);
    let body = body.strip_prefix('\n').unwrap_or(body);

    let mut lines: Vec<&str> = body.split('\n').collect();
    if let Some(last) = lines.last() {
        if !last.is_empty() && last.trim().is_empty() {
            lines.pop();
        } else if last.is_empty() && lines.len() > 1 {
            lines.pop();
        }
    }

    let indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.chars().take_while(|c| *c == ' ').count())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|line| {
            // Shorter (blank) lines keep their content untouched
            let strip = indent.min(line.chars().take_while(|c| *c == ' ').count());
            &line[strip..]
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split a comma-delimited sequence list into its sequences
pub fn split_sequences(list: &str) -> Vec<String> {
    list.split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

/// One entry of a comma-delimited code list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeListEntry {
    /// The code text as written, including any `SYSTEM#` prefix
    pub code: String,
    /// Display string body (unescaped), when one followed the code
    pub display: Option<String>,
}

/// Split a comma-delimited code list tolerantly
///
/// Entries are separated by commas outside quotes. Each entry is a code
/// (quoted code parts allowed) optionally followed by a whitespace-
/// separated quoted description.
pub fn split_codes(list: &str) -> Vec<CodeListEntry> {
    let mut entries = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for ch in list.chars() {
        if in_quotes {
            current.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_quotes = false;
            }
            continue;
        }
        match ch {
            '"' => {
                in_quotes = true;
                current.push(ch);
            }
            ',' => {
                if let Some(entry) = parse_code_entry(&current) {
                    entries.push(entry);
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if let Some(entry) = parse_code_entry(&current) {
        entries.push(entry);
    }

    entries
}

/// Parse one `code ("display")?` segment of a code list
fn parse_code_entry(segment: &str) -> Option<CodeListEntry> {
    let segment = segment.trim();
    if segment.is_empty() {
        return None;
    }

    // The display starts at the first quote that follows whitespace (a
    // quoted code part is glued to the '#')
    let mut split_at = None;
    let mut prev_was_space = false;
    for (idx, ch) in segment.char_indices() {
        if ch == '"' && prev_was_space {
            split_at = Some(idx);
            break;
        }
        prev_was_space = ch.is_whitespace();
    }

    match split_at {
        Some(idx) => {
            let code = segment[..idx].trim().to_string();
            let display = unescape_string(segment[idx..].trim());
            Some(CodeListEntry {
                code,
                display: Some(display),
            })
        }
        None => Some(CodeListEntry {
            code: segment.to_string(),
            display: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_string() {
        assert_eq!(unescape_string("\"plain\""), "plain");
        assert_eq!(unescape_string("\"a \\\"quote\\\"\""), "a \"quote\"");
        assert_eq!(unescape_string("\"back\\\\slash\""), "back\\slash");
    }

    #[test]
    fn test_multiline_basic() {
        let raw = "\"\"\"\n    line one\n    line two\n    \"\"\"";
        assert_eq!(trim_multiline_string(raw), "line one\nline two");
    }

    #[test]
    fn test_multiline_keeps_relative_indent() {
        let raw = "\"\"\"\n  outer\n    inner\n  \"\"\"";
        assert_eq!(trim_multiline_string(raw), "outer\n  inner");
    }

    #[test]
    fn test_multiline_blank_lines_untouched() {
        let raw = "\"\"\"\n    a\n\n    b\n\"\"\"";
        assert_eq!(trim_multiline_string(raw), "a\n\nb");
    }

    #[test]
    fn test_multiline_stable_under_reindent() {
        // Stripping is stable when the whole block shifts right
        let src = "\"\"\"\n  a\n    b\n\"\"\"";
        let indented = "\"\"\"\n      a\n        b\n\"\"\"";
        assert_eq!(trim_multiline_string(src), trim_multiline_string(indented));
    }

    #[test]
    fn test_split_sequences() {
        assert_eq!(
            split_sequences("a.b, c.d ,e"),
            vec!["a.b".to_string(), "c.d".to_string(), "e".to_string()]
        );
    }

    #[test]
    fn test_split_codes_plain() {
        let entries = split_codes("#a, SYS#b");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].code, "#a");
        assert!(entries[0].display.is_none());
        assert_eq!(entries[1].code, "SYS#b");
    }

    #[test]
    fn test_split_codes_with_displays() {
        let entries = split_codes("#a \"first, not a separator\", #b \"second\"");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].code, "#a");
        assert_eq!(entries[0].display.as_deref(), Some("first, not a separator"));
        assert_eq!(entries[1].code, "#b");
        assert_eq!(entries[1].display.as_deref(), Some("second"));
    }

    #[test]
    fn test_split_codes_quoted_code_part() {
        let entries = split_codes("#\"has space\" \"Display\", #plain");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].code, "#\"has space\"");
        assert_eq!(entries[0].display.as_deref(), Some("Display"));
        assert_eq!(entries[1].code, "#plain");
    }
}
