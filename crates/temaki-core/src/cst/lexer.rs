//! CST-aware lexer that preserves all trivia (whitespace, comments)
//!
//! The lexer produces the token classes the grammar is built on: whole-word
//! sequences (names, ids, URLs, dotted paths), strings and multiline
//! strings, numbers, date/time literals, cardinalities, regexes, UCUM
//! units, code literals, `Reference(...)` literals, caret sequences, and
//! comma-delimited sequence/code lists. All source text is preserved so
//! that `parse(source).text() == source`.

use crate::cst::FshSyntaxKind;
use std::ops::Range;

/// Simple span representing a byte range in the source
pub type CstSpan = Range<usize>;

/// A lexer error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerError {
    pub message: String,
    pub span: CstSpan,
}

impl LexerError {
    pub fn new(message: impl Into<String>, span: CstSpan) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// A token with its syntax kind and span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CstToken {
    pub kind: FshSyntaxKind,
    pub text: String,
    pub span: CstSpan,
}

impl CstToken {
    pub fn new(kind: FshSyntaxKind, text: impl Into<String>, span: CstSpan) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }
}

/// Result returned by the lexer
pub type CstLexResult = (Vec<CstToken>, Vec<LexerError>);

/// Characters that always terminate a word at bracket depth zero
fn is_word_terminator(ch: char) -> bool {
    matches!(ch, '(' | ')' | ',' | '=' | '"')
}

/// Lex input preserving ALL trivia for CST construction
pub fn lex_with_trivia(input: &str) -> CstLexResult {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    let len = input.len();
    let mut i = 0usize;

    while i < len {
        let (current, size) = match next_char(input, i) {
            Some(pair) => pair,
            None => break,
        };
        let start = i;

        match current {
            // Newlines (kept separate from whitespace so the parser can
            // detect line boundaries)
            '\n' => {
                tokens.push(CstToken::new(
                    FshSyntaxKind::Newline,
                    "\n",
                    span(start, i + size),
                ));
                i += size;
            }
            '\r' => {
                let mut end = i + size;
                if let Some(('\n', nl_size)) = next_char(input, end) {
                    end += nl_size;
                }
                tokens.push(CstToken::new(
                    FshSyntaxKind::Newline,
                    &input[start..end],
                    span(start, end),
                ));
                i = end;
            }

            // Whitespace (spaces, tabs)
            c if c.is_whitespace() => {
                let mut end = i + size;
                while let Some((next_ch, next_size)) = next_char(input, end) {
                    if next_ch.is_whitespace() && next_ch != '\n' && next_ch != '\r' {
                        end += next_size;
                    } else {
                        break;
                    }
                }
                tokens.push(CstToken::new(
                    FshSyntaxKind::Whitespace,
                    &input[start..end],
                    span(start, end),
                ));
                i = end;
            }

            // Comments and regex literals
            '/' => {
                if let Some((next, next_size)) = next_char(input, i + size) {
                    if next == '/' {
                        let mut end = i + size + next_size;
                        while let Some((c, step)) = next_char(input, end) {
                            if c == '\n' {
                                break;
                            }
                            end += step;
                        }
                        tokens.push(CstToken::new(
                            FshSyntaxKind::CommentLine,
                            &input[start..end],
                            span(start, end),
                        ));
                        i = end;
                        continue;
                    } else if next == '*' {
                        let (end, kind, err) = lex_block_comment(input, start);
                        if let Some(e) = err {
                            errors.push(e);
                        }
                        tokens.push(CstToken::new(kind, &input[start..end], span(start, end)));
                        i = end;
                        continue;
                    }
                }

                // Regex literal /pattern/
                if let Some((end, regex_error)) = lex_regex_literal(input, start) {
                    if let Some(err) = regex_error {
                        errors.push(err);
                    }
                    tokens.push(CstToken::new(
                        FshSyntaxKind::Regex,
                        &input[start..end],
                        span(start, end),
                    ));
                    i = end;
                } else {
                    // Stray slash, treat the run as a plain word
                    let end = lex_word_span(input, start);
                    tokens.push(CstToken::new(
                        FshSyntaxKind::Ident,
                        &input[start..end],
                        span(start, end),
                    ));
                    i = end;
                }
            }

            // Punctuation
            '*' => {
                tokens.push(CstToken::new(
                    FshSyntaxKind::Asterisk,
                    "*",
                    span(start, i + size),
                ));
                i += size;
            }
            ':' => {
                tokens.push(CstToken::new(
                    FshSyntaxKind::Colon,
                    ":",
                    span(start, i + size),
                ));
                i += size;
            }
            '=' => {
                tokens.push(CstToken::new(
                    FshSyntaxKind::Equals,
                    "=",
                    span(start, i + size),
                ));
                i += size;
            }
            ',' => {
                tokens.push(CstToken::new(
                    FshSyntaxKind::Comma,
                    ",",
                    span(start, i + size),
                ));
                i += size;
            }
            '(' => {
                tokens.push(CstToken::new(
                    FshSyntaxKind::LParen,
                    "(",
                    span(start, i + size),
                ));
                i += size;
            }
            ')' => {
                tokens.push(CstToken::new(
                    FshSyntaxKind::RParen,
                    ")",
                    span(start, i + size),
                ));
                i += size;
            }

            // Caret sequence: ^path.to.attr
            '^' => {
                let end = lex_word_span(input, i + size);
                let end = end.max(i + size);
                tokens.push(CstToken::new(
                    FshSyntaxKind::CaretSequence,
                    &input[start..end],
                    span(start, end),
                ));
                i = end;
            }

            // String literals
            '"' => {
                let (string_kind, end, string_error) = lex_string(input, start);
                if let Some(err) = string_error {
                    errors.push(err);
                }
                tokens.push(CstToken::new(
                    string_kind,
                    &input[start..end],
                    span(start, end),
                ));
                i = end;
            }

            // UCUM unit: 'mg', 'kg', ...
            '\'' => {
                let (end, unit_error) = lex_unit(input, start);
                if let Some(err) = unit_error {
                    errors.push(err);
                }
                tokens.push(CstToken::new(
                    FshSyntaxKind::Unit,
                    &input[start..end],
                    span(start, end),
                ));
                i = end;
            }

            // Numbers, cardinalities, date/time literals
            c if c.is_ascii_digit()
                || ((c == '-' || c == '+')
                    && next_char(input, i + size)
                        .map(|(n, _)| n.is_ascii_digit())
                        .unwrap_or(false)) =>
            {
                if let Some((kind, end)) = lex_numberish(input, start) {
                    tokens.push(CstToken::new(kind, &input[start..end], span(start, end)));
                    i = end;
                } else {
                    let (token, end, list_err) = lex_word_or_list(input, start);
                    if let Some(err) = list_err {
                        errors.push(err);
                    }
                    tokens.push(token);
                    i = end;
                }
            }

            // Codes starting with '#', words, keywords
            _ => {
                let (token, end, list_err) = lex_word_or_list(input, start);
                if let Some(err) = list_err {
                    errors.push(err);
                }
                if end == start {
                    // No progress: unknown character
                    errors.push(LexerError::new(
                        format!("Unexpected character: '{current}'"),
                        span(start, i + size),
                    ));
                    tokens.push(CstToken::new(
                        FshSyntaxKind::Error,
                        &input[start..i + size],
                        span(start, i + size),
                    ));
                    i += size;
                } else {
                    tokens.push(token);
                    i = end;
                }
            }
        }
    }

    tokens.push(CstToken::new(FshSyntaxKind::Eof, "", span(len, len)));

    (tokens, errors)
}

/// Lex a block comment, falling back to a line comment for a stray `/*`
/// with no terminator before end of input (SUSHI tolerates these)
fn lex_block_comment(input: &str, start: usize) -> (usize, FshSyntaxKind, Option<LexerError>) {
    let len = input.len();
    let mut i = start + 2;

    while i < len {
        let (ch, step) = match next_char(input, i) {
            Some(pair) => pair,
            None => break,
        };
        if ch == '*' {
            if let Some(('/', peek_size)) = next_char(input, i + step) {
                return (i + step + peek_size, FshSyntaxKind::CommentBlock, None);
            }
        }
        i += step;
    }

    let end = input[start..]
        .find('\n')
        .map(|rel| start + rel)
        .unwrap_or(len);
    (end, FshSyntaxKind::CommentLine, None)
}

/// Lex a word (or keyword, flag, code, reference, or comma-delimited list)
///
/// This is the workhorse for SEQUENCE-shaped tokens. The scanner consumes a
/// maximal run of non-whitespace text, stopping at delimiters only when
/// outside square brackets, with three special cases:
/// - a header keyword immediately followed by `:` stops before the colon,
/// - a `#` switches the token to a code literal (quoted code parts are
///   consumed with escapes),
/// - `Reference` followed by `(` consumes through the matching paren.
fn lex_word_or_list(input: &str, start: usize) -> (CstToken, usize, Option<LexerError>) {
    // Reference(...) literal
    if input[start..].starts_with("Reference") {
        let mut idx = start + "Reference".len();
        while let Some((ch, step)) = next_char(input, idx) {
            if ch == ' ' || ch == '\t' {
                idx += step;
            } else {
                break;
            }
        }
        if let Some(('(', _)) = next_char(input, idx) {
            let (end, err) = consume_parenthesized(input, idx, "Reference");
            return (
                CstToken::new(FshSyntaxKind::ReferenceLit, &input[start..end], span(start, end)),
                end,
                err,
            );
        }
    }

    let mut i = start;
    let mut has_code = false;
    let mut code_error = None;

    loop {
        let (ch, step) = match next_char(input, i) {
            Some(pair) => pair,
            None => break,
        };

        if ch.is_whitespace() {
            break;
        }

        match ch {
            '#' if !has_code => {
                has_code = true;
                i += step;
                // Quoted code part: #"some code"
                if let Some(('"', _)) = next_char(input, i) {
                    let (_, end, err) = lex_string(input, i);
                    code_error = err;
                    i = end;
                }
            }
            '[' => {
                // Bracketed path segment: consume through the closing bracket
                i += step;
                while let Some((inner, inner_step)) = next_char(input, i) {
                    if inner == '\n' || inner == '\r' {
                        break;
                    }
                    i += inner_step;
                    if inner == ']' {
                        break;
                    }
                }
            }
            ':' => {
                // Header keywords stop before the colon; URLs keep going
                let word = &input[start..i];
                if FshSyntaxKind::keyword_from_word(word)
                    .map(|k| k.is_header_keyword())
                    .unwrap_or(false)
                {
                    break;
                }
                i += step;
            }
            c if is_word_terminator(c) => break,
            _ => i += step,
        }
    }

    if i == start {
        return (
            CstToken::new(FshSyntaxKind::Error, "", span(start, start)),
            start,
            None,
        );
    }

    let word = &input[start..i];

    if has_code {
        // Possibly the head of a comma-delimited code list
        if let Some(list_end) = extend_comma_list(input, i, true) {
            return (
                CstToken::new(
                    FshSyntaxKind::CommaDelimitedCodes,
                    &input[start..list_end],
                    span(start, list_end),
                ),
                list_end,
                code_error,
            );
        }
        return (
            CstToken::new(FshSyntaxKind::Code, word, span(start, i)),
            i,
            code_error,
        );
    }

    if let Some(kind) = FshSyntaxKind::keyword_from_word(word) {
        if kind.is_header_keyword() {
            // Header keywords are only keywords when a colon follows;
            // otherwise the word is an ordinary sequence (e.g. a Parent
            // value of "Extension")
            let after = skip_spaces(input, i);
            if next_char(input, after).map(|(c, _)| c) == Some(':') {
                return (CstToken::new(kind, word, span(start, i)), i, None);
            }
        } else {
            return (CstToken::new(kind, word, span(start, i)), i, None);
        }
    }

    // Possibly the head of a comma-delimited sequence list (path1, path2)
    if let Some(list_end) = extend_comma_list(input, i, false) {
        return (
            CstToken::new(
                FshSyntaxKind::CommaDelimitedSequences,
                &input[start..list_end],
                span(start, list_end),
            ),
            list_end,
            None,
        );
    }

    (CstToken::new(FshSyntaxKind::Ident, word, span(start, i)), i, None)
}

/// Plain word span without list/code handling (used after `^`)
fn lex_word_span(input: &str, start: usize) -> usize {
    let mut i = start;
    while let Some((ch, step)) = next_char(input, i) {
        if ch.is_whitespace() || is_word_terminator(ch) {
            break;
        }
        if ch == '[' {
            i += step;
            while let Some((inner, inner_step)) = next_char(input, i) {
                if inner == '\n' || inner == '\r' {
                    break;
                }
                i += inner_step;
                if inner == ']' {
                    break;
                }
            }
            continue;
        }
        i += step;
    }
    i
}

/// Try to extend a lexed unit into a comma-delimited list token
///
/// Scans past optional display strings and spaces; when a comma followed by
/// another unit is found, consumes `(, unit (display)?)*` and returns the
/// end of the final unit (or its display string). Lists never span lines.
fn extend_comma_list(input: &str, first_end: usize, codes: bool) -> Option<usize> {
    let mut cursor = first_end;
    let mut end = first_end;
    let mut found_comma = false;

    loop {
        let mut probe = cursor;

        // Optional whitespace then display string (code lists only)
        probe = skip_spaces(input, probe);
        if codes {
            if let Some(('"', _)) = next_char(input, probe) {
                let (_, string_end, err) = lex_string(input, probe);
                if err.is_some() {
                    break;
                }
                probe = string_end;
                if found_comma {
                    end = string_end;
                } else {
                    // Display of the head unit is only swallowed once we
                    // know this is a list
                    let after = skip_spaces(input, probe);
                    if next_char(input, after).map(|(c, _)| c) != Some(',') {
                        break;
                    }
                }
                probe = skip_spaces(input, probe);
            }
        }

        match next_char(input, probe) {
            Some((',', comma_size)) => {
                probe += comma_size;
                probe = skip_spaces(input, probe);

                // Another unit must follow on the same line
                let unit_start = probe;
                let unit_end = consume_list_unit(input, unit_start, codes);
                if unit_end == unit_start {
                    break;
                }
                found_comma = true;
                end = unit_end;
                cursor = unit_end;
            }
            _ => break,
        }
    }

    if found_comma { Some(end) } else { None }
}

fn skip_spaces(input: &str, mut i: usize) -> usize {
    while let Some((ch, step)) = next_char(input, i) {
        if ch == ' ' || ch == '\t' {
            i += step;
        } else {
            break;
        }
    }
    i
}

/// Consume one unit of a comma list: a code (`SYS#code`, `#code`,
/// `#"quoted"`) or a plain sequence
fn consume_list_unit(input: &str, start: usize, codes: bool) -> usize {
    let mut i = start;
    let mut seen_hash = false;

    while let Some((ch, step)) = next_char(input, i) {
        if ch.is_whitespace() || is_word_terminator(ch) {
            break;
        }
        if ch == '#' && codes && !seen_hash {
            seen_hash = true;
            i += step;
            if let Some(('"', _)) = next_char(input, i) {
                let (_, end, _) = lex_string(input, i);
                i = end;
                break;
            }
            continue;
        }
        i += step;
    }

    i
}

/// Consume a parenthesized literal like `Reference(A|B)`, honoring escapes
fn consume_parenthesized(
    input: &str,
    open_index: usize,
    keyword: &str,
) -> (usize, Option<LexerError>) {
    let len = input.len();
    let mut i = open_index + 1;
    let mut depth = 1usize;

    while i < len {
        let (ch, size) = match next_char(input, i) {
            Some(pair) => pair,
            None => break,
        };

        match ch {
            '\\' => {
                i += size;
                if let Some((_, escape_size)) = next_char(input, i) {
                    i += escape_size;
                }
                continue;
            }
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                i += size;
                if depth == 0 {
                    return (i, None);
                }
                continue;
            }
            _ => {}
        }

        i += size;
    }

    let span_end = len.min(i);
    (
        span_end,
        Some(LexerError::new(
            format!("Unterminated {keyword} literal"),
            span(open_index, span_end),
        )),
    )
}

/// Lex a regex literal `/pattern/`; `None` when the slash does not open one
/// (no closing slash on the same line)
fn lex_regex_literal(input: &str, start: usize) -> Option<(usize, Option<LexerError>)> {
    let len = input.len();
    let mut i = start + 1;
    let mut is_escaped = false;

    while i < len {
        let (ch, size) = next_char(input, i)?;

        if ch == '\n' || ch == '\r' {
            return None;
        }

        if ch == '/' && !is_escaped {
            return Some((i + size, None));
        }

        is_escaped = !is_escaped && ch == '\\';
        i += size;
    }

    None
}

/// Lex a cardinality, date/time, time, or plain number starting at a digit
/// (or sign). `None` when the text cannot be a numeric token.
fn lex_numberish(input: &str, start: usize) -> Option<(FshSyntaxKind, usize)> {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut i = start;

    if i < len && (bytes[i] == b'-' || bytes[i] == b'+') {
        i += 1;
    }

    let digits_start = i;
    while i < len && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - digits_start;
    if int_digits == 0 {
        return None;
    }

    // Cardinality: INT..INT or INT..*
    if i + 1 < len && bytes[i] == b'.' && bytes[i + 1] == b'.' {
        let mut j = i + 2;
        if j < len && bytes[j] == b'*' {
            return Some((FshSyntaxKind::Card, j + 1));
        }
        let max_start = j;
        while j < len && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > max_start {
            return Some((FshSyntaxKind::Card, j));
        }
        // "1.." with no upper bound: not a cardinality
        return None;
    }

    // DateTime: exactly four digits then '-'
    if int_digits == 4 && i < len && bytes[i] == b'-' {
        if let Some(end) = lex_datetime_tail(input, i) {
            return Some((FshSyntaxKind::DateTime, end));
        }
    }

    // Time: exactly two digits then ':'
    if int_digits == 2 && i < len && bytes[i] == b':' {
        if let Some(end) = lex_time_component(input, digits_start) {
            return Some((FshSyntaxKind::Time, end));
        }
    }

    // Decimal part
    let mut end = i;
    if end < len && bytes[end] == b'.' && end + 1 < len && bytes[end + 1].is_ascii_digit() {
        end += 1;
        while end < len && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }

    // A trailing word character means this is not a number (e.g. a path
    // segment starting with digits)
    if let Some((next, _)) = next_char(input, end) {
        if !next.is_whitespace() && !is_word_terminator(next) && next != ':' && next != '\'' {
            return None;
        }
    }

    Some((FshSyntaxKind::Number, end))
}

/// Continue a datetime after `YYYY-`: month, optional day, optional time
fn lex_datetime_tail(input: &str, dash_index: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut i = dash_index + 1;

    let month_start = i;
    while i < len && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let month_digits = i - month_start;
    if !(1..=2).contains(&month_digits) {
        return None;
    }

    if i < len && bytes[i] == b'-' {
        i += 1;
        let day_start = i;
        while i < len && bytes[i].is_ascii_digit() {
            i += 1;
        }
        let day_digits = i - day_start;
        if !(1..=2).contains(&day_digits) {
            return None;
        }

        if i < len && bytes[i] == b'T' {
            let time_start = i + 1;
            if let Some(time_end) = lex_time_component(input, time_start) {
                return Some(time_end);
            }
            // Invalid time after 'T': keep the date part only
        }
    }

    Some(i)
}

/// Lex a time component: HH:MM:SS with optional .ffffff and timezone
fn lex_time_component(input: &str, start: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut i = start;

    for part in 0..3 {
        let part_start = i;
        while i < len && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i - part_start != 2 {
            return None;
        }
        if part < 2 {
            if i >= len || bytes[i] != b':' {
                return None;
            }
            i += 1;
        }
    }

    // Fractional seconds
    if i < len && bytes[i] == b'.' {
        i += 1;
        while i < len && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }

    // Timezone: Z, +HH:MM, or -HH:MM
    if i < len {
        match bytes[i] {
            b'Z' => i += 1,
            b'+' | b'-' => {
                let tz_start = i;
                i += 1;
                let hour_start = i;
                while i < len && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                if i - hour_start == 2 && i < len && bytes[i] == b':' {
                    i += 1;
                    let min_start = i;
                    while i < len && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                    if i - min_start != 2 {
                        return Some(tz_start);
                    }
                } else {
                    return Some(tz_start);
                }
            }
            _ => {}
        }
    }

    Some(i)
}

/// Lex a string literal (single-line or triple-quoted multiline)
fn lex_string(input: &str, start: usize) -> (FshSyntaxKind, usize, Option<LexerError>) {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut i = start + 1;

    // Triple-quoted multiline string
    if i + 1 < len && bytes[i] == b'"' && bytes[i + 1] == b'"' {
        i += 2;
        while i < len {
            if i + 2 < len && bytes[i] == b'"' && bytes[i + 1] == b'"' && bytes[i + 2] == b'"' {
                return (FshSyntaxKind::MultilineString, i + 3, None);
            }
            i += 1;
        }
        return (
            FshSyntaxKind::MultilineString,
            len,
            Some(LexerError::new(
                "Unterminated multiline string",
                span(start, len),
            )),
        );
    }

    while i < len {
        match bytes[i] {
            b'"' => return (FshSyntaxKind::String, i + 1, None),
            b'\\' => {
                i += 1;
                if i < len {
                    i += 1;
                }
            }
            b'\n' => break,
            _ => i += 1,
        }
    }

    (
        FshSyntaxKind::String,
        i.min(len),
        Some(LexerError::new("Unterminated string", span(start, i.min(len)))),
    )
}

/// Lex a UCUM unit 'unit'
fn lex_unit(input: &str, start: usize) -> (usize, Option<LexerError>) {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut i = start + 1;

    while i < len {
        match bytes[i] {
            b'\'' => return (i + 1, None),
            b'\\' => {
                i += 1;
                if i < len {
                    i += 1;
                }
            }
            b'\n' | b'\r' => {
                return (
                    i,
                    Some(LexerError::new(
                        "Unterminated unit (newline found)",
                        span(start, i),
                    )),
                );
            }
            _ => i += 1,
        }
    }

    (
        len,
        Some(LexerError::new("Unterminated unit", span(start, len))),
    )
}

/// Get next character and its UTF-8 size
fn next_char(input: &str, pos: usize) -> Option<(char, usize)> {
    input[pos..].chars().next().map(|c| (c, c.len_utf8()))
}

/// Create a span from start to end
fn span(start: usize, end: usize) -> CstSpan {
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<FshSyntaxKind> {
        let (tokens, _) = lex_with_trivia(input);
        tokens
            .iter()
            .filter(|t| !t.kind.is_trivia() && t.kind != FshSyntaxKind::Eof)
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_header_keyword_splits_colon() {
        let (tokens, errors) = lex_with_trivia("Profile: MyPatient");
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, FshSyntaxKind::ProfileKw);
        assert_eq!(tokens[1].kind, FshSyntaxKind::Colon);
        assert_eq!(tokens[2].kind, FshSyntaxKind::Whitespace);
        assert_eq!(tokens[3].kind, FshSyntaxKind::Ident);
        assert_eq!(tokens[3].text, "MyPatient");
    }

    #[test]
    fn test_url_is_single_token() {
        let (tokens, errors) = lex_with_trivia("Alias: LNC = http://loinc.org");
        assert!(errors.is_empty());
        let url = tokens
            .iter()
            .find(|t| t.text == "http://loinc.org")
            .expect("url token");
        assert_eq!(url.kind, FshSyntaxKind::Ident);
    }

    #[test]
    fn test_lossless_reconstruction() {
        let input = "Profile:  MyPatient // comment\n* name 1..1 MS";
        let (tokens, _) = lex_with_trivia(input);

        let reconstructed: String = tokens
            .iter()
            .filter(|t| t.kind != FshSyntaxKind::Eof)
            .map(|t| t.text.as_str())
            .collect();

        assert_eq!(reconstructed, input);
    }

    #[test]
    fn test_cardinality_token() {
        let (tokens, _) = lex_with_trivia("0..1 1..* 3..24");
        let cards: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == FshSyntaxKind::Card)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(cards, vec!["0..1", "1..*", "3..24"]);
    }

    #[test]
    fn test_bracketed_path_is_single_token() {
        let (tokens, _) = lex_with_trivia("* value[x] 1..1");
        let path = tokens.iter().find(|t| t.text == "value[x]").expect("path");
        assert_eq!(path.kind, FshSyntaxKind::Ident);
    }

    #[test]
    fn test_code_literal_tokenization() {
        let (tokens, errors) = lex_with_trivia("#test-code");
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, FshSyntaxKind::Code);
        assert_eq!(tokens[0].text, "#test-code");
    }

    #[test]
    fn test_code_with_system_and_display() {
        let (tokens, errors) = lex_with_trivia("http://loinc.org#1234-5 \"Display\"");
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, FshSyntaxKind::Code);
        assert_eq!(tokens[0].text, "http://loinc.org#1234-5");
        assert_eq!(tokens[2].kind, FshSyntaxKind::String);
    }

    #[test]
    fn test_quoted_code_part() {
        let (tokens, errors) = lex_with_trivia("#\"some code\"");
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, FshSyntaxKind::Code);
        assert_eq!(tokens[0].text, "#\"some code\"");
    }

    #[test]
    fn test_comma_delimited_codes() {
        let (tokens, errors) = lex_with_trivia("* #a \"first\", #b, SYS#c");
        assert!(errors.is_empty());
        let list = tokens
            .iter()
            .find(|t| t.kind == FshSyntaxKind::CommaDelimitedCodes)
            .expect("code list token");
        assert_eq!(list.text, "#a \"first\", #b, SYS#c");
    }

    #[test]
    fn test_single_code_with_display_not_a_list() {
        let (tokens, errors) = lex_with_trivia("* #a \"first\"");
        assert!(errors.is_empty());
        assert_eq!(tokens[2].kind, FshSyntaxKind::Code);
        assert!(
            !tokens
                .iter()
                .any(|t| t.kind == FshSyntaxKind::CommaDelimitedCodes)
        );
    }

    #[test]
    fn test_comma_delimited_sequences() {
        let (tokens, errors) = lex_with_trivia("* name, birthDate MS");
        assert!(errors.is_empty());
        let list = tokens
            .iter()
            .find(|t| t.kind == FshSyntaxKind::CommaDelimitedSequences)
            .expect("sequence list token");
        assert_eq!(list.text, "name, birthDate");
        assert!(tokens.iter().any(|t| t.kind == FshSyntaxKind::MsFlag));
    }

    #[test]
    fn test_reference_literal_tokenization() {
        let input = "Reference(Patient|Observation)";
        let (tokens, errors) = lex_with_trivia(input);
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, FshSyntaxKind::ReferenceLit);
        assert_eq!(tokens[0].text, input);
    }

    #[test]
    fn test_caret_sequence() {
        let (tokens, errors) = lex_with_trivia("^status.code");
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, FshSyntaxKind::CaretSequence);
        assert_eq!(tokens[0].text, "^status.code");
    }

    #[test]
    fn test_regex_literal_tokenization() {
        let input = "/^[A-Z]{2,4}$/";
        let (tokens, errors) = lex_with_trivia(input);
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, FshSyntaxKind::Regex);
        assert_eq!(tokens[0].text, input);
    }

    #[test]
    fn test_datetime_and_time() {
        assert_eq!(
            kinds("2024-01-06"),
            vec![FshSyntaxKind::DateTime]
        );
        assert_eq!(
            kinds("2024-01-06T12:30:00Z"),
            vec![FshSyntaxKind::DateTime]
        );
        assert_eq!(kinds("12:30:00"), vec![FshSyntaxKind::Time]);
    }

    #[test]
    fn test_quantity_tokens() {
        assert_eq!(
            kinds("5.4 'mg'"),
            vec![FshSyntaxKind::Number, FshSyntaxKind::Unit]
        );
    }

    #[test]
    fn test_ratio_tokens() {
        assert_eq!(
            kinds("130 'mg' : 1 'dL'"),
            vec![
                FshSyntaxKind::Number,
                FshSyntaxKind::Unit,
                FshSyntaxKind::Colon,
                FshSyntaxKind::Number,
                FshSyntaxKind::Unit,
            ]
        );
    }

    #[test]
    fn test_multiline_string() {
        let input = "\"\"\"\nline one\nline two\n\"\"\"";
        let (tokens, errors) = lex_with_trivia(input);
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, FshSyntaxKind::MultilineString);
        assert_eq!(tokens[0].text, input);
    }

    #[test]
    fn test_line_comment_not_confused_with_url() {
        let (tokens, _) = lex_with_trivia("* url = http://example.org // trailing note");
        let comment = tokens
            .iter()
            .find(|t| t.kind == FshSyntaxKind::CommentLine)
            .expect("comment token");
        assert_eq!(comment.text, "// trailing note");
        assert!(tokens.iter().any(|t| t.text == "http://example.org"));
    }

    #[test]
    fn test_block_comment() {
        let input = "Profile: P /* block\ncomment */ Parent: Patient";
        let (tokens, _) = lex_with_trivia(input);
        let block = tokens
            .iter()
            .find(|t| t.kind == FshSyntaxKind::CommentBlock)
            .expect("block comment");
        assert!(block.text.contains("block\ncomment"));
    }

    #[test]
    fn test_unterminated_string_reports_error() {
        let (_, errors) = lex_with_trivia("Title: \"oops");
        assert!(!errors.is_empty());
        assert!(errors[0].message.contains("Unterminated string"));
    }

    #[test]
    fn test_strength_keywords_and_parens() {
        assert_eq!(
            kinds("from MyVS (required)"),
            vec![
                FshSyntaxKind::FromKw,
                FshSyntaxKind::Ident,
                FshSyntaxKind::LParen,
                FshSyntaxKind::RequiredKw,
                FshSyntaxKind::RParen,
            ]
        );
    }

    #[test]
    fn test_modifier_flag() {
        assert_eq!(
            kinds("* status ?! MS"),
            vec![
                FshSyntaxKind::Asterisk,
                FshSyntaxKind::Ident,
                FshSyntaxKind::ModifierFlag,
                FshSyntaxKind::MsFlag,
            ]
        );
    }
}
