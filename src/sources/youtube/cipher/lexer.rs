//! Just enough JavaScript scanning to find where a function body ends.

/// Returns the text after `start_marker` up to and including the brace that
/// closes the first `{` following it. String, template and regex literals and
/// comments are skipped so braces inside them do not count.
pub fn match_to_closing_brace<'a>(code: &'a str, start_marker: &str) -> Option<&'a str> {
    let begin = code.find(start_marker)? + start_marker.len();
    let bytes = code.as_bytes();
    let open = begin + code[begin..].find('{')?;

    let mut depth = 0usize;
    let mut i = open;
    let mut last_significant = b'{';

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'{' => {
                depth += 1;
                last_significant = c;
            }
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&code[begin..=i]);
                }
                last_significant = c;
            }
            b'"' | b'\'' | b'`' => {
                i = skip_quoted(bytes, i, c)?;
                last_significant = c;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = code[i..].find('\n').map(|n| i + n).unwrap_or(bytes.len());
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = code[i + 2..].find("*/").map(|n| i + 2 + n + 1)?;
            }
            b'/' if starts_regex(last_significant) => {
                i = skip_regex(bytes, i)?;
                last_significant = b'/';
            }
            c if c.is_ascii_whitespace() => {}
            _ => last_significant = c,
        }
        i += 1;
    }
    None
}

/// A slash starts a regex literal when it cannot be a division operator.
fn starts_regex(previous: u8) -> bool {
    matches!(
        previous,
        b'(' | b',' | b'=' | b':' | b'[' | b'!' | b'&' | b'|' | b'?' | b'{' | b'}' | b';' | b'+'
            | b'-' | b'*' | b'%' | b'<' | b'>' | b'~' | b'^'
    )
}

/// Returns the index of the closing quote.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            c if c == quote => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Returns the index of the slash closing a regex literal.
fn skip_regex(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    let mut in_class = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'[' => in_class = true,
            b']' => in_class = false,
            b'/' if !in_class => return Some(i),
            b'\n' => return None,
            _ => {}
        }
        i += 1;
    }
    None
}
