//! Length-preserving comment and string masking

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    LineComment,
    BlockComment,
    String,
    QuotedIdent(char),
}

/// Replace comments and the contents of single-quoted strings with spaces.
///
/// The quotes themselves are kept so later passes still see where a literal
/// sits. Newlines are never masked, and every masked character becomes as
/// many spaces as it has bytes, so the output has exactly the byte length of
/// the input.
pub fn sanitize(text: &str) -> String {
    mask(text, true)
}

/// Like [`sanitize`] but leaves string contents intact.
pub fn mask_comments(text: &str) -> String {
    mask(text, false)
}

fn mask(text: &str, mask_strings: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut mode = Mode::Code;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match mode {
            Mode::Code => match ch {
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    out.push_str("  ");
                    mode = Mode::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    out.push_str("  ");
                    mode = Mode::BlockComment;
                }
                '\'' => {
                    out.push(ch);
                    mode = Mode::String;
                }
                '"' | '`' => {
                    out.push(ch);
                    mode = Mode::QuotedIdent(ch);
                }
                _ => out.push(ch),
            },
            Mode::LineComment => {
                if ch == '\n' {
                    out.push(ch);
                    mode = Mode::Code;
                } else {
                    blank(&mut out, ch);
                }
            }
            Mode::BlockComment => {
                if ch == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    mode = Mode::Code;
                } else {
                    blank(&mut out, ch);
                }
            }
            Mode::String => {
                if ch == '\'' {
                    out.push(ch);
                    mode = Mode::Code;
                } else if mask_strings {
                    blank(&mut out, ch);
                } else {
                    out.push(ch);
                }
            }
            Mode::QuotedIdent(close) => {
                out.push(ch);
                if ch == close {
                    mode = Mode::Code;
                }
            }
        }
    }

    out
}

fn blank(out: &mut String, ch: char) {
    if ch == '\n' || ch == '\r' {
        out.push(ch);
    } else {
        out.extend(std::iter::repeat(' ').take(ch.len_utf8()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks_line_and_block_comments() {
        let text = "SELECT a -- note\nFROM /* x\ny */ t";
        let clean = sanitize(text);
        assert_eq!(clean.len(), text.len());
        assert_eq!(clean, "SELECT a        \nFROM     \n     t");
    }

    #[test]
    fn test_masks_string_contents_only() {
        let text = "WHERE x = 'a -- b' AND y = '('";
        let clean = sanitize(text);
        assert_eq!(clean, "WHERE x = '      ' AND y = ' '");
        assert_eq!(mask_comments(text), text);
    }

    #[test]
    fn test_unterminated_constructs() {
        assert_eq!(sanitize("a -- b"), "a     ");
        assert_eq!(sanitize("a /* b\nc"), "a     \n ");
        assert_eq!(sanitize("a 'bc"), "a '  ");
    }

    #[test]
    fn test_length_preserved_for_multibyte_text() {
        let samples = [
            "SELECT 'héllo wörld' -- ünïcode ✓\nFROM t",
            "/* 日本語 */ SELECT 1",
            "'' '' ''' -- '",
            "\"col -- not a comment\" -- but this is",
        ];
        for text in samples {
            let clean = sanitize(text);
            assert_eq!(clean.len(), text.len(), "length changed for {text:?}");
            assert_eq!(
                clean.matches('\n').count(),
                text.matches('\n').count(),
                "newlines changed for {text:?}"
            );
        }
    }

    #[test]
    fn test_quoted_identifier_is_untouched() {
        let text = "SELECT \"it's\" FROM t";
        assert_eq!(sanitize(text), text);
    }
}
