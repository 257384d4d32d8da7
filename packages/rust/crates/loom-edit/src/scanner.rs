//! Quote-aware tokenizer for directive headers.
//!
//! Tokens split on whitespace. A double-quoted section keeps its whitespace
//! and newlines; `\"` inside quotes is a literal quote and every other
//! backslash is kept as written. Adjacent quoted and bare text join into one
//! token, so `file="my dir/a.rs"` is a single token.

use crate::error::ParseError;

/// One header token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub text: String,
    /// Token began with a double quote.
    pub quoted: bool,
}

#[derive(Clone, Copy)]
enum State {
    Between,
    Bare,
    Quoted,
    Escape,
}

struct Builder {
    tokens: Vec<Token>,
    current: String,
    started: bool,
    quoted: bool,
}

impl Builder {
    fn flush(&mut self) {
        if self.started {
            self.tokens.push(Token {
                text: std::mem::take(&mut self.current),
                quoted: self.quoted,
            });
        }
        self.started = false;
        self.quoted = false;
    }
}

/// Tokenize the header starting right after the `>>LOOM_EDIT` marker.
///
/// Returns the tokens and the byte length consumed, which includes the
/// newline that ends the header (quoted newlines do not end it).
pub(crate) fn scan_header(src: &str) -> Result<(Vec<Token>, usize), ParseError> {
    let mut builder = Builder {
        tokens: Vec::new(),
        current: String::new(),
        started: false,
        quoted: false,
    };
    let mut state = State::Between;

    for (idx, ch) in src.char_indices() {
        state = match state {
            State::Between | State::Bare => match ch {
                '\n' => {
                    builder.flush();
                    return Ok((builder.tokens, idx + 1));
                }
                c if c.is_whitespace() => {
                    builder.flush();
                    State::Between
                }
                '"' => {
                    if !builder.started {
                        builder.quoted = true;
                    }
                    builder.started = true;
                    State::Quoted
                }
                c => {
                    builder.current.push(c);
                    builder.started = true;
                    State::Bare
                }
            },
            State::Quoted => match ch {
                '\\' => State::Escape,
                '"' => State::Bare,
                c => {
                    builder.current.push(c);
                    State::Quoted
                }
            },
            State::Escape => {
                if ch != '"' {
                    builder.current.push('\\');
                }
                builder.current.push(ch);
                State::Quoted
            }
        };
    }

    if matches!(state, State::Quoted | State::Escape) {
        return Err(ParseError::UnterminatedQuote);
    }
    builder.flush();
    Ok((builder.tokens, src.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(src: &str) -> Vec<String> {
        scan_header(src)
            .unwrap()
            .0
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_bare_tokens_stop_at_newline() {
        let (tokens, consumed) = scan_header(" file=a.rs REPLACE 1-2\nbody").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(consumed, " file=a.rs REPLACE 1-2\n".len());
    }

    #[test]
    fn test_quoted_value_keeps_spaces() {
        assert_eq!(
            texts(r#" file="my dir/a.rs" CREATE"#),
            vec!["file=my dir/a.rs", "CREATE"]
        );
    }

    #[test]
    fn test_quoted_string_spans_lines() {
        let src = " SEARCH_REPLACE \"a\nb\" \"c\"\nrest";
        let (tokens, consumed) = scan_header(src).unwrap();
        assert_eq!(tokens[1].text, "a\nb");
        assert!(tokens[1].quoted);
        assert_eq!(&src[consumed..], "rest");
    }

    #[test]
    fn test_escapes() {
        assert_eq!(texts(r#" "say \"hi\"" "a\nb""#), vec![r#"say "hi""#, r"a\nb"]);
    }

    #[test]
    fn test_empty_quoted_token() {
        let (tokens, _) = scan_header(r#" "x" """#).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].text, "");
        assert!(tokens[1].quoted);
    }

    #[test]
    fn test_unterminated_quote() {
        assert_eq!(
            scan_header(" \"open\n<<LOOM_EDIT").unwrap_err(),
            ParseError::UnterminatedQuote
        );
    }
}
