//! Markup tokenizer.
//!
//! Splits LaTeX-like markup into commands, grouping braces, script markers
//! and plain characters. Spaces following a control word are swallowed, as
//! in TeX; `%` starts a comment running to the end of the line.

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `\name` or a control symbol such as `\,`; stored without the backslash
    Command(String),
    Char(char),
    BeginGroup,
    EndGroup,
    Superscript,
    Subscript,
    Ampersand,
    /// `$`
    MathShift,
    /// `~`
    Tilde,
    /// `#1` .. `#9`
    Parameter(u8),
    /// `#?`
    Placeholder,
    /// `#@`
    SelectionMarker,
    /// A run of whitespace
    Space,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    /// Byte offset of the token start in the source
    pub start: usize,
    pub end: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let token = match c {
            '\\' => {
                let Some(&(_, first)) = chars.peek() else {
                    return Err(ParseError::Syntax {
                        message: "dangling backslash".into(),
                        fragment: "\\".into(),
                        position: start,
                    });
                };
                chars.next();
                if first.is_ascii_alphabetic() {
                    let mut name = String::from(first);
                    while let Some(&(_, next)) = chars.peek() {
                        if !next.is_ascii_alphabetic() {
                            break;
                        }
                        name.push(next);
                        chars.next();
                    }
                    while chars.peek().is_some_and(|(_, next)| next.is_whitespace()) {
                        chars.next();
                    }
                    Token::Command(name)
                } else {
                    Token::Command(first.to_string())
                }
            }
            '{' => Token::BeginGroup,
            '}' => Token::EndGroup,
            '^' => Token::Superscript,
            '_' => Token::Subscript,
            '&' => Token::Ampersand,
            '$' => Token::MathShift,
            '~' => Token::Tilde,
            '%' => {
                while chars.peek().is_some_and(|(_, next)| *next != '\n') {
                    chars.next();
                }
                continue;
            }
            '#' => match chars.next() {
                Some((_, '?')) => Token::Placeholder,
                Some((_, '@')) => Token::SelectionMarker,
                Some((_, d)) if ('1'..='9').contains(&d) => Token::Parameter(d as u8 - b'0'),
                _ => {
                    return Err(ParseError::Syntax {
                        message: "'#' must be followed by a digit, '?' or '@'".into(),
                        fragment: "#".into(),
                        position: start,
                    })
                }
            },
            c if c.is_whitespace() => {
                while chars.peek().is_some_and(|(_, next)| next.is_whitespace()) {
                    chars.next();
                }
                Token::Space
            }
            c => Token::Char(c),
        };
        let end = chars.peek().map(|(i, _)| *i).unwrap_or(source.len());
        tokens.push(Spanned { token, start, end });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_commands_swallow_trailing_space() {
        assert_eq!(
            kinds("\\alpha x"),
            vec![Token::Command("alpha".into()), Token::Char('x')]
        );
    }

    #[test]
    fn test_control_symbols() {
        assert_eq!(
            kinds("\\,\\{"),
            vec![Token::Command(",".into()), Token::Command("{".into())]
        );
    }

    #[test]
    fn test_digits_end_command_names() {
        assert_eq!(
            kinds("\\frac12"),
            vec![
                Token::Command("frac".into()),
                Token::Char('1'),
                Token::Char('2')
            ]
        );
    }

    #[test]
    fn test_hash_forms() {
        assert_eq!(
            kinds("#1#?#@"),
            vec![
                Token::Parameter(1),
                Token::Placeholder,
                Token::SelectionMarker
            ]
        );
        assert!(tokenize("#x").is_err());
    }

    #[test]
    fn test_comments_and_spaces() {
        assert_eq!(
            kinds("a  b% note\nc"),
            vec![
                Token::Char('a'),
                Token::Space,
                Token::Char('b'),
                Token::Space,
                Token::Char('c')
            ]
        );
    }

    #[test]
    fn test_spans_are_byte_offsets() {
        let tokens = tokenize("x^{2}").unwrap();
        assert_eq!(tokens[1].start, 1);
        assert_eq!(tokens[2].start, 2);
        assert_eq!(tokens.last().unwrap().end, 5);
    }

    #[test]
    fn test_dangling_backslash() {
        let err = tokenize("x\\").unwrap_err();
        assert_eq!(err.position(), 1);
    }
}
