//! Tokenizer for the query language. Line-oriented: statements end at a
//! newline, `#` starts a comment, and every token remembers its line for
//! error messages.

use super::ExecError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    True,
    False,
    Not,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Amp,
    Pipe,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Assign,
    Dot,
    Newline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
}

pub fn lex(src: &str) -> Result<Vec<Spanned>, ExecError> {
    let mut out = Vec::new();
    for (idx, raw_line) in src.lines().enumerate() {
        let line_no = idx + 1;
        let line = match raw_line.find('#') {
            // A '#' inside a string literal is rare enough in generated
            // queries that the simple cut is acceptable.
            Some(pos) => &raw_line[..pos],
            None => raw_line,
        };
        lex_line(line, line_no, &mut out)?;
        if out.last().map(|s| s.token != Token::Newline).unwrap_or(false) {
            out.push(Spanned { token: Token::Newline, line: line_no });
        }
    }
    Ok(out)
}

fn lex_line(line: &str, line_no: usize, out: &mut Vec<Spanned>) -> Result<(), ExecError> {
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        let token = match c {
            ' ' | '\t' | '\r' => {
                chars.next();
                continue;
            }
            '(' => one(&mut chars, Token::LParen),
            ')' => one(&mut chars, Token::RParen),
            '[' => one(&mut chars, Token::LBracket),
            ']' => one(&mut chars, Token::RBracket),
            ',' => one(&mut chars, Token::Comma),
            '.' => one(&mut chars, Token::Dot),
            '+' => one(&mut chars, Token::Plus),
            '-' => one(&mut chars, Token::Minus),
            '*' => one(&mut chars, Token::Star),
            '/' => one(&mut chars, Token::Slash),
            '&' => one(&mut chars, Token::Amp),
            '|' => one(&mut chars, Token::Pipe),
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    Token::Eq
                } else {
                    Token::Assign
                }
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    Token::Ne
                } else {
                    return Err(ExecError::syntax(line_no, "unexpected '!'"));
                }
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    Token::Le
                } else {
                    Token::Lt
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '\'' | '"' => lex_string(&mut chars, line_no)?,
            c if c.is_ascii_digit() => lex_number(&mut chars, line_no)?,
            c if c.is_alphabetic() || c == '_' => lex_word(&mut chars),
            other => {
                return Err(ExecError::syntax(
                    line_no,
                    format!("unexpected character '{}'", other),
                ))
            }
        };
        out.push(Spanned { token, line: line_no });
    }
    Ok(())
}

fn one(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, token: Token) -> Token {
    chars.next();
    token
}

fn lex_string(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    line_no: usize,
) -> Result<Token, ExecError> {
    let quote = chars.next().unwrap_or('\'');
    let mut text = String::new();
    for c in chars.by_ref() {
        if c == quote {
            return Ok(Token::Str(text));
        }
        text.push(c);
    }
    Err(ExecError::syntax(line_no, "unterminated string literal"))
}

fn lex_number(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    line_no: usize,
) -> Result<Token, ExecError> {
    let mut text = String::new();
    let mut saw_dot = false;
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            text.push(c);
            chars.next();
        } else if c == '.' && !saw_dot {
            saw_dot = true;
            text.push(c);
            chars.next();
        } else {
            break;
        }
    }
    if saw_dot {
        text.parse::<f64>()
            .map(Token::Float)
            .map_err(|_| ExecError::syntax(line_no, format!("bad number '{}'", text)))
    } else {
        text.parse::<i64>()
            .map(Token::Int)
            .map_err(|_| ExecError::syntax(line_no, format!("bad number '{}'", text)))
    }
}

fn lex_word(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Token {
    let mut word = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_alphanumeric() || c == '_' {
            word.push(c);
            chars.next();
        } else {
            break;
        }
    }
    match word.as_str() {
        "True" => Token::True,
        "False" => Token::False,
        "not" => Token::Not,
        // Keyword aliases for the mask operators the model sometimes emits.
        "and" => Token::Amp,
        "or" => Token::Pipe,
        _ => Token::Ident(word),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        lex(src).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn lexes_the_canonical_filter_line() {
        assert_eq!(
            tokens("ANSWER = table[table['age'] > 30]"),
            vec![
                Token::Ident("ANSWER".into()),
                Token::Assign,
                Token::Ident("table".into()),
                Token::LBracket,
                Token::Ident("table".into()),
                Token::LBracket,
                Token::Str("age".into()),
                Token::RBracket,
                Token::Gt,
                Token::Int(30),
                Token::RBracket,
                Token::Newline,
            ]
        );
    }

    #[test]
    fn comments_and_blank_lines_produce_nothing() {
        assert_eq!(tokens("# just a comment\n\n"), Vec::<Token>::new());
    }

    #[test]
    fn errors_carry_the_line_number() {
        let err = lex("x = 1\ny = $").unwrap_err();
        assert_eq!(
            err,
            ExecError::Syntax { line: 2, message: "unexpected character '$'".into() }
        );
    }

    #[test]
    fn numbers_split_on_a_second_dot() {
        assert_eq!(tokens("1.5"), vec![Token::Float(1.5), Token::Newline]);
        assert_eq!(tokens("7"), vec![Token::Int(7), Token::Newline]);
    }

    #[test]
    fn unterminated_string_is_rejected() {
        assert!(matches!(lex("x = 'oops"), Err(ExecError::Syntax { .. })));
    }
}
