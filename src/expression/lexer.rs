//! Tokenizer for the Python-flavoured expression syntax used in recipes.
//!
//! The lexer recognizes more than the evaluator allows (attribute dots, `**`, bitwise
//! operators, assignment, reserved words) so the parser can report exactly which construct was
//! rejected instead of failing with a generic syntax error.

use std::fmt;

use super::error::{ExprError, ExprResult};

/// Words that are never valid in an expression.
const RESERVED: &[&str] = &[
    "lambda", "import", "from", "for", "if", "else", "elif", "while", "def", "class", "return",
    "yield", "await", "async", "is", "del", "global", "nonlocal", "with", "as", "assert", "pass",
    "raise", "try", "except", "finally", "break", "continue",
];

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    /// `` `column name` ``
    QuotedIdent(String),
    Int(i64),
    Float(f64),
    Str(String),
    And,
    Or,
    Not,
    In,
    True,
    False,
    None,
    Reserved(String),
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Assign,
    Walrus,
    Dot,
    Comma,
    Colon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Ident(s) => return f.write_str(s),
            TokenKind::QuotedIdent(s) => return write!(f, "`{s}`"),
            TokenKind::Int(v) => return write!(f, "{v}"),
            TokenKind::Float(v) => return write!(f, "{v}"),
            TokenKind::Str(s) => return write!(f, "'{s}'"),
            TokenKind::Reserved(s) => return f.write_str(s),
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Not => "not",
            TokenKind::In => "in",
            TokenKind::True => "True",
            TokenKind::False => "False",
            TokenKind::None => "None",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::DoubleStar => "**",
            TokenKind::Slash => "/",
            TokenKind::DoubleSlash => "//",
            TokenKind::Percent => "%",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::LtEq => "<=",
            TokenKind::Gt => ">",
            TokenKind::GtEq => ">=",
            TokenKind::Assign => "=",
            TokenKind::Walrus => ":=",
            TokenKind::Dot => ".",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Tilde => "~",
            TokenKind::Shl => "<<",
            TokenKind::Shr => ">>",
            TokenKind::Eof => "end of input",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub pos: usize,
}

/// Split `src` into tokens, ending with [`TokenKind::Eof`].
pub(crate) fn tokenize(src: &str) -> ExprResult<Vec<Token>> {
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        let next = chars.get(i + 1).map(|&(_, c)| c);

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) {
            let (kind, end) = lex_number(src, &chars, i)?;
            tokens.push(Token { kind, pos });
            i = end;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let mut end = i;
            while end < chars.len() && (chars[end].1.is_alphanumeric() || chars[end].1 == '_') {
                end += 1;
            }
            let word = slice(src, &chars, i, end);
            tokens.push(Token {
                kind: keyword_or_ident(word),
                pos,
            });
            i = end;
            continue;
        }

        if c == '\'' || c == '"' {
            let (value, end) = lex_string(&chars, i)?;
            tokens.push(Token {
                kind: TokenKind::Str(value),
                pos,
            });
            i = end;
            continue;
        }

        if c == '`' {
            let close = chars[i + 1..]
                .iter()
                .position(|&(_, ch)| ch == '`')
                .map(|off| i + 1 + off)
                .ok_or_else(|| ExprError::parse(format!("unterminated `quoted` name at offset {pos}")))?;
            let name = slice(src, &chars, i + 1, close);
            if name.is_empty() {
                return Err(ExprError::parse(format!("empty `quoted` name at offset {pos}")));
            }
            tokens.push(Token {
                kind: TokenKind::QuotedIdent(name.to_string()),
                pos,
            });
            i = close + 1;
            continue;
        }

        let two = next.map(|n| (c, n));
        let (kind, width) = match two {
            Some(('*', '*')) => (TokenKind::DoubleStar, 2),
            Some(('/', '/')) => (TokenKind::DoubleSlash, 2),
            Some(('=', '=')) => (TokenKind::EqEq, 2),
            Some(('!', '=')) => (TokenKind::NotEq, 2),
            Some(('<', '=')) => (TokenKind::LtEq, 2),
            Some(('>', '=')) => (TokenKind::GtEq, 2),
            Some(('<', '<')) => (TokenKind::Shl, 2),
            Some(('>', '>')) => (TokenKind::Shr, 2),
            Some((':', '=')) => (TokenKind::Walrus, 2),
            _ => {
                let kind = match c {
                    '+' => TokenKind::Plus,
                    '-' => TokenKind::Minus,
                    '*' => TokenKind::Star,
                    '/' => TokenKind::Slash,
                    '%' => TokenKind::Percent,
                    '<' => TokenKind::Lt,
                    '>' => TokenKind::Gt,
                    '=' => TokenKind::Assign,
                    '.' => TokenKind::Dot,
                    ',' => TokenKind::Comma,
                    ':' => TokenKind::Colon,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    '[' => TokenKind::LBracket,
                    ']' => TokenKind::RBracket,
                    '{' => TokenKind::LBrace,
                    '}' => TokenKind::RBrace,
                    '&' => TokenKind::Amp,
                    '|' => TokenKind::Pipe,
                    '^' => TokenKind::Caret,
                    '~' => TokenKind::Tilde,
                    other => {
                        return Err(ExprError::parse(format!(
                            "unexpected character '{other}' at offset {pos}"
                        )));
                    }
                };
                (kind, 1)
            }
        };
        tokens.push(Token { kind, pos });
        i += width;
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        pos: src.len(),
    });
    Ok(tokens)
}

fn keyword_or_ident(word: &str) -> TokenKind {
    match word {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "in" => TokenKind::In,
        "True" => TokenKind::True,
        "False" => TokenKind::False,
        "None" => TokenKind::None,
        w if RESERVED.contains(&w) => TokenKind::Reserved(w.to_string()),
        w => TokenKind::Ident(w.to_string()),
    }
}

fn slice<'a>(src: &'a str, chars: &[(usize, char)], start: usize, end: usize) -> &'a str {
    let from = chars.get(start).map(|&(p, _)| p).unwrap_or(src.len());
    let to = chars.get(end).map(|&(p, _)| p).unwrap_or(src.len());
    &src[from..to]
}

fn lex_number(src: &str, chars: &[(usize, char)], start: usize) -> ExprResult<(TokenKind, usize)> {
    let pos = chars[start].0;
    let mut end = start;
    let mut is_float = false;
    let digits = |end: &mut usize| {
        while *end < chars.len() && (chars[*end].1.is_ascii_digit() || chars[*end].1 == '_') {
            *end += 1;
        }
    };

    digits(&mut end);
    if end < chars.len() && chars[end].1 == '.' {
        is_float = true;
        end += 1;
        digits(&mut end);
    }
    if end < chars.len() && matches!(chars[end].1, 'e' | 'E') {
        let mut exp = end + 1;
        if exp < chars.len() && matches!(chars[exp].1, '+' | '-') {
            exp += 1;
        }
        if exp < chars.len() && chars[exp].1.is_ascii_digit() {
            is_float = true;
            end = exp;
            digits(&mut end);
        }
    }

    let text: String = slice(src, chars, start, end)
        .chars()
        .filter(|&c| c != '_')
        .collect();
    let kind = if is_float {
        text.parse::<f64>()
            .map(TokenKind::Float)
            .map_err(|e| ExprError::parse(format!("invalid number '{text}' at offset {pos}: {e}")))?
    } else {
        text.parse::<i64>()
            .map(TokenKind::Int)
            .map_err(|e| ExprError::parse(format!("invalid integer '{text}' at offset {pos}: {e}")))?
    };
    Ok((kind, end))
}

fn lex_string(chars: &[(usize, char)], start: usize) -> ExprResult<(String, usize)> {
    let (pos, quote) = chars[start];
    let mut out = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i].1;
        if c == quote {
            return Ok((out, i + 1));
        }
        if c == '\\' {
            let escaped = chars
                .get(i + 1)
                .map(|&(_, e)| e)
                .ok_or_else(|| ExprError::parse(format!("unterminated string at offset {pos}")))?;
            out.push(match escaped {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                '0' => '\0',
                other => other,
            });
            i += 2;
            continue;
        }
        out.push(c);
        i += 1;
    }
    Err(ExprError::parse(format!("unterminated string at offset {pos}")))
}

#[cfg(test)]
mod tests {
    use super::{tokenize, TokenKind};

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenizes_membership_filter() {
        assert_eq!(
            kinds("region in ['APAC', \"EMEA\"] and revenue >= 0"),
            vec![
                TokenKind::Ident("region".into()),
                TokenKind::In,
                TokenKind::LBracket,
                TokenKind::Str("APAC".into()),
                TokenKind::Comma,
                TokenKind::Str("EMEA".into()),
                TokenKind::RBracket,
                TokenKind::And,
                TokenKind::Ident("revenue".into()),
                TokenKind::GtEq,
                TokenKind::Int(0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn numbers_and_operators() {
        assert_eq!(
            kinds("1_000 // .5 ** 2e3 % 7"),
            vec![
                TokenKind::Int(1000),
                TokenKind::DoubleSlash,
                TokenKind::Float(0.5),
                TokenKind::DoubleStar,
                TokenKind::Float(2000.0),
                TokenKind::Percent,
                TokenKind::Int(7),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn reserved_words_and_quoted_names() {
        assert_eq!(
            kinds("lambda `unit price`"),
            vec![
                TokenKind::Reserved("lambda".into()),
                TokenKind::QuotedIdent("unit price".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "a\nb""#),
            vec![
                TokenKind::Str("it's".into()),
                TokenKind::Str("a\nb".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn rejects_unknown_characters_and_open_strings() {
        assert!(tokenize("a @ b").is_err());
        assert!(tokenize("'open").is_err());
        assert!(tokenize("99999999999999999999").is_err());
    }
}
