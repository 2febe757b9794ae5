// ABOUTME: Hand-written lexer converting source text into a token stream

use crate::error::DusoError;
use crate::token::{keyword_kind, Position, Token, TokenKind};

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    file: String,
}

impl Lexer {
    pub fn new(source: &str, file: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            file: file.to_string(),
        }
    }

    /// Consume the whole source and return the token stream, terminated by Eof.
    pub fn tokenize(mut self) -> Result<Vec<Token>, DusoError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn error(&self, message: impl Into<String>, pos: Position) -> DusoError {
        DusoError::new(message, &self.file, pos)
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn next_token(&mut self) -> Result<Token, DusoError> {
        self.skip_whitespace_and_comments()?;

        let pos = self.position();
        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::new(TokenKind::Eof, "", pos)),
        };

        if c.is_ascii_alphabetic() || c == '_' {
            return Ok(self.lex_identifier(pos));
        }
        if c.is_ascii_digit() {
            return self.lex_number(pos);
        }
        // A leading dot followed by a digit is a number (.5 reads as 0.5)
        if c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) {
            return self.lex_number(pos);
        }
        if c == '"' || c == '\'' {
            return self.lex_string(c, pos);
        }
        if c == '~' {
            return self.lex_raw_string(pos);
        }

        self.advance();
        let kind = match c {
            '+' => self.two_char_op('=', TokenKind::PlusEq, '+', TokenKind::PlusPlus, TokenKind::Plus),
            '-' => self.two_char_op('=', TokenKind::MinusEq, '-', TokenKind::MinusMinus, TokenKind::Minus),
            '*' => self.one_char_op('=', TokenKind::StarEq, TokenKind::Star),
            '/' => self.one_char_op('=', TokenKind::SlashEq, TokenKind::Slash),
            '%' => self.one_char_op('=', TokenKind::PercentEq, TokenKind::Percent),
            '=' => self.one_char_op('=', TokenKind::EqEq, TokenKind::Eq),
            '!' => self.one_char_op('=', TokenKind::NotEq, TokenKind::Not),
            '<' => self.one_char_op('=', TokenKind::LtEq, TokenKind::Lt),
            '>' => self.one_char_op('=', TokenKind::GtEq, TokenKind::Gt),
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            ':' => TokenKind::Colon,
            '?' => TokenKind::Question,
            _ => return Err(self.error(format!("unexpected character '{}'", c), pos)),
        };
        let mut lexeme = kind_text(&kind);
        if lexeme.is_empty() {
            lexeme = c.to_string();
        }
        Ok(Token::new(kind, lexeme, pos))
    }

    /// Pick a two-character operator when the next char matches, else the base.
    fn one_char_op(&mut self, next: char, matched: TokenKind, base: TokenKind) -> TokenKind {
        if self.peek() == Some(next) {
            self.advance();
            matched
        } else {
            base
        }
    }

    /// Like one_char_op but with two possible continuations (`+=` and `++`).
    fn two_char_op(
        &mut self,
        eq: char,
        eq_kind: TokenKind,
        dup: char,
        dup_kind: TokenKind,
        base: TokenKind,
    ) -> TokenKind {
        if self.peek() == Some(eq) {
            self.advance();
            eq_kind
        } else if self.peek() == Some(dup) {
            self.advance();
            dup_kind
        } else {
            base
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), DusoError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let start = self.position();
                    self.advance();
                    self.advance();
                    // Block comments nest: /* a /* b */ c */ is one comment
                    let mut depth = 1usize;
                    loop {
                        match self.peek() {
                            None => {
                                return Err(self.error("unterminated block comment", start));
                            }
                            Some('/') if self.peek_at(1) == Some('*') => {
                                self.advance();
                                self.advance();
                                depth += 1;
                            }
                            Some('*') if self.peek_at(1) == Some('/') => {
                                self.advance();
                                self.advance();
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            }
                            Some(_) => {
                                self.advance();
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn lex_identifier(&mut self, pos: Position) -> Token {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        match keyword_kind(&text) {
            Some(kind) => Token::new(kind, text, pos),
            None => Token::new(TokenKind::Ident(text.clone()), text, pos),
        }
    }

    fn lex_number(&mut self, pos: Position) -> Result<Token, DusoError> {
        let mut text = String::new();
        if self.peek() == Some('.') {
            text.push('0');
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.advance();
            } else if c == '.'
                && !text.contains('.')
                && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())
            {
                // Only eat the dot when a digit follows, so `a[0].x` still lexes
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let value: f64 = text
            .parse()
            .map_err(|_| self.error(format!("invalid number literal '{}'", text), pos))?;
        Ok(Token::new(TokenKind::Number(value), text, pos))
    }

    fn lex_string(&mut self, quote: char, pos: Position) -> Result<Token, DusoError> {
        if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
            return self.lex_triple_string(quote, pos);
        }
        self.advance(); // opening quote
        let mut content = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string", pos)),
                Some('\n') => return Err(self.error("unterminated string", pos)),
                Some('\\') => {
                    // Keep escapes raw; the parser processes them after
                    // template detection
                    content.push('\\');
                    self.advance();
                    match self.advance() {
                        Some(c) => content.push(c),
                        None => return Err(self.error("unterminated string", pos)),
                    }
                }
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(Token::new(
                        TokenKind::Str(content.clone()),
                        content,
                        pos,
                    ));
                }
                Some(c) => {
                    content.push(c);
                    self.advance();
                }
            }
        }
    }

    fn lex_triple_string(&mut self, quote: char, pos: Position) -> Result<Token, DusoError> {
        for _ in 0..3 {
            self.advance();
        }
        let mut content = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string", pos)),
                Some('\\') => {
                    content.push('\\');
                    self.advance();
                    match self.advance() {
                        Some(c) => content.push(c),
                        None => return Err(self.error("unterminated string", pos)),
                    }
                }
                Some(c) if c == quote
                    && self.peek_at(1) == Some(quote)
                    && self.peek_at(2) == Some(quote) =>
                {
                    for _ in 0..3 {
                        self.advance();
                    }
                    let dedented = dedent(&content);
                    return Ok(Token::new(
                        TokenKind::TripleStr(dedented.clone()),
                        dedented,
                        pos,
                    ));
                }
                Some(c) => {
                    content.push(c);
                    self.advance();
                }
            }
        }
    }

    fn lex_raw_string(&mut self, pos: Position) -> Result<Token, DusoError> {
        self.advance(); // opening ~
        let mut content = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated raw string", pos)),
                Some('\\') if self.peek_at(1) == Some('~') => {
                    self.advance();
                    self.advance();
                    content.push('~');
                }
                Some('~') => {
                    self.advance();
                    return Ok(Token::new(
                        TokenKind::RawStr(content.clone()),
                        content,
                        pos,
                    ));
                }
                Some(c) => {
                    content.push(c);
                    self.advance();
                }
            }
        }
    }
}

fn kind_text(kind: &TokenKind) -> String {
    let text = match kind {
        TokenKind::Plus => "+",
        TokenKind::Minus => "-",
        TokenKind::Star => "*",
        TokenKind::Slash => "/",
        TokenKind::Percent => "%",
        TokenKind::EqEq => "==",
        TokenKind::NotEq => "!=",
        TokenKind::Lt => "<",
        TokenKind::LtEq => "<=",
        TokenKind::Gt => ">",
        TokenKind::GtEq => ">=",
        TokenKind::Eq => "=",
        TokenKind::PlusEq => "+=",
        TokenKind::MinusEq => "-=",
        TokenKind::StarEq => "*=",
        TokenKind::SlashEq => "/=",
        TokenKind::PercentEq => "%=",
        TokenKind::PlusPlus => "++",
        TokenKind::MinusMinus => "--",
        TokenKind::Not => "!",
        TokenKind::LParen => "(",
        TokenKind::RParen => ")",
        TokenKind::LBracket => "[",
        TokenKind::RBracket => "]",
        TokenKind::LBrace => "{",
        TokenKind::RBrace => "}",
        TokenKind::Comma => ",",
        TokenKind::Dot => ".",
        TokenKind::Colon => ":",
        TokenKind::Question => "?",
        _ => "",
    };
    text.to_string()
}

/// Strip the common leading whitespace of a triple-quoted string body and
/// trim the blank first/last lines left by the delimiters.
fn dedent(content: &str) -> String {
    let mut lines: Vec<&str> = content.split('\n').collect();
    if lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
    if lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    if lines.is_empty() {
        return String::new();
    }

    // Common prefix is matched character-by-character across non-blank lines
    let mut prefix: Option<Vec<char>> = None;
    for line in &lines {
        if line.trim().is_empty() {
            continue;
        }
        let leading: Vec<char> = line
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect();
        prefix = Some(match prefix {
            None => leading,
            Some(current) => current
                .iter()
                .zip(leading.iter())
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| *a)
                .collect(),
        });
    }
    let prefix: String = prefix.unwrap_or_default().into_iter().collect();

    let stripped: Vec<String> = lines
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                line.strip_prefix(&prefix).unwrap_or(line).to_string()
            }
        })
        .collect();
    stripped.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        Lexer::new(source, "test").tokenize().unwrap()
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lex_keywords_and_identifiers() {
        let tokens = kinds("if foo then bar end");
        assert_eq!(
            tokens,
            vec![
                TokenKind::If,
                TokenKind::Ident("foo".to_string()),
                TokenKind::Then,
                TokenKind::Ident("bar".to_string()),
                TokenKind::End,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_numbers() {
        assert_eq!(kinds("42")[0], TokenKind::Number(42.0));
        assert_eq!(kinds("3.25")[0], TokenKind::Number(3.25));
        assert_eq!(kinds(".5")[0], TokenKind::Number(0.5));
    }

    #[test]
    fn test_number_does_not_eat_property_dot() {
        let tokens = kinds("1.foo");
        assert_eq!(tokens[0], TokenKind::Number(1.0));
        assert_eq!(tokens[1], TokenKind::Dot);
        assert_eq!(tokens[2], TokenKind::Ident("foo".to_string()));
    }

    #[test]
    fn test_lex_operators() {
        let tokens = kinds("+ += ++ - -= -- == != = < <= > >= * *= / /= % %= !");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Plus,
                TokenKind::PlusEq,
                TokenKind::PlusPlus,
                TokenKind::Minus,
                TokenKind::MinusEq,
                TokenKind::MinusMinus,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::Eq,
                TokenKind::Lt,
                TokenKind::LtEq,
                TokenKind::Gt,
                TokenKind::GtEq,
                TokenKind::Star,
                TokenKind::StarEq,
                TokenKind::Slash,
                TokenKind::SlashEq,
                TokenKind::Percent,
                TokenKind::PercentEq,
                TokenKind::Not,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_line_and_column_tracking() {
        let tokens = lex("x = 1\n  y = 2");
        assert_eq!(tokens[0].pos, Position::new(1, 1));
        assert_eq!(tokens[1].pos, Position::new(1, 3));
        assert_eq!(tokens[2].pos, Position::new(1, 5));
        assert_eq!(tokens[3].pos, Position::new(2, 3));
    }

    #[test]
    fn test_line_comment() {
        let tokens = kinds("x // the rest is ignored\ny");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Ident("x".to_string()),
                TokenKind::Ident("y".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_nested_block_comment() {
        let tokens = kinds("a /* outer /* inner */ still outer */ b");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Ident("b".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_block_comment_errors() {
        let result = Lexer::new("/* never closed", "test").tokenize();
        assert!(result.is_err());
        assert!(result.unwrap_err().message.contains("unterminated block comment"));
    }

    #[test]
    fn test_lex_strings_keep_escapes_raw() {
        let tokens = lex(r#""a\nb""#);
        assert_eq!(tokens[0].kind, TokenKind::Str("a\\nb".to_string()));
    }

    #[test]
    fn test_single_quoted_string() {
        let tokens = lex("'hello'");
        assert_eq!(tokens[0].kind, TokenKind::Str("hello".to_string()));
    }

    #[test]
    fn test_unterminated_string_errors() {
        assert!(Lexer::new("\"oops", "test").tokenize().is_err());
        assert!(Lexer::new("\"line\nbreak\"", "test").tokenize().is_err());
    }

    #[test]
    fn test_raw_string() {
        let tokens = lex(r"~no \n processing~");
        assert_eq!(
            tokens[0].kind,
            TokenKind::RawStr("no \\n processing".to_string())
        );
    }

    #[test]
    fn test_raw_string_escaped_delimiter() {
        let tokens = lex(r"~tilde \~ inside~");
        assert_eq!(tokens[0].kind, TokenKind::RawStr("tilde ~ inside".to_string()));
    }

    #[test]
    fn test_triple_string_dedent() {
        let source = "\"\"\"\n    line one\n      indented\n    line two\n    \"\"\"";
        let tokens = lex(source);
        assert_eq!(
            tokens[0].kind,
            TokenKind::TripleStr("line one\n  indented\nline two".to_string())
        );
    }

    #[test]
    fn test_triple_string_with_tabs() {
        let source = "'''\n\t\ta\n\t\t\tb\n\t\t'''";
        let tokens = lex(source);
        assert_eq!(tokens[0].kind, TokenKind::TripleStr("a\n\tb".to_string()));
    }

    #[test]
    fn test_dedent_round_trip() {
        // Re-indenting the output by the common prefix reconstructs the body
        let body = "alpha\n  beta\ngamma";
        let reindented: String = body
            .split('\n')
            .map(|l| format!("    {}", l))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(dedent(&format!("\n{}\n    ", reindented)), body);
    }

    #[test]
    fn test_unknown_character_errors() {
        let result = Lexer::new("x @ y", "test").tokenize();
        let err = result.unwrap_err();
        assert!(err.message.contains("unexpected character '@'"));
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 3);
    }
}
