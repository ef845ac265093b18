//! Tokenizer for the supported Java subset.

use crate::ast::Comment;
use crate::ast::CommentKind;
use crate::syntax::errors::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Keyword,
    IntLiteral,
    LongLiteral,
    FloatLiteral,
    DoubleLiteral,
    CharLiteral,
    StringLiteral,
    Operator,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Raw source text; literals keep their quotes and suffixes.
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
    /// Comments between the previous token and this one.
    pub comments: Vec<Comment>,
}

impl Token {
    pub fn is(&self, text: &str) -> bool {
        matches!(self.kind, TokenKind::Operator | TokenKind::Keyword) && self.text == text
    }
}

const KEYWORDS: &[&str] = &[
    "abstract",
    "assert",
    "boolean",
    "break",
    "byte",
    "case",
    "catch",
    "char",
    "class",
    "const",
    "continue",
    "default",
    "do",
    "double",
    "else",
    "enum",
    "extends",
    "false",
    "final",
    "finally",
    "float",
    "for",
    "goto",
    "if",
    "implements",
    "import",
    "instanceof",
    "int",
    "interface",
    "long",
    "native",
    "new",
    "null",
    "package",
    "private",
    "protected",
    "public",
    "return",
    "short",
    "static",
    "strictfp",
    "super",
    "switch",
    "synchronized",
    "this",
    "throw",
    "throws",
    "transient",
    "true",
    "try",
    "void",
    "volatile",
    "while",
];

pub(crate) const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
];

/// Longest first, so a linear scan finds the maximal munch.
const OPERATORS: &[&str] = &[
    ">>>=", "<<=", ">>=", ">>>", "...", "->", "::", "++", "--", "&&", "||", "==", "!=", "<=",
    ">=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<", ">>", "(", ")", "{", "}", "[",
    "]", ";", ",", ".", "@", "=", ">", "<", "!", "~", "?", ":", "+", "-", "*", "/", "&", "|",
    "^", "%",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

struct Lexer<'a> {
    file: &'a str,
    text: &'a str,
    offset: usize,
    line: usize,
    column: usize,
    pending_comments: Vec<Comment>,
}

/// Split `text` into tokens. The last token is always [`TokenKind::Eof`],
/// carrying any trailing comments.
pub fn tokenize(file: &str, text: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer {
        file,
        text,
        offset: 0,
        line: 1,
        column: 1,
        pending_comments: Vec::new(),
    };
    let mut tokens = Vec::new();
    loop {
        lexer.skip_trivia()?;
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

impl Lexer<'_> {
    fn rest(&self) -> &str {
        &self.text[self.offset..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.file, self.line, self.column, self.offset, message)
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_nth(1) == Some('/') => {
                    self.bump();
                    self.bump();
                    let start = self.offset;
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.bump();
                    }
                    let body = self.text[start..self.offset].trim_end_matches('\r');
                    self.pending_comments.push(Comment::line(body));
                }
                Some('/') if self.peek_nth(1) == Some('*') => {
                    let error = self.error("unterminated comment");
                    self.bump();
                    self.bump();
                    let javadoc = self.peek() == Some('*') && self.peek_nth(1) != Some('/');
                    if javadoc {
                        self.bump();
                    }
                    let start = self.offset;
                    let Some(close) = self.rest().find("*/") else {
                        return Err(error);
                    };
                    while self.offset < start + close {
                        self.bump();
                    }
                    let body = self.text[start..self.offset].to_string();
                    self.bump();
                    self.bump();
                    let kind = if javadoc {
                        CommentKind::Javadoc
                    } else {
                        CommentKind::Block
                    };
                    self.pending_comments.push(Comment { kind, text: body });
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        let (start, line, column) = (self.offset, self.line, self.column);
        let kind = match self.peek() {
            None => TokenKind::Eof,
            Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {
                while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '$')
                {
                    self.bump();
                }
                if is_keyword(&self.text[start..self.offset]) {
                    TokenKind::Keyword
                } else {
                    TokenKind::Identifier
                }
            }
            Some(c) if c.is_ascii_digit() => self.number()?,
            Some('.') if self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => self.number()?,
            Some('"') => {
                if self.rest().starts_with("\"\"\"") {
                    return Err(self.error("text blocks are not supported"));
                }
                self.quoted('"')?;
                TokenKind::StringLiteral
            }
            Some('\'') => {
                self.quoted('\'')?;
                TokenKind::CharLiteral
            }
            Some(c) => {
                let Some(op) = OPERATORS.iter().find(|op| self.rest().starts_with(**op)) else {
                    return Err(self.error(format!("unexpected character '{c}'")));
                };
                for _ in 0..op.len() {
                    self.bump();
                }
                TokenKind::Operator
            }
        };
        Ok(Token {
            kind,
            text: self.text[start..self.offset].to_string(),
            start,
            end: self.offset,
            line,
            column,
            comments: std::mem::take(&mut self.pending_comments),
        })
    }

    fn digits(&mut self, accept: impl Fn(char) -> bool) -> usize {
        let mut count = 0;
        while let Some(c) = self.peek() {
            if accept(c) {
                count += usize::from(c != '_');
                self.bump();
            } else {
                break;
            }
        }
        count
    }

    fn number(&mut self) -> Result<TokenKind, ParseError> {
        let radix_prefix = self.peek() == Some('0')
            && matches!(self.peek_nth(1), Some('x' | 'X' | 'b' | 'B'));
        if radix_prefix {
            let binary = matches!(self.peek_nth(1), Some('b' | 'B'));
            self.bump();
            self.bump();
            let count = if binary {
                self.digits(|c| matches!(c, '0' | '1' | '_'))
            } else {
                self.digits(|c| c.is_ascii_hexdigit() || c == '_')
            };
            if count == 0 {
                return Err(self.error("malformed integer literal"));
            }
            if matches!(self.peek(), Some('.' | 'p' | 'P')) {
                return Err(self.error("hexadecimal floating-point literals are not supported"));
            }
            return Ok(self.integer_suffix());
        }

        let mut floating = false;
        self.digits(|c| c.is_ascii_digit() || c == '_');
        if self.peek() == Some('.')
            && !self
                .peek_nth(1)
                .is_some_and(|c| {
                    c == '.' || (c.is_alphabetic() && !matches!(c, 'e' | 'E' | 'f' | 'F' | 'd' | 'D'))
                })
        {
            floating = true;
            self.bump();
            self.digits(|c| c.is_ascii_digit() || c == '_');
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            floating = true;
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            if self.digits(|c| c.is_ascii_digit()) == 0 {
                return Err(self.error("malformed exponent"));
            }
        }
        match self.peek() {
            Some('f' | 'F') => {
                self.bump();
                Ok(TokenKind::FloatLiteral)
            }
            Some('d' | 'D') => {
                self.bump();
                Ok(TokenKind::DoubleLiteral)
            }
            _ if floating => Ok(TokenKind::DoubleLiteral),
            _ => Ok(self.integer_suffix()),
        }
    }

    fn integer_suffix(&mut self) -> TokenKind {
        if matches!(self.peek(), Some('l' | 'L')) {
            self.bump();
            TokenKind::LongLiteral
        } else {
            TokenKind::IntLiteral
        }
    }

    fn quoted(&mut self, quote: char) -> Result<(), ParseError> {
        let error = self.error(if quote == '"' {
            "unterminated string literal"
        } else {
            "unterminated character literal"
        });
        self.bump();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(error),
                Some('\\') => {
                    if self.bump().is_none() {
                        return Err(error);
                    }
                }
                Some(c) if c == quote => return Ok(()),
                Some(_) => {}
            }
        }
    }
}

/// Decode the escapes of a string or char literal body (quotes excluded).
pub fn unescape(body: &str) -> Result<String, String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = chars.next().ok_or("dangling escape")?;
        match escaped {
            'b' => out.push('\u{8}'),
            't' => out.push('\t'),
            'n' => out.push('\n'),
            'f' => out.push('\u{c}'),
            'r' => out.push('\r'),
            's' => out.push(' '),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            '\\' => out.push('\\'),
            'u' => {
                while chars.peek() == Some(&'u') {
                    chars.next();
                }
                let hex: String = chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&hex, 16)
                    .map_err(|_| format!("invalid unicode escape '\\u{hex}'"))?;
                out.push(char::from_u32(code).ok_or("unicode escape is not a scalar value")?);
            }
            '0'..='7' => {
                let mut value = escaped.to_digit(8).unwrap_or(0);
                let max_len = if escaped <= '3' { 3 } else { 2 };
                for _ in 1..max_len {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value).ok_or("invalid octal escape")?);
            }
            other => return Err(format!("invalid escape sequence '\\{other}'")),
        }
    }
    Ok(out)
}

/// Inverse of [`unescape`] for printing.
pub fn escape(text: &str, quote: char) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{c}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<(TokenKind, String)> {
        tokenize("T.java", text)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn operators_use_maximal_munch() {
        let tokens = kinds("a >>>= b >> c");
        let ops: Vec<_> = tokens
            .iter()
            .filter(|(k, _)| *k == TokenKind::Operator)
            .map(|(_, t)| t.as_str())
            .collect();
        assert_eq!(ops, vec![">>>=", ">>"]);
    }

    #[test]
    fn numbers_classify_by_suffix_and_shape() {
        let tokens = kinds("1 2L 3.0 4f 5e3 0x1F .5 7d");
        let found: Vec<_> = tokens.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            found,
            vec![
                TokenKind::IntLiteral,
                TokenKind::LongLiteral,
                TokenKind::DoubleLiteral,
                TokenKind::FloatLiteral,
                TokenKind::DoubleLiteral,
                TokenKind::IntLiteral,
                TokenKind::DoubleLiteral,
                TokenKind::DoubleLiteral,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_attach_to_following_token() {
        let tokens = tokenize("T.java", "// one\n/** doc */ int /* two */ x").unwrap();
        assert_eq!(tokens[0].comments.len(), 2);
        assert_eq!(tokens[0].comments[0], Comment::line(" one"));
        assert_eq!(tokens[0].comments[1].kind, CommentKind::Javadoc);
        assert_eq!(tokens[1].comments, vec![Comment::block(" two ")]);
    }

    #[test]
    fn positions_are_one_based() {
        let tokens = tokenize("T.java", "class\n  Foo").unwrap();
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
        assert_eq!(tokens[1].start, 8);
    }

    #[test]
    fn unterminated_string_is_located() {
        let err = tokenize("T.java", "x = \"abc\n").unwrap_err();
        assert_eq!((err.line, err.column), (1, 5));
        assert!(err.message.contains("unterminated string"));
    }

    #[test]
    fn escapes_round_trip() {
        let raw = "tab\there \"quoted\" \\ \u{1}";
        assert_eq!(unescape(&escape(raw, '"')).unwrap(), raw);
        assert_eq!(unescape("\\101\\u0042").unwrap(), "AB");
    }
}
