/*!
Tokenization for the SQL dialect.

The scanner turns the input text into `(Token, Pos, lexeme)` triples, one
token per call. Whitespace is observable: a run of spaces, tabs and line
breaks comes back as a single `Ws` token with CR / CRLF normalized to LF
in its lexeme. Lexical problems never abort the scan; they surface as the
sentinel tokens `Illegal`, `BadString`, `BadEscape` and `BadRegex`, which
the parser reports as parse errors.

Regex literals are only recognized on demand (`scan_regex`), because `/`
is the division operator everywhere else.
*/

/// Line/character position of a token, both zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pos {
    pub line: usize,
    pub column: usize,
}

/// Lexical tokens of the SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    // Special tokens
    Illegal,
    Eof,
    Ws,

    // Literal tokens
    Ident,     // main, "quoted"
    Number,    // 12345.67
    Integer,   // 12345
    String,    // 'abc'
    BadString, // 'abc
    BadEscape, // \q
    True,
    False,
    Regex,    // /.*/
    BadRegex, // /.*

    // Arithmetic operators
    Add, // +
    Sub, // -
    Mul, // *
    Div, // /
    Mod, // %

    // Logical and set operators
    And,
    Or,
    In,
    Ni, // not in

    // Comparison operators
    Eq,       // =
    Neq,      // != or <>
    EqRegex,  // =~
    NeqRegex, // !~
    Lt,       // <
    Lte,      // <=
    Gt,       // >
    Gte,      // >=

    // Punctuation
    Lbracket,    // [
    Rbracket,    // ]
    Lparen,      // (
    Rparen,      // )
    Comma,       // ,
    Dot,         // .
    DoubleColon, // ::

    // Keywords
    As,
    Asc,
    By,
    Desc,
    From,
    Group,
    Having,
    Limit,
    Order,
    Select,
    Where,
}

impl Token {
    /// Text form of the token, as it appears in error messages and in
    /// stringified statements.
    pub fn as_str(&self) -> &'static str {
        match self {
            Token::Illegal => "ILLEGAL",
            Token::Eof => "EOF",
            Token::Ws => "WS",
            Token::Ident => "IDENT",
            Token::Number => "NUMBER",
            Token::Integer => "INTEGER",
            Token::String => "STRING",
            Token::BadString => "BADSTRING",
            Token::BadEscape => "BADESCAPE",
            Token::True => "TRUE",
            Token::False => "FALSE",
            Token::Regex => "REGEX",
            Token::BadRegex => "BADREGEX",
            Token::Add => "+",
            Token::Sub => "-",
            Token::Mul => "*",
            Token::Div => "/",
            Token::Mod => "%",
            Token::And => "AND",
            Token::Or => "OR",
            Token::In => "IN",
            Token::Ni => "NI",
            Token::Eq => "=",
            Token::Neq => "!=",
            Token::EqRegex => "=~",
            Token::NeqRegex => "!~",
            Token::Lt => "<",
            Token::Lte => "<=",
            Token::Gt => ">",
            Token::Gte => ">=",
            Token::Lbracket => "[",
            Token::Rbracket => "]",
            Token::Lparen => "(",
            Token::Rparen => ")",
            Token::Comma => ",",
            Token::Dot => ".",
            Token::DoubleColon => "::",
            Token::As => "AS",
            Token::Asc => "ASC",
            Token::By => "BY",
            Token::Desc => "DESC",
            Token::From => "FROM",
            Token::Group => "GROUP",
            Token::Having => "HAVING",
            Token::Limit => "LIMIT",
            Token::Order => "ORDER",
            Token::Select => "SELECT",
            Token::Where => "WHERE",
        }
    }

    /// Binary-operator precedence, higher binds tighter. Zero for
    /// non-operators.
    pub fn precedence(&self) -> u8 {
        match self {
            Token::Or => 1,
            Token::And => 2,
            Token::In | Token::Ni => 3,
            Token::Eq
            | Token::Neq
            | Token::EqRegex
            | Token::NeqRegex
            | Token::Lt
            | Token::Lte
            | Token::Gt
            | Token::Gte => 4,
            Token::Add | Token::Sub => 5,
            Token::Mul | Token::Div | Token::Mod => 6,
            _ => 0,
        }
    }

    pub fn is_operator(&self) -> bool {
        self.precedence() > 0
    }

    pub fn is_regex_op(&self) -> bool {
        matches!(self, Token::EqRegex | Token::NeqRegex)
    }

    /// Case-insensitive keyword lookup; everything else is an identifier.
    pub fn lookup(ident: &str) -> Token {
        match ident.to_lowercase().as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            "in" => Token::In,
            "ni" => Token::Ni,
            "true" => Token::True,
            "false" => Token::False,
            "as" => Token::As,
            "asc" => Token::Asc,
            "by" => Token::By,
            "desc" => Token::Desc,
            "from" => Token::From,
            "group" => Token::Group,
            "having" => Token::Having,
            "limit" => Token::Limit,
            "order" => Token::Order,
            "select" => Token::Select,
            "where" => Token::Where,
            _ => Token::Ident,
        }
    }
}

/// Returns a literal if one was scanned, otherwise the token's own text.
pub fn tokstr(tok: Token, lit: &str) -> String {
    if lit.is_empty() {
        tok.as_str().to_string()
    } else {
        lit.to_string()
    }
}

fn is_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r')
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '@'
}

fn is_ident_char(ch: char) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

/// Character scanner producing one token per `scan` call.
pub struct Scanner {
    chars: Vec<char>,
    idx: usize,
    line: usize,
    column: usize,
    prev: Option<char>,
}

impl Scanner {
    pub fn new(input: &str) -> Self {
        Scanner {
            chars: input.chars().collect(),
            idx: 0,
            line: 0,
            column: 0,
            prev: None,
        }
    }

    fn pos(&self) -> Pos {
        Pos {
            line: self.line,
            column: self.column,
        }
    }

    pub fn peek_char(&self) -> Option<char> {
        self.chars.get(self.idx).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.idx + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.get(self.idx).copied()?;
        self.idx += 1;
        match ch {
            // The \r of a \r\n pair already counted the line break.
            '\n' if self.prev == Some('\r') => {}
            '\n' | '\r' => {
                self.line += 1;
                self.column = 0;
            }
            _ => self.column += 1,
        }
        self.prev = Some(ch);
        Some(ch)
    }

    /// Consume leading whitespace characters without producing a token.
    /// Used by the parser before probing for a regex literal.
    pub fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Scan the next token.
    pub fn scan(&mut self) -> (Token, Pos, String) {
        let pos = self.pos();
        let ch = match self.peek_char() {
            None => return (Token::Eof, pos, String::new()),
            Some(ch) => ch,
        };

        if is_whitespace(ch) {
            return self.scan_whitespace(pos);
        }
        if is_ident_start(ch) {
            return self.scan_ident(pos);
        }
        if ch.is_ascii_digit() {
            return self.scan_number(pos);
        }
        if ch == '"' {
            return self.scan_quoted(pos, '"', Token::Ident);
        }
        if ch == '\'' {
            return self.scan_quoted(pos, '\'', Token::String);
        }

        self.advance();
        match ch {
            '+' => (Token::Add, pos, String::new()),
            '-' => (Token::Sub, pos, String::new()),
            '*' => (Token::Mul, pos, String::new()),
            '/' => (Token::Div, pos, String::new()),
            '%' => (Token::Mod, pos, String::new()),
            '=' => {
                if self.peek_char() == Some('~') {
                    self.advance();
                    (Token::EqRegex, pos, String::new())
                } else {
                    (Token::Eq, pos, String::new())
                }
            }
            '!' => match self.peek_char() {
                Some('=') => {
                    self.advance();
                    (Token::Neq, pos, String::new())
                }
                Some('~') => {
                    self.advance();
                    (Token::NeqRegex, pos, String::new())
                }
                _ => (Token::Illegal, pos, "!".to_string()),
            },
            '<' => match self.peek_char() {
                Some('=') => {
                    self.advance();
                    (Token::Lte, pos, String::new())
                }
                Some('>') => {
                    self.advance();
                    (Token::Neq, pos, String::new())
                }
                _ => (Token::Lt, pos, String::new()),
            },
            '>' => {
                if self.peek_char() == Some('=') {
                    self.advance();
                    (Token::Gte, pos, String::new())
                } else {
                    (Token::Gt, pos, String::new())
                }
            }
            ':' => {
                if self.peek_char() == Some(':') {
                    self.advance();
                    (Token::DoubleColon, pos, String::new())
                } else {
                    (Token::Illegal, pos, ":".to_string())
                }
            }
            '[' => (Token::Lbracket, pos, String::new()),
            ']' => (Token::Rbracket, pos, String::new()),
            '(' => (Token::Lparen, pos, String::new()),
            ')' => (Token::Rparen, pos, String::new()),
            ',' => (Token::Comma, pos, String::new()),
            '.' => (Token::Dot, pos, String::new()),
            other => (Token::Illegal, pos, other.to_string()),
        }
    }

    /// Scan a regex literal delimited by `/`. Only called by the parser
    /// where the grammar demands a regex. `\/` unescapes to `/`; any other
    /// backslash stays in the pattern untouched. Reaching EOF before the
    /// closing slash yields `BadRegex`.
    pub fn scan_regex(&mut self) -> (Token, Pos, String) {
        let pos = self.pos();
        if self.peek_char() != Some('/') {
            let (tok, pos, lit) = self.scan();
            return (tok, pos, lit);
        }
        self.advance();

        let mut pattern = String::new();
        loop {
            match self.peek_char() {
                None => return (Token::BadRegex, pos, pattern),
                Some('/') => {
                    self.advance();
                    return (Token::Regex, pos, pattern);
                }
                Some('\\') if self.peek_at(1) == Some('/') => {
                    self.advance();
                    self.advance();
                    pattern.push('/');
                }
                Some(ch) => {
                    self.advance();
                    pattern.push(ch);
                }
            }
        }
    }

    fn scan_whitespace(&mut self, pos: Pos) -> (Token, Pos, String) {
        let mut lit = String::new();
        while let Some(ch) = self.peek_char() {
            match ch {
                '\r' => {
                    self.advance();
                    if self.peek_char() == Some('\n') {
                        self.advance();
                    }
                    lit.push('\n');
                }
                c if is_whitespace(c) => {
                    self.advance();
                    lit.push(c);
                }
                _ => break,
            }
        }
        (Token::Ws, pos, lit)
    }

    fn scan_ident(&mut self, pos: Pos) -> (Token, Pos, String) {
        let mut lit = String::new();
        while let Some(ch) = self.peek_char() {
            if is_ident_char(ch) {
                self.advance();
                lit.push(ch);
            } else {
                break;
            }
        }
        let tok = Token::lookup(&lit);
        if tok == Token::Ident {
            (Token::Ident, pos, lit)
        } else {
            (tok, pos, String::new())
        }
    }

    fn scan_number(&mut self, pos: Pos) -> (Token, Pos, String) {
        let mut lit = String::new();
        let mut is_float = false;
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_digit() {
                self.advance();
                lit.push(ch);
            } else if ch == '.' && !is_float && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                self.advance();
                lit.push(ch);
            } else {
                break;
            }
        }
        if is_float {
            (Token::Number, pos, lit)
        } else {
            (Token::Integer, pos, lit)
        }
    }

    /// Scan a quoted segment: double quotes produce identifiers, single
    /// quotes produce string literals. Recognized escapes are `\n`, `\\`
    /// and the quote character itself; anything else after a backslash is
    /// a `BadEscape`. A raw line break or EOF before the closing quote is
    /// a `BadString`.
    fn scan_quoted(&mut self, pos: Pos, quote: char, tok: Token) -> (Token, Pos, String) {
        self.advance();
        let mut lit = String::new();
        loop {
            match self.peek_char() {
                None => return (Token::BadString, pos, lit),
                Some(c) if c == quote => {
                    self.advance();
                    return (tok, pos, lit);
                }
                Some('\n') | Some('\r') => return (Token::BadString, pos, lit),
                Some('\\') => {
                    let esc_pos = self.pos();
                    self.advance();
                    match self.peek_char() {
                        Some('n') => {
                            self.advance();
                            lit.push('\n');
                        }
                        Some('\\') => {
                            self.advance();
                            lit.push('\\');
                        }
                        Some(c) if c == quote => {
                            self.advance();
                            lit.push(c);
                        }
                        Some(c) => {
                            self.advance();
                            return (Token::BadEscape, esc_pos, format!("\\{}", c));
                        }
                        None => return (Token::BadString, pos, lit),
                    }
                }
                Some(c) => {
                    self.advance();
                    lit.push(c);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup_is_case_insensitive() {
        assert_eq!(Token::lookup("select"), Token::Select);
        assert_eq!(Token::lookup("seLECT"), Token::Select);
        assert_eq!(Token::lookup("WHERE"), Token::Where);
        assert_eq!(Token::lookup("selec"), Token::Ident);
    }

    #[test]
    fn precedence_ordering() {
        assert!(Token::Mul.precedence() > Token::Add.precedence());
        assert!(Token::Add.precedence() > Token::Eq.precedence());
        assert!(Token::Eq.precedence() > Token::In.precedence());
        assert!(Token::In.precedence() > Token::And.precedence());
        assert!(Token::And.precedence() > Token::Or.precedence());
        assert!(!Token::Lparen.is_operator());
    }

    #[test]
    fn crlf_normalizes_to_lf() {
        let mut s = Scanner::new(" \n\t \r\n\t");
        let (tok, _, lit) = s.scan();
        assert_eq!(tok, Token::Ws);
        assert_eq!(lit, " \n\t \n\t");
    }
}
