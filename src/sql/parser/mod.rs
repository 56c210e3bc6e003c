/*!
Statement parser.

The parser drives the scanner through a one-token pushback buffer and
builds a `SelectStatement`. Clause parsing is plain recursive descent;
expressions go through precedence climbing (see `expressions`).

Every entry point returns `Result<_, SqlError>`: parse errors carry the
token that was found, the alternatives that were expected, and the source
position. Lexical sentinels from the scanner surface here as parse
errors. Semantic validation runs once the statement is fully parsed.
*/

pub mod lexer;

mod expressions;

pub use lexer::{Pos, Scanner, Token};

use crate::sql::ast::visit::{walk_fn, Node};
use crate::sql::ast::{Dimension, Expr, Field, Measurement, SelectStatement, SortField};
use crate::sql::error::{SqlError, SqlResult};
use crate::sql::validator;

use lexer::tokstr;

/// Parser over a single statement's text.
pub struct Parser {
    scanner: Scanner,
    buf: Option<(Token, Pos, String)>,
}

impl Parser {
    pub fn new(input: &str) -> Self {
        Parser {
            scanner: Scanner::new(input),
            buf: None,
        }
    }

    /// Parse a statement string into its AST representation.
    pub fn parse_statement(input: &str) -> SqlResult<SelectStatement> {
        Parser::new(input).parse()
    }

    /// Parse an expression string into its AST representation.
    pub fn parse_expr_str(input: &str) -> SqlResult<Expr> {
        Parser::new(input).parse_expr()
    }

    /// Parse the single SELECT statement this parser was created over.
    pub fn parse(&mut self) -> SqlResult<SelectStatement> {
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::Select {
            return Err(SqlError::parse_error(tokstr(tok, &lit), &["SELECT"], pos));
        }
        self.parse_select_statement()
    }

    // ── token plumbing ───────────────────────────────────────────

    pub(crate) fn scan(&mut self) -> (Token, Pos, String) {
        match self.buf.take() {
            Some(buffered) => buffered,
            None => self.scanner.scan(),
        }
    }

    pub(crate) fn unscan(&mut self, t: (Token, Pos, String)) {
        self.buf = Some(t);
    }

    /// Scan the next non-whitespace token. Whitespace runs collapse to a
    /// single token, so a second scan is always enough.
    pub(crate) fn scan_ignore_whitespace(&mut self) -> (Token, Pos, String) {
        let t = self.scan();
        if t.0 == Token::Ws {
            self.scan()
        } else {
            t
        }
    }

    /// Probe for a regex literal. Regexes are scanned on demand because
    /// `/` is the division operator everywhere else; this only looks at
    /// raw characters when no token is buffered.
    pub(crate) fn parse_regex(&mut self) -> SqlResult<Option<Expr>> {
        if let Some((tok, _, _)) = &self.buf {
            if *tok == Token::Ws {
                self.buf = None;
            } else {
                return Ok(None);
            }
        }
        self.scanner.skip_whitespace();
        if self.scanner.peek_char() != Some('/') {
            return Ok(None);
        }

        let (tok, pos, lit) = self.scanner.scan_regex();
        match tok {
            Token::Regex => {
                if let Err(err) = regex::Regex::new(&lit) {
                    return Err(SqlError::parse_message(format!("bad regex: {}", err), pos));
                }
                Ok(Some(Expr::Literal(crate::sql::ast::Literal::Regex(lit))))
            }
            Token::BadRegex => Err(SqlError::parse_message(format!("bad regex: {}", lit), pos)),
            Token::BadEscape => Err(SqlError::parse_message(format!("bad escape: {}", lit), pos)),
            other => Err(SqlError::parse_error(tokstr(other, &lit), &["regex"], pos)),
        }
    }

    // ── statement parsing ────────────────────────────────────────

    /// Parse a select statement; assumes the SELECT token was consumed.
    fn parse_select_statement(&mut self) -> SqlResult<SelectStatement> {
        let mut stmt = SelectStatement {
            fields: self.parse_fields()?,
            sources: self.parse_sources()?,
            ..SelectStatement::default()
        };

        stmt.condition = self.parse_condition()?;
        stmt.dimensions = self.parse_dimensions()?;
        stmt.having = self.parse_having()?;
        stmt.sort_fields = self.parse_order_by()?;
        let (limit, offset) = self.parse_limit()?;
        stmt.limit = limit;
        stmt.offset = offset;

        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::Eof {
            return Err(SqlError::parse_error(tokstr(tok, &lit), &["EOF"], pos));
        }

        // A query is raw when no function call appears in the projection.
        let mut is_raw = true;
        for field in &stmt.fields {
            walk_fn(Node::Expr(&field.expr), |node| {
                if let Node::Expr(Expr::Call { .. }) = node {
                    is_raw = false;
                }
            });
        }
        stmt.is_raw_query = is_raw;

        validator::validate_statement(&stmt)?;

        Ok(stmt)
    }

    fn parse_fields(&mut self) -> SqlResult<Vec<Field>> {
        let mut fields = Vec::new();
        loop {
            fields.push(self.parse_field()?);
            let t = self.scan_ignore_whitespace();
            if t.0 != Token::Comma {
                self.unscan(t);
                break;
            }
        }
        Ok(fields)
    }

    fn parse_field(&mut self) -> SqlResult<Field> {
        let expr = self.parse_expr()?;
        let alias = self.parse_alias()?;
        Ok(Field { expr, alias })
    }

    /// Parse the optional `AS IDENT` alias of fields and dimensions.
    fn parse_alias(&mut self) -> SqlResult<Option<String>> {
        let t = self.scan_ignore_whitespace();
        if t.0 != Token::As {
            self.unscan(t);
            return Ok(None);
        }
        Ok(Some(self.parse_ident()?))
    }

    pub(crate) fn parse_ident(&mut self) -> SqlResult<String> {
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::Ident {
            return Err(SqlError::parse_error(
                tokstr(tok, &lit),
                &["identifier"],
                pos,
            ));
        }
        Ok(lit)
    }

    fn parse_sources(&mut self) -> SqlResult<Vec<Measurement>> {
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::From {
            return Err(SqlError::parse_error(tokstr(tok, &lit), &["FROM"], pos));
        }
        let database = self.parse_ident()?;
        Ok(vec![Measurement { database }])
    }

    fn parse_condition(&mut self) -> SqlResult<Option<Expr>> {
        let t = self.scan_ignore_whitespace();
        if t.0 != Token::Where {
            self.unscan(t);
            return Ok(None);
        }
        Ok(Some(self.parse_expr()?))
    }

    fn parse_dimensions(&mut self) -> SqlResult<Vec<Dimension>> {
        let t = self.scan_ignore_whitespace();
        if t.0 != Token::Group {
            self.unscan(t);
            return Ok(Vec::new());
        }
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::By {
            return Err(SqlError::parse_error(tokstr(tok, &lit), &["BY"], pos));
        }

        let mut dimensions = Vec::new();
        loop {
            dimensions.push(self.parse_dimension()?);
            let t = self.scan_ignore_whitespace();
            if t.0 != Token::Comma {
                self.unscan(t);
                break;
            }
        }
        Ok(dimensions)
    }

    fn parse_dimension(&mut self) -> SqlResult<Dimension> {
        let expr = self.parse_expr()?;
        let alias = self.parse_alias()?;
        Ok(Dimension { expr, alias })
    }

    fn parse_having(&mut self) -> SqlResult<Option<Expr>> {
        let t = self.scan_ignore_whitespace();
        if t.0 != Token::Having {
            self.unscan(t);
            return Ok(None);
        }
        Ok(Some(self.parse_expr()?))
    }

    fn parse_order_by(&mut self) -> SqlResult<Vec<SortField>> {
        let t = self.scan_ignore_whitespace();
        if t.0 != Token::Order {
            self.unscan(t);
            return Ok(Vec::new());
        }
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::By {
            return Err(SqlError::parse_error(tokstr(tok, &lit), &["BY"], pos));
        }
        self.parse_sort_fields()
    }

    fn parse_sort_fields(&mut self) -> SqlResult<Vec<SortField>> {
        let mut fields = Vec::new();

        let (tok, pos, lit) = self.scan_ignore_whitespace();
        match tok {
            // The first sort field may be a bare direction: ORDER BY DESC
            Token::Asc | Token::Desc => fields.push(SortField {
                name: None,
                ascending: tok == Token::Asc,
            }),
            Token::Ident => {
                self.unscan((tok, pos, lit));
                fields.push(self.parse_sort_field()?);
            }
            _ => {
                return Err(SqlError::parse_error(
                    tokstr(tok, &lit),
                    &["identifier", "ASC", "DESC"],
                    pos,
                ));
            }
        }

        loop {
            let t = self.scan_ignore_whitespace();
            if t.0 != Token::Comma {
                self.unscan(t);
                break;
            }
            fields.push(self.parse_sort_field()?);
        }
        Ok(fields)
    }

    fn parse_sort_field(&mut self) -> SqlResult<SortField> {
        let name = self.parse_ident()?;
        let t = self.scan_ignore_whitespace();
        let ascending = match t.0 {
            Token::Asc => true,
            Token::Desc => false,
            _ => {
                self.unscan(t);
                true
            }
        };
        Ok(SortField {
            name: Some(name),
            ascending,
        })
    }

    /// Parse `LIMIT n` or `LIMIT n, m` where m is the row offset.
    fn parse_limit(&mut self) -> SqlResult<(i64, i64)> {
        let t = self.scan_ignore_whitespace();
        if t.0 != Token::Limit {
            self.unscan(t);
            return Ok((0, 0));
        }

        let limit = self.parse_integer()?;
        let t = self.scan_ignore_whitespace();
        if t.0 != Token::Comma {
            self.unscan(t);
            return Ok((limit, 0));
        }
        let offset = self.parse_integer()?;
        Ok((limit, offset))
    }

    fn parse_integer(&mut self) -> SqlResult<i64> {
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::Integer {
            return Err(SqlError::parse_error(tokstr(tok, &lit), &["integer"], pos));
        }
        lit.parse::<i64>()
            .map_err(|_| SqlError::parse_message("unable to parse integer", pos))
    }
}
