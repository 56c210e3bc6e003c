/*!
Expression parsing by precedence climbing.

Binary operators bind from OR (loosest) up through AND, IN/NI,
comparisons, additive, multiplicative (tightest); ties associate left.
New operators are inserted by walking down the right spine of the tree
built so far until a node binds at least as tightly as the incoming
operator.
*/

use crate::sql::ast::{BinaryOperator, Expr, Literal};
use crate::sql::error::{SqlError, SqlResult};

use super::lexer::tokstr;
use super::{Parser, Token};

impl Parser {
    /// Parse an expression.
    pub fn parse_expr(&mut self) -> SqlResult<Expr> {
        let mut root = self.parse_unary_expr()?;

        loop {
            let (op_tok, pos, lit) = self.scan_ignore_whitespace();
            if !op_tok.is_operator() {
                self.unscan((op_tok, pos, lit));
                return Ok(root);
            }
            let op = match BinaryOperator::from_token(op_tok) {
                Some(op) => op,
                None => {
                    return Err(SqlError::parse_error(
                        tokstr(op_tok, &lit),
                        &["operator"],
                        pos,
                    ))
                }
            };

            let rhs = if op_tok.is_regex_op() {
                // The RHS of =~ / !~ must be a regular expression.
                match self.parse_regex()? {
                    Some(re) => re,
                    None => {
                        let (tok, pos, lit) = self.scan_ignore_whitespace();
                        return Err(SqlError::parse_error(tokstr(tok, &lit), &["regex"], pos));
                    }
                }
            } else if matches!(op_tok, Token::In | Token::Ni) {
                // The RHS of IN / NI must be a bracketed list literal.
                self.parse_list_literal()?
            } else {
                self.parse_unary_expr()?
            };

            root = insert_binary(root, op, rhs);
        }
    }

    /// Parse a non-binary expression.
    fn parse_unary_expr(&mut self) -> SqlResult<Expr> {
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        match tok {
            Token::Lparen => {
                let expr = self.parse_expr()?;
                let (tok, pos, lit) = self.scan_ignore_whitespace();
                if tok != Token::Rparen {
                    return Err(SqlError::parse_error(tokstr(tok, &lit), &[")"], pos));
                }
                Ok(Expr::Paren(Box::new(expr)))
            }
            Token::Ident => {
                // A left paren immediately after the identifier makes it a
                // function call; whitespace in between does not.
                let next = self.scan();
                if next.0 == Token::Lparen {
                    return self.parse_call(&lit);
                }
                self.unscan(next);
                self.parse_var_ref(lit)
            }
            Token::String => Ok(Expr::Literal(Literal::String(lit))),
            Token::Number => lit
                .parse::<f64>()
                .map(|v| Expr::Literal(Literal::Number(v)))
                .map_err(|_| SqlError::parse_message("unable to parse number", pos)),
            Token::Integer => lit
                .parse::<i64>()
                .map(|v| Expr::Literal(Literal::Integer(v)))
                .map_err(|_| SqlError::parse_message("unable to parse integer", pos)),
            Token::True | Token::False => {
                Ok(Expr::Literal(Literal::Boolean(tok == Token::True)))
            }
            Token::Mul => Ok(Expr::Wildcard),
            // A leading minus parses as zero minus the operand, so the
            // expression tree stays purely binary.
            Token::Sub => {
                let rhs = self.parse_unary_expr()?;
                Ok(Expr::Binary {
                    op: BinaryOperator::Subtract,
                    lhs: Box::new(Expr::integer(0)),
                    rhs: Box::new(rhs),
                })
            }
            _ => Err(SqlError::parse_error(
                tokstr(tok, &lit),
                &["identifier", "string", "number", "bool"],
                pos,
            )),
        }
    }

    /// Parse the dotted continuation of a variable reference whose first
    /// segment was already consumed.
    fn parse_var_ref(&mut self, first: String) -> SqlResult<Expr> {
        let mut segments = vec![first];
        loop {
            let t = self.scan();
            if t.0 != Token::Dot {
                self.unscan(t);
                break;
            }
            segments.push(self.parse_ident()?);
        }
        Ok(Expr::VarRef {
            value: segments.join("."),
            segments,
        })
    }

    /// Parse a function call; assumes the name and `(` were consumed.
    fn parse_call(&mut self, name: &str) -> SqlResult<Expr> {
        let name = name.to_lowercase();
        let mut args = Vec::new();

        // First argument, if any. A regex is allowed in argument position.
        if let Some(re) = self.parse_regex()? {
            args.push(re);
        } else {
            let t = self.scan_ignore_whitespace();
            if t.0 == Token::Rparen {
                return Ok(Expr::Call { name, args });
            }
            self.unscan(t);
            args.push(self.parse_expr()?);
        }

        loop {
            let t = self.scan_ignore_whitespace();
            if t.0 != Token::Comma {
                self.unscan(t);
                break;
            }
            if let Some(re) = self.parse_regex()? {
                args.push(re);
                continue;
            }
            args.push(self.parse_expr()?);
        }

        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::Rparen {
            return Err(SqlError::parse_error(tokstr(tok, &lit), &[")"], pos));
        }
        Ok(Expr::Call { name, args })
    }

    /// Parse the `[ lit {, lit} ]` list that must follow IN / NI.
    fn parse_list_literal(&mut self) -> SqlResult<Expr> {
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::Lbracket {
            return Err(SqlError::parse_error(tokstr(tok, &lit), &["["], pos));
        }

        let mut values = Vec::new();
        loop {
            let (tok, pos, lit) = self.scan_ignore_whitespace();
            match tok {
                Token::String => values.push(Literal::String(lit)),
                Token::Integer => values.push(
                    lit.parse::<i64>()
                        .map(Literal::Integer)
                        .map_err(|_| SqlError::parse_message("unable to parse integer", pos))?,
                ),
                Token::Number => values.push(
                    lit.parse::<f64>()
                        .map(Literal::Number)
                        .map_err(|_| SqlError::parse_message("unable to parse number", pos))?,
                ),
                _ => {
                    return Err(SqlError::parse_error(
                        tokstr(tok, &lit),
                        &["string", "integer", "number"],
                        pos,
                    ));
                }
            }

            let (tok, pos, lit) = self.scan_ignore_whitespace();
            match tok {
                Token::Comma => {}
                Token::Rbracket => break,
                _ => {
                    return Err(SqlError::parse_error(tokstr(tok, &lit), &[",", "]"], pos));
                }
            }
        }
        Ok(Expr::Literal(Literal::List(values)))
    }
}

/// Insert a new operator into the tree: descend the right spine while the
/// resident operator binds looser than the incoming one, then attach the
/// new node there. Equal precedence attaches immediately, which keeps the
/// grammar left-associative.
fn insert_binary(root: Expr, op: BinaryOperator, rhs: Expr) -> Expr {
    match root {
        Expr::Binary {
            op: resident,
            lhs,
            rhs: spine,
        } if resident.precedence() < op.precedence() => Expr::Binary {
            op: resident,
            lhs,
            rhs: Box::new(insert_binary(*spine, op, rhs)),
        },
        node => Expr::Binary {
            op,
            lhs: Box::new(node),
            rhs: Box::new(rhs),
        },
    }
}
