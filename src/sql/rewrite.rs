/*!
Pre-emission rewrites.

The target DSL addresses document fields inside inline scripts as
`doc['FIELD'].value`. Before emission, variable references in the WHERE
tree, in aggregate arguments that are expressions, and in expression
dimensions are rewritten to that form. The original dotted name survives
in `VarRef::segments`.

Operator spelling is lowered to the script dialect (`&&`, `||`, `==`) at
render time by `script_text`; the HAVING tree gets only that lowering,
since bucket selectors address sibling aggregations by name rather than
by document field.
*/

use crate::sql::ast::visit::rewrite_expr_fn;
use crate::sql::ast::{Expr, SelectStatement};
use crate::sql::validator::is_aggregate_function;

/// Script-style reference to a document field. Quotes and backslashes in
/// the name are escaped so the produced script stays well-formed.
pub fn script_ident(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for ch in name.chars() {
        match ch {
            '\n' => escaped.push_str("\\n"),
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            c => escaped.push(c),
        }
    }
    format!("doc['{}'].value", escaped)
}

/// Render an expression in the target's inline-script dialect: identical
/// to `Display` except logical and equality operators use their script
/// spellings.
pub fn script_text(expr: &Expr) -> String {
    match expr {
        Expr::Binary { op, lhs, rhs } => {
            format!(
                "{} {} {}",
                script_text(lhs),
                op.script_str(),
                script_text(rhs)
            )
        }
        Expr::Paren(inner) => format!("({})", script_text(inner)),
        Expr::Call { name, args } => {
            let args: Vec<String> = args.iter().map(script_text).collect();
            format!("{}({})", name, args.join(", "))
        }
        other => other.to_string(),
    }
}

/// Apply all pre-emission rewrites to a validated statement.
pub fn rewrite_statement(stmt: &mut SelectStatement) {
    rewrite_condition(stmt);
    rewrite_metric_args(stmt);
    rewrite_dimensions(stmt);
}

fn wrap_var_refs(expr: Expr) -> Expr {
    rewrite_expr_fn(expr, |e| match e {
        Expr::VarRef { value, segments } => Expr::VarRef {
            value: script_ident(&value),
            segments,
        },
        other => other,
    })
}

/// Every variable reference in the WHERE tree becomes a script-style
/// document access.
fn rewrite_condition(stmt: &mut SelectStatement) {
    if let Some(cond) = stmt.condition.take() {
        stmt.condition = Some(wrap_var_refs(cond));
    }
}

/// When an aggregate call takes an expression argument, the emitter puts
/// a `script` on the metric; references inside those arguments get the
/// same treatment as the condition.
fn rewrite_metric_args(stmt: &mut SelectStatement) {
    for field in &mut stmt.fields {
        let expr = std::mem::replace(&mut field.expr, Expr::Wildcard);
        field.expr = rewrite_expr_fn(expr, |e| match e {
            Expr::Call { name, args } if is_aggregate_function(&name) => {
                let args = args
                    .into_iter()
                    .map(|arg| match arg {
                        Expr::Binary { .. } => wrap_var_refs(arg),
                        other => other,
                    })
                    .collect();
                Expr::Call { name, args }
            }
            other => other,
        });
    }
}

/// Expression dimensions translate to scripted buckets, so their
/// references are wrapped too. Plain field dimensions keep their bare
/// names; the bucket addresses them with `field`.
fn rewrite_dimensions(stmt: &mut SelectStatement) {
    for dim in &mut stmt.dimensions {
        let needs_rewrite = match &dim.expr {
            Expr::Binary { .. } => true,
            Expr::Call { args, .. } => matches!(args.first(), Some(Expr::Binary { .. })),
            _ => false,
        };
        if !needs_rewrite {
            continue;
        }
        let expr = std::mem::replace(&mut dim.expr, Expr::Wildcard);
        dim.expr = match expr {
            Expr::Call { name, args } => Expr::Call {
                name,
                args: args
                    .into_iter()
                    .map(|arg| match arg {
                        Expr::Binary { .. } => wrap_var_refs(arg),
                        other => other,
                    })
                    .collect(),
            },
            other => wrap_var_refs(other),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::parser::Parser;

    #[test]
    fn script_ident_escapes_quotes() {
        assert_eq!(script_ident("exchange"), "doc['exchange'].value");
        assert_eq!(script_ident("it's"), "doc['it\\'s'].value");
    }

    #[test]
    fn condition_refs_are_wrapped() {
        let mut stmt =
            Parser::parse_statement("SELECT * FROM symbol WHERE exchange = 'nyse'").unwrap();
        rewrite_statement(&mut stmt);
        let cond = stmt.condition.unwrap();
        assert_eq!(
            script_text(&cond),
            "doc['exchange'].value == 'nyse'"
        );
    }

    #[test]
    fn segments_survive_the_rewrite() {
        let mut stmt =
            Parser::parse_statement("SELECT * FROM p WHERE tcp.src_ip = 'a'").unwrap();
        rewrite_statement(&mut stmt);
        let cond = stmt.condition.unwrap();
        match cond {
            crate::sql::ast::Expr::Binary { lhs, .. } => match *lhs {
                Expr::VarRef { value, segments } => {
                    assert_eq!(value, "doc['tcp.src_ip'].value");
                    assert_eq!(segments, vec!["tcp", "src_ip"]);
                }
                _ => panic!("expected VarRef"),
            },
            _ => panic!("expected binary expression"),
        }
    }

    #[test]
    fn metric_expression_arguments_are_wrapped() {
        let mut stmt =
            Parser::parse_statement("SELECT sum(ipo_year + last_sale) FROM symbol").unwrap();
        rewrite_statement(&mut stmt);
        assert_eq!(
            format!("{}", stmt.fields[0].expr),
            "sum(doc['ipo_year'].value + doc['last_sale'].value)"
        );
    }

    #[test]
    fn having_refs_stay_bare() {
        let mut stmt = Parser::parse_statement(
            "SELECT ipo_year, count(*) AS c FROM symbol GROUP BY ipo_year HAVING c > 200 AND c < 500",
        )
        .unwrap();
        rewrite_statement(&mut stmt);
        let having = stmt.having.unwrap();
        assert_eq!(script_text(&having), "c > 200 && c < 500");
    }
}
