/*!
Traversal over the AST: a prunable pre-order walk and a post-order
rewrite.

`walk` visits nodes depth-first in pre-order. For a statement the order is
fields, dimensions, sources, condition, sort fields, having. The visitor
returns `Flow::Descend` to continue into a node's children or
`Flow::Prune` to skip the subtree.

`rewrite_expr` transforms an owned expression bottom-up: children are
rebuilt first, then the rewriter sees the parent with its new children and
may replace it with another expression.
*/

use crate::sql::ast::{Dimension, Expr, Field, Measurement, SelectStatement, SortField};

/// Borrowed view over any node kind, handed to visitors.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Statement(&'a SelectStatement),
    Field(&'a Field),
    Dimension(&'a Dimension),
    SortField(&'a SortField),
    Measurement(&'a Measurement),
    Expr(&'a Expr),
}

/// Continuation decision returned from each visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Descend,
    Prune,
}

/// Called once per node during a walk.
pub trait Visitor {
    fn visit(&mut self, node: Node<'_>) -> Flow;
}

/// Walk a node hierarchy depth-first, pre-order.
pub fn walk(v: &mut dyn Visitor, node: Node<'_>) {
    if v.visit(node) == Flow::Prune {
        return;
    }

    match node {
        Node::Statement(stmt) => {
            for field in &stmt.fields {
                walk(v, Node::Field(field));
            }
            for dim in &stmt.dimensions {
                walk(v, Node::Dimension(dim));
            }
            for source in &stmt.sources {
                walk(v, Node::Measurement(source));
            }
            if let Some(cond) = &stmt.condition {
                walk(v, Node::Expr(cond));
            }
            for sf in &stmt.sort_fields {
                walk(v, Node::SortField(sf));
            }
            if let Some(having) = &stmt.having {
                walk(v, Node::Expr(having));
            }
        }
        Node::Field(field) => walk(v, Node::Expr(&field.expr)),
        Node::Dimension(dim) => walk(v, Node::Expr(&dim.expr)),
        Node::SortField(_) | Node::Measurement(_) => {}
        Node::Expr(expr) => match expr {
            Expr::Binary { lhs, rhs, .. } => {
                walk(v, Node::Expr(lhs));
                walk(v, Node::Expr(rhs));
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    walk(v, Node::Expr(arg));
                }
            }
            Expr::Paren(inner) => walk(v, Node::Expr(inner)),
            _ => {}
        },
    }
}

struct FnVisitor<F>(F);

impl<F: FnMut(Node<'_>)> Visitor for FnVisitor<F> {
    fn visit(&mut self, node: Node<'_>) -> Flow {
        (self.0)(node);
        Flow::Descend
    }
}

/// Walk with a closure that never prunes.
pub fn walk_fn(node: Node<'_>, f: impl FnMut(Node<'_>)) {
    let mut visitor = FnVisitor(f);
    walk(&mut visitor, node);
}

/// Called once per node during a rewrite, children already rebuilt.
pub trait Rewriter {
    fn rewrite(&mut self, expr: Expr) -> Expr;
}

/// Rewrite an expression depth-first, post-order.
pub fn rewrite_expr(expr: Expr, r: &mut dyn Rewriter) -> Expr {
    let expr = match expr {
        Expr::Binary { op, lhs, rhs } => Expr::Binary {
            op,
            lhs: Box::new(rewrite_expr(*lhs, r)),
            rhs: Box::new(rewrite_expr(*rhs, r)),
        },
        Expr::Paren(inner) => Expr::Paren(Box::new(rewrite_expr(*inner, r))),
        Expr::Call { name, args } => Expr::Call {
            name,
            args: args.into_iter().map(|a| rewrite_expr(a, r)).collect(),
        },
        other => other,
    };
    r.rewrite(expr)
}

struct FnRewriter<F>(F);

impl<F: FnMut(Expr) -> Expr> Rewriter for FnRewriter<F> {
    fn rewrite(&mut self, expr: Expr) -> Expr {
        (self.0)(expr)
    }
}

/// Rewrite an expression with a closure.
pub fn rewrite_expr_fn(expr: Expr, f: impl FnMut(Expr) -> Expr) -> Expr {
    let mut rewriter = FnRewriter(f);
    rewrite_expr(expr, &mut rewriter)
}

/// Rewrite every expression position of a statement: field expressions,
/// dimension expressions, the condition, and having.
pub fn rewrite_statement(mut stmt: SelectStatement, r: &mut dyn Rewriter) -> SelectStatement {
    for field in &mut stmt.fields {
        let expr = std::mem::replace(&mut field.expr, Expr::Wildcard);
        field.expr = rewrite_expr(expr, r);
    }
    for dim in &mut stmt.dimensions {
        let expr = std::mem::replace(&mut dim.expr, Expr::Wildcard);
        dim.expr = rewrite_expr(expr, r);
    }
    stmt.condition = stmt.condition.take().map(|c| rewrite_expr(c, r));
    stmt.having = stmt.having.take().map(|h| rewrite_expr(h, r));
    stmt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::ast::BinaryOperator;

    fn sample() -> Expr {
        // count(x) + value
        Expr::Binary {
            op: BinaryOperator::Add,
            lhs: Box::new(Expr::Call {
                name: "count".to_string(),
                args: vec![Expr::var_ref("x")],
            }),
            rhs: Box::new(Expr::var_ref("value")),
        }
    }

    #[test]
    fn walk_visits_in_pre_order() {
        let expr = sample();
        let mut seen = Vec::new();
        walk_fn(Node::Expr(&expr), |node| {
            if let Node::Expr(e) = node {
                seen.push(format!("{}", e));
            }
        });
        assert_eq!(seen, vec!["count(x) + value", "count(x)", "x", "value"]);
    }

    #[test]
    fn prune_skips_call_arguments() {
        struct PruneCalls(Vec<String>);
        impl Visitor for PruneCalls {
            fn visit(&mut self, node: Node<'_>) -> Flow {
                if let Node::Expr(e) = node {
                    self.0.push(format!("{}", e));
                    if matches!(e, Expr::Call { .. }) {
                        return Flow::Prune;
                    }
                }
                Flow::Descend
            }
        }
        let expr = sample();
        let mut v = PruneCalls(Vec::new());
        walk(&mut v, Node::Expr(&expr));
        assert_eq!(v.0, vec!["count(x) + value", "count(x)", "value"]);
    }

    #[test]
    fn rewrite_runs_post_order() {
        let expr = sample();
        let rewritten = rewrite_expr_fn(expr, |e| match e {
            Expr::VarRef { value, segments } => Expr::VarRef {
                value: value.to_uppercase(),
                segments,
            },
            other => other,
        });
        assert_eq!(format!("{}", rewritten), "count(X) + VALUE");
    }
}
