/*!
Semantic validation of a parsed statement.

Structural rules that the grammar cannot express are checked here once
parsing succeeds: boolean operators stay out of the projection, function
calls stay out of filters, aggregates do not mix with raw references, and
aggregate arguments are shaped sanely. The first violation aborts the
compile.
*/

use crate::sql::ast::visit::{walk, Flow, Node, Visitor};
use crate::sql::ast::{BinaryOperator, Expr, Literal, SelectStatement};
use crate::sql::error::{SqlError, SqlResult};

/// Aggregation functions the emitter understands in the projection.
pub fn is_aggregate_function(name: &str) -> bool {
    matches!(
        name,
        "avg"
            | "cardinality"
            | "sum"
            | "max"
            | "min"
            | "top"
            | "count"
            | "value_count"
            | "stats"
            | "extended_stats"
            | "percentiles"
            | "percentile_ranks"
            | "distinct"
    )
}

pub fn validate_statement(stmt: &SelectStatement) -> SqlResult<()> {
    validate_fields(stmt)?;
    if let Some(cond) = &stmt.condition {
        validate_filter(cond)?;
    }
    if let Some(having) = &stmt.having {
        validate_filter(having)?;
    }
    validate_aggregates(stmt)?;
    Ok(())
}

/// Projection expressions must stay arithmetic: any boolean-producing
/// operator belongs in WHERE or HAVING instead.
fn validate_fields(stmt: &SelectStatement) -> SqlResult<()> {
    for field in &stmt.fields {
        let mut bad_op = None;
        crate::sql::ast::visit::walk_fn(Node::Expr(&field.expr), |node| {
            if bad_op.is_some() {
                return;
            }
            if let Node::Expr(Expr::Binary { op, .. }) = node {
                if op.is_boolean() {
                    bad_op = Some(*op);
                }
            }
        });
        if let Some(op) = bad_op {
            return Err(SqlError::semantic(format!(
                "invalid operator {} in SELECT field, only support +-*/",
                op
            )));
        }

        if let Expr::Binary { .. } = &field.expr {
            validate_no_mixing(&field.expr)?;
        }
    }
    Ok(())
}

/// A field-level binary expression may combine aggregate calls or raw
/// references, never both.
fn validate_no_mixing(expr: &Expr) -> SqlResult<()> {
    struct MixVisitor {
        calls: bool,
        refs: bool,
    }
    impl Visitor for MixVisitor {
        fn visit(&mut self, node: Node<'_>) -> Flow {
            match node {
                Node::Expr(Expr::Call { .. }) => {
                    self.calls = true;
                    // References inside an aggregate's own arguments are fine.
                    Flow::Prune
                }
                Node::Expr(Expr::VarRef { .. }) => {
                    self.refs = true;
                    Flow::Descend
                }
                _ => Flow::Descend,
            }
        }
    }

    let mut v = MixVisitor {
        calls: false,
        refs: false,
    };
    walk(&mut v, Node::Expr(expr));
    if v.calls && v.refs {
        return Err(SqlError::semantic(
            "binary expressions cannot mix aggregates and raw fields",
        ));
    }
    Ok(())
}

/// WHERE and HAVING take plain comparisons; functions are not permitted,
/// and string literals only compare with =, !=, =~ and !~.
fn validate_filter(expr: &Expr) -> SqlResult<()> {
    let mut err = None;
    crate::sql::ast::visit::walk_fn(Node::Expr(expr), |node| {
        if err.is_some() {
            return;
        }
        match node {
            Node::Expr(Expr::Call { name, .. }) => {
                err = Some(SqlError::semantic(format!(
                    "invalid filter, unsupported function {}",
                    name
                )));
            }
            Node::Expr(Expr::Binary { op, lhs, rhs }) => {
                let string_side = matches!(**lhs, Expr::Literal(Literal::String(_)))
                    || matches!(**rhs, Expr::Literal(Literal::String(_)));
                let string_ok = matches!(
                    op,
                    BinaryOperator::Equal
                        | BinaryOperator::NotEqual
                        | BinaryOperator::RegexMatch
                        | BinaryOperator::RegexNotMatch
                        | BinaryOperator::And
                        | BinaryOperator::Or
                        | BinaryOperator::In
                        | BinaryOperator::NotIn
                );
                if string_side && !string_ok {
                    err = Some(SqlError::semantic(format!(
                        "invalid operator {} on string literal, only support = != =~ !~",
                        op
                    )));
                }
                let regex_side = matches!(**lhs, Expr::Literal(Literal::Regex(_)))
                    || matches!(**rhs, Expr::Literal(Literal::Regex(_)));
                let regex_ok = matches!(
                    op,
                    BinaryOperator::RegexMatch | BinaryOperator::RegexNotMatch
                );
                if regex_side && !regex_ok {
                    err = Some(SqlError::semantic(format!(
                        "invalid operator {} on regex literal, only support =~ !~",
                        op
                    )));
                }
            }
            _ => {}
        }
    });
    match err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Check every aggregate call in the projection: argument count, argument
/// category, and the distinct special case.
fn validate_aggregates(stmt: &SelectStatement) -> SqlResult<()> {
    for field in &stmt.fields {
        for call in field.expr.function_calls() {
            let (name, args) = match call {
                Expr::Call { name, args } => (name.as_str(), args),
                _ => continue,
            };

            if name == "distinct" {
                if args.is_empty() {
                    return Err(SqlError::semantic(
                        "distinct function requires at least one argument",
                    ));
                }
                if args.len() != 1 {
                    return Err(SqlError::semantic(
                        "distinct function can only have one argument",
                    ));
                }
                continue;
            }

            if !is_aggregate_function(name) {
                continue;
            }
            if args.is_empty() {
                return Err(SqlError::semantic(format!(
                    "invalid number of arguments for {}, expected at least 1, got 0",
                    name
                )));
            }
            match &args[0] {
                Expr::VarRef { .. } | Expr::Wildcard => {}
                Expr::Binary { .. } => validate_aggregate_argument(name, &args[0])?,
                Expr::Call {
                    name: inner_name, ..
                } if inner_name == "distinct" => {}
                _ => {
                    return Err(SqlError::semantic(format!(
                        "expected field argument in {}()",
                        name
                    )));
                }
            }
        }
    }
    Ok(())
}

/// A binary expression inside an aggregate must be purely arithmetic and
/// reference at least one field.
fn validate_aggregate_argument(name: &str, arg: &Expr) -> SqlResult<()> {
    let mut nested_call = false;
    let mut bad_op = None;
    let mut has_ref = false;
    crate::sql::ast::visit::walk_fn(Node::Expr(arg), |node| match node {
        Node::Expr(Expr::Call { .. }) => nested_call = true,
        Node::Expr(Expr::Binary { op, .. }) if op.is_boolean() => {
            if bad_op.is_none() {
                bad_op = Some(*op);
            }
        }
        Node::Expr(Expr::VarRef { .. }) => has_ref = true,
        _ => {}
    });

    if let Some(op) = bad_op {
        return Err(SqlError::semantic(format!(
            "invalid operator {} in {} argument, only support +-*/",
            op, name
        )));
    }
    if nested_call {
        return Err(SqlError::semantic(format!(
            "expected field argument in {}()",
            name
        )));
    }
    if !has_ref {
        return Err(SqlError::semantic(format!(
            "expected field argument in {}()",
            name
        )));
    }
    Ok(())
}
