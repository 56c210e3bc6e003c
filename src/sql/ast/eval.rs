/*!
Literal evaluation and constant folding over expressions.

`eval` computes the value of an expression against a map of variable
bindings; anything it cannot resolve yields `None`. `reduce` folds the
literal subtrees of an expression without needing bindings, so callers
embedding the compiler can simplify user input before inspecting it.
Neither runs as part of `compile`; the emitted DSL always reflects the
statement as written.
*/

use std::collections::HashMap;

use crate::sql::ast::{BinaryOperator, Expr, Literal};

/// A concrete value an expression can evaluate to.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalValue {
    Integer(i64),
    Number(f64),
    String(String),
    Boolean(bool),
}

impl EvalValue {
    fn as_number(&self) -> Option<f64> {
        match self {
            EvalValue::Integer(v) => Some(*v as f64),
            EvalValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    fn from_literal(lit: &Literal) -> Option<EvalValue> {
        match lit {
            Literal::Integer(v) => Some(EvalValue::Integer(*v)),
            Literal::Number(v) => Some(EvalValue::Number(*v)),
            Literal::String(s) => Some(EvalValue::String(s.clone())),
            Literal::Boolean(b) => Some(EvalValue::Boolean(*b)),
            Literal::Regex(_) | Literal::List(_) => None,
        }
    }

    fn into_literal(self) -> Literal {
        match self {
            EvalValue::Integer(v) => Literal::Integer(v),
            EvalValue::Number(v) => Literal::Number(v),
            EvalValue::String(s) => Literal::String(s),
            EvalValue::Boolean(b) => Literal::Boolean(b),
        }
    }
}

/// Evaluate an expression against variable bindings. Returns `None` for
/// anything that does not resolve to a single literal value: unbound
/// references, function calls, regex or list literals, and type
/// mismatches.
pub fn eval(expr: &Expr, env: &HashMap<String, EvalValue>) -> Option<EvalValue> {
    match expr {
        Expr::Literal(lit) => EvalValue::from_literal(lit),
        Expr::VarRef { value, .. } => env.get(value).cloned(),
        Expr::Paren(inner) => eval(inner, env),
        Expr::Binary { op, lhs, rhs } => {
            let lhs = eval(lhs, env)?;
            let rhs = eval(rhs, env)?;
            eval_binary(*op, lhs, rhs)
        }
        Expr::Call { .. } | Expr::Wildcard => None,
    }
}

fn eval_binary(op: BinaryOperator, lhs: EvalValue, rhs: EvalValue) -> Option<EvalValue> {
    use BinaryOperator::*;

    match (&lhs, &rhs) {
        (EvalValue::Boolean(l), EvalValue::Boolean(r)) => {
            let v = match op {
                And => *l && *r,
                Or => *l || *r,
                Equal => l == r,
                NotEqual => l != r,
                _ => return None,
            };
            Some(EvalValue::Boolean(v))
        }
        (EvalValue::String(l), EvalValue::String(r)) => match op {
            Add => Some(EvalValue::String(format!("{}{}", l, r))),
            Equal => Some(EvalValue::Boolean(l == r)),
            NotEqual => Some(EvalValue::Boolean(l != r)),
            _ => None,
        },
        // Two integers stay integral except under division.
        (EvalValue::Integer(l), EvalValue::Integer(r)) => match op {
            Add => Some(EvalValue::Integer(l + r)),
            Subtract => Some(EvalValue::Integer(l - r)),
            Multiply => Some(EvalValue::Integer(l * r)),
            Modulo => {
                if *r == 0 {
                    None
                } else {
                    Some(EvalValue::Integer(l % r))
                }
            }
            Divide => {
                if *r == 0 {
                    Some(EvalValue::Number(0.0))
                } else {
                    Some(EvalValue::Number(*l as f64 / *r as f64))
                }
            }
            _ => eval_compare(op, *l as f64, *r as f64),
        },
        _ => {
            let l = lhs.as_number()?;
            let r = rhs.as_number()?;
            match op {
                Add => Some(EvalValue::Number(l + r)),
                Subtract => Some(EvalValue::Number(l - r)),
                Multiply => Some(EvalValue::Number(l * r)),
                Divide => {
                    if r == 0.0 {
                        Some(EvalValue::Number(0.0))
                    } else {
                        Some(EvalValue::Number(l / r))
                    }
                }
                _ => eval_compare(op, l, r),
            }
        }
    }
}

fn eval_compare(op: BinaryOperator, l: f64, r: f64) -> Option<EvalValue> {
    use BinaryOperator::*;
    let v = match op {
        Equal => l == r,
        NotEqual => l != r,
        LessThan => l < r,
        LessThanOrEqual => l <= r,
        GreaterThan => l > r,
        GreaterThanOrEqual => l >= r,
        _ => return None,
    };
    Some(EvalValue::Boolean(v))
}

/// Fold the literal subtrees of an expression. References, calls and
/// anything else that cannot be computed stay untouched; a parenthesized
/// literal loses its parentheses. The top-level result also sheds a
/// redundant paren.
pub fn reduce(expr: Expr) -> Expr {
    let reduced = reduce_inner(expr);
    match reduced {
        Expr::Paren(inner) => *inner,
        other => other,
    }
}

fn reduce_inner(expr: Expr) -> Expr {
    match expr {
        Expr::Binary { op, lhs, rhs } => {
            let lhs = reduce_inner(*lhs);
            let rhs = reduce_inner(*rhs);

            // Logical identities apply even when one side stays symbolic.
            if op == BinaryOperator::And {
                if is_bool(&lhs, false) || is_bool(&rhs, false) {
                    return Expr::Literal(Literal::Boolean(false));
                }
                if is_bool(&lhs, true) {
                    return rhs;
                }
                if is_bool(&rhs, true) {
                    return lhs;
                }
            } else if op == BinaryOperator::Or {
                if is_bool(&lhs, true) || is_bool(&rhs, true) {
                    return Expr::Literal(Literal::Boolean(true));
                }
                if is_bool(&lhs, false) {
                    return rhs;
                }
                if is_bool(&rhs, false) {
                    return lhs;
                }
            }

            if let (Expr::Literal(l), Expr::Literal(r)) = (&lhs, &rhs) {
                let folded = EvalValue::from_literal(l)
                    .zip(EvalValue::from_literal(r))
                    .and_then(|(l, r)| eval_binary(op, l, r));
                if let Some(value) = folded {
                    return Expr::Literal(value.into_literal());
                }
            }

            Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            }
        }
        Expr::Paren(inner) => {
            let inner = reduce_inner(*inner);
            match inner {
                lit @ Expr::Literal(_) => lit,
                other => Expr::Paren(Box::new(other)),
            }
        }
        Expr::Call { name, args } => Expr::Call {
            name,
            args: args.into_iter().map(reduce_inner).collect(),
        },
        other => other,
    }
}

fn is_bool(expr: &Expr, value: bool) -> bool {
    matches!(expr, Expr::Literal(Literal::Boolean(b)) if *b == value)
}
