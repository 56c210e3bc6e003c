/*!
DSL emission.

Walks a validated, rewritten statement and produces the Elasticsearch
query document: top-level paging and sort (raw queries), a `query` filter
tree (WHERE plus `exists` guards for grouped fields), and the `aggs` tree
(bucket aggregations from GROUP BY, metric aggregations from aggregate
calls, `bucket_script` pipelines from arithmetic over aggregates, and a
`bucket_selector` from HAVING).

Aggregation names reduce `doc['X'].value` back to `X` so the emitted keys
read like the original SQL.
*/

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Map, Value};

use crate::sql::ast::{Expr, SelectStatement};
use crate::sql::error::{SqlError, SqlResult};
use crate::sql::rewrite::script_text;

/// Aggregation kinds of the target DSL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EsAgg {
    // metric aggregations
    Avg,
    Cardinality,
    ExtendedStats,
    Max,
    Min,
    Percentiles,
    PercentileRanks,
    Stats,
    Sum,
    Top,
    ValueCount,
    /// count(*): no block of its own, the bucket's doc_count answers it
    StarCount,

    // bucket aggregations
    DateHistogram,
    Histogram,
    Range,
    Terms,

    // pipeline aggregations
    BucketScript,
    BucketSelector,
}

impl EsAgg {
    fn as_str(&self) -> &'static str {
        match self {
            EsAgg::Avg => "avg",
            EsAgg::Cardinality => "cardinality",
            EsAgg::ExtendedStats => "extended_stats",
            EsAgg::Max => "max",
            EsAgg::Min => "min",
            EsAgg::Percentiles => "percentiles",
            EsAgg::PercentileRanks => "percentile_ranks",
            EsAgg::Stats => "stats",
            EsAgg::Sum => "sum",
            EsAgg::Top => "top",
            EsAgg::ValueCount => "value_count",
            EsAgg::StarCount => "star_count",
            EsAgg::DateHistogram => "date_histogram",
            EsAgg::Histogram => "histogram",
            EsAgg::Range => "range",
            EsAgg::Terms => "terms",
            EsAgg::BucketScript => "bucket_script",
            EsAgg::BucketSelector => "bucket_selector",
        }
    }
}

/// A named aggregation ready to be placed into the tree.
struct Agg {
    name: String,
    kind: EsAgg,
    params: Map<String, Value>,
}

/// Reduce every script-style reference in `s` back to the bare field
/// name: `doc['X'].value` becomes `X`.
fn agg_name(s: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"doc\['([^']*)'\]\.value").expect("static pattern"));
    re.replace_all(s, "$1").into_owned()
}

/// Emit the DSL document for a rewritten statement.
pub fn es_dsl(stmt: &SelectStatement) -> SqlResult<Value> {
    let mut root = Value::Object(Map::new());

    if stmt.dimensions.is_empty() {
        set_path(&mut root, &[path("from")], json!(stmt.offset));
        set_path(&mut root, &[path("size")], json!(stmt.limit));
        let sort: Vec<Value> = stmt
            .sort_fields
            .iter()
            .map(|sf| {
                let mut entry = Map::new();
                entry.insert(
                    sf.name.clone().unwrap_or_default(),
                    json!(direction(sf.ascending)),
                );
                Value::Object(entry)
            })
            .collect();
        set_path(&mut root, &[path("sort")], Value::Array(sort));
    } else {
        // Paging and ordering apply per bucket when grouping.
        set_path(&mut root, &[path("size")], json!(0));
    }

    let mut filter = Map::new();
    if let Some(cond) = &stmt.condition {
        filter.insert("script".to_string(), json!({ "script": script_text(cond) }));
    }
    let guarded = dimension_ref_names(stmt);
    if !guarded.is_empty() {
        let exists: Vec<Value> = guarded
            .iter()
            .map(|name| json!({ "exists": { "field": name } }))
            .collect();
        filter.insert("and".to_string(), Value::Array(exists));
    }
    if !filter.is_empty() {
        set_path(
            &mut root,
            &[path("query"), path("bool"), path("filter")],
            Value::Object(filter),
        );
    }

    // Bucket aggregations nest in dimension order; everything else lands
    // at the innermost level.
    let mut aggs_path: Vec<String> = Vec::new();
    aggs_path.push(path("aggs"));
    for bucket in bucket_aggregates(stmt)? {
        let mut target = aggs_path.clone();
        target.push(bucket.name.clone());
        target.push(path(bucket.kind.as_str()));
        set_path(&mut root, &target, Value::Object(bucket.params));
        aggs_path.push(bucket.name);
        aggs_path.push(path("aggs"));
    }

    let mut emitted: HashSet<String> = HashSet::new();
    for metric in metric_aggs(stmt)? {
        if metric.kind == EsAgg::StarCount {
            ensure_object(&mut root, &aggs_path);
            continue;
        }
        emitted.insert(metric.name.clone());
        place_agg(&mut root, &aggs_path, metric);
    }

    let (leaf_metrics, scripts) = pipeline_aggs(stmt, &mut emitted)?;
    for metric in leaf_metrics {
        place_agg(&mut root, &aggs_path, metric);
    }
    for script in scripts {
        place_agg(&mut root, &aggs_path, script);
    }

    if let Some(having) = having_agg(stmt) {
        place_agg(&mut root, &aggs_path, having);
    }

    Ok(root)
}

fn place_agg(root: &mut Value, aggs_path: &[String], agg: Agg) {
    let mut target = aggs_path.to_vec();
    target.push(agg.name);
    target.push(path(agg.kind.as_str()));
    set_path(root, &target, Value::Object(agg.params));
}

fn path(s: &str) -> String {
    s.to_string()
}

fn direction(ascending: bool) -> &'static str {
    if ascending {
        "asc"
    } else {
        "desc"
    }
}

/// Set a value at a nested path, creating intermediate objects.
fn set_path(root: &mut Value, keys: &[String], value: Value) {
    let (last, parents) = match keys.split_last() {
        Some(split) => split,
        None => return,
    };
    let mut cur = root;
    for key in parents {
        let obj = match cur.as_object_mut() {
            Some(obj) => obj,
            None => return,
        };
        cur = obj
            .entry(key.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if let Some(obj) = cur.as_object_mut() {
        obj.insert(last.clone(), value);
    }
}

/// Make sure an object exists at the path, without touching its content.
fn ensure_object(root: &mut Value, keys: &[String]) {
    let mut cur = root;
    for key in keys {
        let obj = match cur.as_object_mut() {
            Some(obj) => obj,
            None => return,
        };
        cur = obj
            .entry(key.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

/// Unique dotted field names referenced by GROUP BY expressions, in first
/// appearance order. Each one gets an `exists` guard in the query filter.
fn dimension_ref_names(stmt: &SelectStatement) -> Vec<String> {
    use crate::sql::ast::visit::{walk_fn, Node};
    let mut names: Vec<String> = Vec::new();
    for dim in &stmt.dimensions {
        walk_fn(Node::Expr(&dim.expr), |node| {
            if let Node::Expr(Expr::VarRef { segments, .. }) = node {
                let name = segments.join(".");
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        });
    }
    names
}

/// The ORDER BY list as terms-bucket `order` entries. Names referencing a
/// GROUP BY key become `_term`; names referencing a `count(*)` alias
/// become `_count`.
fn bucket_orders(stmt: &SelectStatement) -> Vec<Value> {
    stmt.sort_fields
        .iter()
        .map(|sf| {
            let mut name = sf.name.clone().unwrap_or_default();
            if is_group_by_key(stmt, &name) {
                name = "_term".to_string();
            } else if is_star_count_alias(stmt, &name) {
                name = "_count".to_string();
            }
            let mut entry = Map::new();
            entry.insert(name, json!(direction(sf.ascending)));
            Value::Object(entry)
        })
        .collect()
}

fn is_group_by_key(stmt: &SelectStatement, name: &str) -> bool {
    stmt.dimensions.iter().any(|dim| match &dim.alias {
        Some(alias) => agg_name(alias) == name,
        None => agg_name(&dim.expr.to_string()) == name,
    })
}

fn is_star_count_alias(stmt: &SelectStatement, name: &str) -> bool {
    stmt.fields.iter().any(|field| {
        matches!(
            &field.expr,
            Expr::Call { name: fname, args } if fname == "count"
                && matches!(args.first(), Some(Expr::Wildcard))
        ) && field.alias.as_deref() == Some(name)
    })
}

/// One bucket aggregation per GROUP BY dimension.
fn bucket_aggregates(stmt: &SelectStatement) -> SqlResult<Vec<Agg>> {
    let mut aggs = Vec::new();
    for dim in &stmt.dimensions {
        let name = match &dim.alias {
            Some(alias) => agg_name(alias),
            None => agg_name(&dim.expr.to_string()),
        };
        let mut params = Map::new();

        let kind = match &dim.expr {
            Expr::Call {
                name: func,
                args,
            } => match func.as_str() {
                "range" => {
                    if args.len() < 2 {
                        return Err(SqlError::semantic(
                            "invalid number of arguments for range, expected at least 2",
                        ));
                    }
                    match &args[0] {
                        Expr::Binary { .. } => {
                            params.insert("script".to_string(), json!(args[0].to_string()));
                        }
                        other => {
                            params
                                .insert("field".to_string(), json!(agg_name(&other.to_string())));
                        }
                    }
                    params.insert("keyed".to_string(), json!(true));
                    let bounds = &args[1..];
                    let mut ranges: Vec<Value> = Vec::with_capacity(bounds.len() + 1);
                    for (i, bound) in bounds.iter().enumerate() {
                        let mut entry = Map::new();
                        if i > 0 {
                            entry.insert("from".to_string(), json!(bounds[i - 1].to_string()));
                        }
                        entry.insert("to".to_string(), json!(bound.to_string()));
                        ranges.push(Value::Object(entry));
                    }
                    ranges.push(json!({ "from": bounds[bounds.len() - 1].to_string() }));
                    params.insert("ranges".to_string(), Value::Array(ranges));
                    EsAgg::Range
                }
                "histogram" => {
                    if args.len() < 2 {
                        return Err(SqlError::semantic(
                            "invalid number of arguments for histogram, expected 2",
                        ));
                    }
                    params.insert("field".to_string(), json!(agg_name(&args[0].to_string())));
                    params.insert("interval".to_string(), json!(args[1].to_string()));
                    params.insert("min_doc_count".to_string(), json!(0));
                    EsAgg::Histogram
                }
                "date_histogram" => {
                    if args.len() < 2 {
                        return Err(SqlError::semantic(
                            "invalid number of arguments for date_histogram, expected 2",
                        ));
                    }
                    let field = args[0].to_string().trim_matches('\'').to_string();
                    let interval = args[1].to_string().trim_matches('\'').to_string();
                    params.insert("field".to_string(), json!(field));
                    params.insert("interval".to_string(), json!(interval));
                    EsAgg::DateHistogram
                }
                // Any other call becomes a scripted terms bucket.
                _ => {
                    params.insert(
                        "script".to_string(),
                        json!({ "lang": "expression", "inline": dim.expr.to_string() }),
                    );
                    attach_order_and_size(stmt, &mut params);
                    EsAgg::Terms
                }
            },
            Expr::Binary { .. } => {
                params.insert("script".to_string(), json!(dim.expr.to_string()));
                attach_order_and_size(stmt, &mut params);
                EsAgg::Terms
            }
            other => {
                params.insert("field".to_string(), json!(agg_name(&other.to_string())));
                attach_order_and_size(stmt, &mut params);
                EsAgg::Terms
            }
        };

        aggs.push(Agg { name, kind, params });
    }
    Ok(aggs)
}

fn attach_order_and_size(stmt: &SelectStatement, params: &mut Map<String, Value>) {
    if !stmt.sort_fields.is_empty() {
        params.insert("order".to_string(), Value::Array(bucket_orders(stmt)));
    }
    params.insert("size".to_string(), json!(stmt.limit));
}

/// One metric aggregation per aggregate call in the projection.
fn metric_aggs(stmt: &SelectStatement) -> SqlResult<Vec<Agg>> {
    let mut aggs = Vec::new();
    for field in &stmt.fields {
        let (func, args) = match &field.expr {
            Expr::Call { name, args } => (name.as_str(), args),
            _ => continue,
        };
        let name = match &field.alias {
            Some(alias) => agg_name(alias),
            None => default_metric_name(func, args),
        };
        aggs.push(metric_from_call(func, args, name)?);
    }
    Ok(aggs)
}

fn default_metric_name(func: &str, args: &[Expr]) -> String {
    match args.first() {
        Some(arg) => format!("{}({})", func, agg_name(&arg.to_string())),
        None => format!("{}()", func),
    }
}

fn metric_from_call(func: &str, args: &[Expr], name: String) -> SqlResult<Agg> {
    let kind = match func {
        "avg" => EsAgg::Avg,
        "cardinality" => EsAgg::Cardinality,
        "sum" => EsAgg::Sum,
        "max" => EsAgg::Max,
        "min" => EsAgg::Min,
        "top" => EsAgg::Top,
        "stats" => EsAgg::Stats,
        "extended_stats" => EsAgg::ExtendedStats,
        "percentiles" => EsAgg::Percentiles,
        "percentile_ranks" => EsAgg::PercentileRanks,
        "value_count" => EsAgg::ValueCount,
        // COUNT DISTINCT is a cardinality aggregation; distinct on its
        // own gets the same treatment.
        "distinct" => EsAgg::Cardinality,
        "count" => match args.first() {
            Some(Expr::Wildcard) => {
                return Ok(Agg {
                    name,
                    kind: EsAgg::StarCount,
                    params: Map::new(),
                });
            }
            Some(Expr::Call {
                name: inner,
                args: inner_args,
            }) if inner == "distinct" => {
                let mut params = Map::new();
                metric_param(func, inner_args.first(), &mut params)?;
                return Ok(Agg {
                    name,
                    kind: EsAgg::Cardinality,
                    params,
                });
            }
            _ => EsAgg::ValueCount,
        },
        other => {
            return Err(SqlError::semantic(format!(
                "unsupported function {} in metric aggregation",
                other
            )));
        }
    };

    let mut params = Map::new();
    metric_param(func, args.first(), &mut params)?;
    Ok(Agg { name, kind, params })
}

/// Metric parameter: a plain reference addresses the field directly, an
/// expression argument becomes an inline script.
fn metric_param(func: &str, arg: Option<&Expr>, params: &mut Map<String, Value>) -> SqlResult<()> {
    match arg {
        Some(Expr::VarRef { value, .. }) => {
            params.insert("field".to_string(), json!(agg_name(value)));
            Ok(())
        }
        Some(expr @ Expr::Binary { .. }) => {
            params.insert("script".to_string(), json!(expr.to_string()));
            Ok(())
        }
        _ => Err(SqlError::semantic(format!(
            "expected field argument in {}()",
            func
        ))),
    }
}

/// Collect the outermost calls of an expression, left to right. Unlike
/// `Expr::function_calls` this does not descend into call arguments, so
/// `count(distinct(x))` contributes a single leaf.
fn top_level_calls(expr: &Expr) -> Vec<&Expr> {
    let mut out = Vec::new();
    fn collect<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
        match expr {
            Expr::Call { .. } => out.push(expr),
            Expr::Binary { lhs, rhs, .. } => {
                collect(lhs, out);
                collect(rhs, out);
            }
            Expr::Paren(inner) => collect(inner, out),
            _ => {}
        }
    }
    collect(expr, &mut out);
    out
}

/// Pipeline aggregations: projection items that are arithmetic over
/// aggregates. Each aggregate leaf gets its metric emitted (deduplicated
/// by name), then a bucket_script maps synthetic `pathN` labels onto the
/// metric names and evaluates the expression over them.
fn pipeline_aggs(
    stmt: &SelectStatement,
    emitted: &mut HashSet<String>,
) -> SqlResult<(Vec<Agg>, Vec<Agg>)> {
    let mut metrics = Vec::new();
    let mut scripts = Vec::new();

    for field in &stmt.fields {
        if matches!(
            field.expr,
            Expr::Call { .. } | Expr::VarRef { .. } | Expr::Wildcard
        ) {
            continue;
        }
        let calls = top_level_calls(&field.expr);
        if calls.is_empty() {
            continue;
        }

        // Label each distinct call in order of first appearance.
        let mut labeled: Vec<(String, String, &Expr)> = Vec::new();
        for call in calls {
            let text = call.to_string();
            if labeled.iter().any(|(t, _, _)| *t == text) {
                continue;
            }
            let label = format!("path{}", labeled.len());
            labeled.push((text, label, call));
        }

        let mut buckets_path = Map::new();
        for (text, label, call) in &labeled {
            let (func, args) = match call {
                Expr::Call { name, args } => (name.as_str(), args),
                _ => continue,
            };
            if func == "count" && matches!(args.first(), Some(Expr::Wildcard)) {
                // The bucket's own doc_count stands in for count(*).
                buckets_path.insert(label.clone(), json!("_count"));
                continue;
            }
            let metric_name = agg_name(text);
            if emitted.insert(metric_name.clone()) {
                metrics.push(metric_from_call(func, args, metric_name.clone())?);
            }
            buckets_path.insert(label.clone(), json!(metric_name));
        }

        // Replace call texts with their labels, longest first so that no
        // call text swallows a shorter sibling.
        let mut inline = field.expr.to_string();
        let mut by_len: Vec<&(String, String, &Expr)> = labeled.iter().collect();
        by_len.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        for (text, label, _) in by_len {
            inline = inline.replace(text, label);
        }

        let name = match &field.alias {
            Some(alias) => agg_name(alias),
            None => agg_name(&inline),
        };
        let mut params = Map::new();
        params.insert("buckets_path".to_string(), Value::Object(buckets_path));
        params.insert(
            "script".to_string(),
            json!({ "inline": inline, "lang": "expression" }),
        );
        scripts.push(Agg {
            name,
            kind: EsAgg::BucketScript,
            params,
        });
    }

    Ok((metrics, scripts))
}

/// The HAVING clause as a bucket_selector at the innermost bucket. Names
/// that alias a `count(*)` projection address the bucket's doc count.
fn having_agg(stmt: &SelectStatement) -> Option<Agg> {
    use crate::sql::ast::visit::{walk_fn, Node};

    let having = stmt.having.as_ref()?;

    let mut names: Vec<String> = Vec::new();
    walk_fn(Node::Expr(having), |node| {
        if let Node::Expr(Expr::VarRef { segments, .. }) = node {
            let name = segments.join(".");
            if !names.contains(&name) {
                names.push(name);
            }
        }
    });

    let mut buckets_path = Map::new();
    for name in names {
        let target = if is_star_count_alias(stmt, &name) {
            "_count".to_string()
        } else {
            name.clone()
        };
        buckets_path.insert(name, json!(target));
    }

    let mut params = Map::new();
    params.insert("buckets_path".to_string(), Value::Object(buckets_path));
    params.insert(
        "script".to_string(),
        json!({ "inline": script_text(having), "lang": "expression" }),
    );
    Some(Agg {
        name: "having".to_string(),
        kind: EsAgg::BucketSelector,
        params,
    })
}
