use esdsl::sql::compile;
use serde_json::Value;

/// Compile each statement and compare the produced document against the
/// expected DSL as JSON values, so key order never matters.
#[test]
fn test_translator_es_dsl() {
    let tests: Vec<(&str, &str)> = vec![
        (
            "select * from symbol limit 5",
            r#"{"from": 0, "size": 5, "sort": []}"#,
        ),
        // desc sort
        (
            "select * from symbol order by name desc limit 1",
            r#"{"from": 0, "size": 1, "sort": [{"name": "desc"}]}"#,
        ),
        // asc sort
        (
            "select * from symbol order by name limit 1",
            r#"{"from": 0, "size": 1, "sort": [{"name": "asc"}]}"#,
        ),
        // where EQ condition
        (
            "select * from symbol where exchange='nyse' limit 1",
            r#"{
                "from": 0,
                "query": {"bool": {"filter": {"script": {"script": "doc['exchange'].value == 'nyse'"}}}},
                "size": 1,
                "sort": []
            }"#,
        ),
        // where GT condition
        (
            "select * from symbol where last_sale > 985 limit 1",
            r#"{
                "from": 0,
                "query": {"bool": {"filter": {"script": {"script": "doc['last_sale'].value > 985"}}}},
                "size": 1,
                "sort": []
            }"#,
        ),
        // where NEQ condition
        (
            "select * from symbol where last_sale != 985 limit 1",
            r#"{
                "from": 0,
                "query": {"bool": {"filter": {"script": {"script": "doc['last_sale'].value != 985"}}}},
                "size": 1,
                "sort": []
            }"#,
        ),
        // where AND condition
        (
            "select * from symbol where exchange='nyse' and sector='Technology' limit 3",
            r#"{
                "from": 0,
                "query": {"bool": {"filter": {"script": {
                    "script": "doc['exchange'].value == 'nyse' && doc['sector'].value == 'Technology'"
                }}}},
                "size": 3,
                "sort": []
            }"#,
        ),
        // where OR condition
        (
            "select * from symbol where exchange='nyse' OR sector!='Technology' limit 1",
            r#"{
                "from": 0,
                "query": {"bool": {"filter": {"script": {
                    "script": "doc['exchange'].value == 'nyse' || doc['sector'].value != 'Technology'"
                }}}},
                "size": 1,
                "sort": []
            }"#,
        ),
        // condition field with @
        (
            "select * from quote where @timestamp > 1482908284586 limit 1",
            r#"{
                "from": 0,
                "query": {"bool": {"filter": {"script": {
                    "script": "doc['@timestamp'].value > 1482908284586"
                }}}},
                "size": 1,
                "sort": []
            }"#,
        ),
        // count(*) metric
        (
            "select count(*) from quote",
            r#"{"aggs": {}, "from": 0, "size": 0, "sort": []}"#,
        ),
        // count(field) metric
        (
            "select count(ipo_year) from symbol",
            r#"{
                "aggs": {"count(ipo_year)": {"value_count": {"field": "ipo_year"}}},
                "from": 0, "size": 0, "sort": []
            }"#,
        ),
        // count(field) metric with alias
        (
            "select count(ipo_year) AS xx from symbol",
            r#"{
                "aggs": {"xx": {"value_count": {"field": "ipo_year"}}},
                "from": 0, "size": 0, "sort": []
            }"#,
        ),
        // cardinality metric
        (
            "select cardinality(ipo_year) from symbol",
            r#"{
                "aggs": {"cardinality(ipo_year)": {"cardinality": {"field": "ipo_year"}}},
                "from": 0, "size": 0, "sort": []
            }"#,
        ),
        // sum metric
        (
            "select sum(market_cap) from symbol",
            r#"{
                "aggs": {"sum(market_cap)": {"sum": {"field": "market_cap"}}},
                "from": 0, "size": 0, "sort": []
            }"#,
        ),
        // metric plus filter
        (
            "select sum(market_cap) from symbol where ipo_year=1998",
            r#"{
                "aggs": {"sum(market_cap)": {"sum": {"field": "market_cap"}}},
                "from": 0,
                "query": {"bool": {"filter": {"script": {"script": "doc['ipo_year'].value == 1998"}}}},
                "size": 0,
                "sort": []
            }"#,
        ),
        // count(*) with group by
        (
            "select exchange, count(*) from symbol group by exchange",
            r#"{
                "aggs": {"exchange": {
                    "aggs": {},
                    "terms": {"field": "exchange", "size": 0}
                }},
                "query": {"bool": {"filter": {"and": [{"exists": {"field": "exchange"}}]}}},
                "size": 0
            }"#,
        ),
        // group by scripted function
        (
            "SELECT shares_count, COUNT(*) FROM symbol \
             GROUP BY floor(market_cap / last_sale / 1000000) AS shares_count \
             ORDER BY shares_count LIMIT 3",
            r#"{
                "aggs": {"shares_count": {
                    "aggs": {},
                    "terms": {
                        "order": [{"_term": "asc"}],
                        "script": {
                            "inline": "floor(doc['market_cap'].value / doc['last_sale'].value / 1000000)",
                            "lang": "expression"
                        },
                        "size": 3
                    }
                }},
                "query": {"bool": {"filter": {"and": [
                    {"exists": {"field": "market_cap"}},
                    {"exists": {"field": "last_sale"}}
                ]}}},
                "size": 0
            }"#,
        ),
        // histogram bucket
        (
            "select ipo_year_range, count(*) from symbol group by histogram(ipo_year, 5) as ipo_year_range",
            r#"{
                "aggs": {"ipo_year_range": {
                    "aggs": {},
                    "histogram": {"field": "ipo_year", "interval": "5", "min_doc_count": 0}
                }},
                "query": {"bool": {"filter": {"and": [{"exists": {"field": "ipo_year"}}]}}},
                "size": 0
            }"#,
        ),
        // date_histogram bucket
        (
            "select year, max(adj_close) from quote where symbol='AAPL' group by date_histogram('@timestamp','1y') as year",
            r#"{
                "aggs": {"year": {
                    "aggs": {"max(adj_close)": {"max": {"field": "adj_close"}}},
                    "date_histogram": {"field": "@timestamp", "interval": "1y"}
                }},
                "query": {"bool": {"filter": {"script": {"script": "doc['symbol'].value == 'AAPL'"}}}},
                "size": 0
            }"#,
        ),
        // range bucket
        (
            "SELECT ipo_year_range, COUNT(*) FROM symbol GROUP BY range(ipo_year, 1980, 1990, 2000) AS ipo_year_range",
            r#"{
                "aggs": {"ipo_year_range": {
                    "aggs": {},
                    "range": {
                        "field": "ipo_year",
                        "keyed": true,
                        "ranges": [
                            {"to": "1980"},
                            {"from": "1980", "to": "1990"},
                            {"from": "1990", "to": "2000"},
                            {"from": "2000"}
                        ]
                    }
                }},
                "query": {"bool": {"filter": {"and": [{"exists": {"field": "ipo_year"}}]}}},
                "size": 0
            }"#,
        ),
        // metric inside group by
        (
            "select exchange, max(market_cap) from symbol group by exchange",
            r#"{
                "aggs": {"exchange": {
                    "aggs": {"max(market_cap)": {"max": {"field": "market_cap"}}},
                    "terms": {"field": "exchange", "size": 0}
                }},
                "query": {"bool": {"filter": {"and": [{"exists": {"field": "exchange"}}]}}},
                "size": 0
            }"#,
        ),
        // nested multi-dimension group by
        (
            "select exchange, sector, max(market_cap) from symbol group by exchange, sector",
            r#"{
                "aggs": {"exchange": {
                    "aggs": {"sector": {
                        "aggs": {"max(market_cap)": {"max": {"field": "market_cap"}}},
                        "terms": {"field": "sector", "size": 0}
                    }},
                    "terms": {"field": "exchange", "size": 0}
                }},
                "query": {"bool": {"filter": {"and": [
                    {"exists": {"field": "exchange"}},
                    {"exists": {"field": "sector"}}
                ]}}},
                "size": 0
            }"#,
        ),
        // metric over an expression
        (
            "select exchange, sum(ipo_year+last_sale) from symbol group by exchange",
            r#"{
                "aggs": {"exchange": {
                    "aggs": {"sum(ipo_year + last_sale)": {
                        "sum": {"script": "doc['ipo_year'].value + doc['last_sale'].value"}
                    }},
                    "terms": {"field": "exchange", "size": 0}
                }},
                "query": {"bool": {"filter": {"and": [{"exists": {"field": "exchange"}}]}}},
                "size": 0
            }"#,
        ),
        // group by field expression
        (
            "SELECT ipo_year_rem, COUNT(*) FROM symbol GROUP BY ipo_year % 5 AS ipo_year_rem",
            r#"{
                "aggs": {"ipo_year_rem": {
                    "aggs": {},
                    "terms": {"script": "doc['ipo_year'].value % 5", "size": 0}
                }},
                "query": {"bool": {"filter": {"and": [{"exists": {"field": "ipo_year"}}]}}},
                "size": 0
            }"#,
        ),
        // order by the group key
        (
            "SELECT ipo_year, COUNT(*) FROM symbol GROUP BY ipo_year ORDER BY ipo_year LIMIT 3",
            r#"{
                "aggs": {"ipo_year": {
                    "aggs": {},
                    "terms": {"field": "ipo_year", "order": [{"_term": "asc"}], "size": 3}
                }},
                "query": {"bool": {"filter": {"and": [{"exists": {"field": "ipo_year"}}]}}},
                "size": 0
            }"#,
        ),
        // order by a count(*) alias
        (
            "SELECT ipo_year, COUNT(*) AS ipo_count FROM symbol GROUP BY ipo_year ORDER BY ipo_count LIMIT 2",
            r#"{
                "aggs": {"ipo_year": {
                    "aggs": {},
                    "terms": {"field": "ipo_year", "order": [{"_count": "asc"}], "size": 2}
                }},
                "query": {"bool": {"filter": {"and": [{"exists": {"field": "ipo_year"}}]}}},
                "size": 0
            }"#,
        ),
        // order by a metric name
        (
            "SELECT ipo_year, MAX(market_cap) AS max_market_cap FROM symbol GROUP BY ipo_year ORDER BY max_market_cap LIMIT 2",
            r#"{
                "aggs": {"ipo_year": {
                    "aggs": {"max_market_cap": {"max": {"field": "market_cap"}}},
                    "terms": {"field": "ipo_year", "order": [{"max_market_cap": "asc"}], "size": 2}
                }},
                "query": {"bool": {"filter": {"and": [{"exists": {"field": "ipo_year"}}]}}},
                "size": 0
            }"#,
        ),
        // having over the doc count
        (
            "SELECT ipo_year, COUNT(*) AS ipo_count FROM symbol GROUP BY ipo_year HAVING ipo_count > 200",
            r#"{
                "aggs": {"ipo_year": {
                    "aggs": {"having": {"bucket_selector": {
                        "buckets_path": {"ipo_count": "_count"},
                        "script": {"inline": "ipo_count > 200", "lang": "expression"}
                    }}},
                    "terms": {"field": "ipo_year", "size": 0}
                }},
                "query": {"bool": {"filter": {"and": [{"exists": {"field": "ipo_year"}}]}}},
                "size": 0
            }"#,
        ),
        // having over doc count and a metric
        (
            "SELECT ipo_year, COUNT(*) AS ipo_count, MAX(last_sale) AS max_last_sale FROM symbol \
             GROUP BY ipo_year HAVING ipo_count > 100 AND max_last_sale <= 10000",
            r#"{
                "aggs": {"ipo_year": {
                    "aggs": {
                        "having": {"bucket_selector": {
                            "buckets_path": {"ipo_count": "_count", "max_last_sale": "max_last_sale"},
                            "script": {
                                "inline": "ipo_count > 100 && max_last_sale <= 10000",
                                "lang": "expression"
                            }
                        }},
                        "max_last_sale": {"max": {"field": "last_sale"}}
                    },
                    "terms": {"field": "ipo_year", "size": 0}
                }},
                "query": {"bool": {"filter": {"and": [{"exists": {"field": "ipo_year"}}]}}},
                "size": 0
            }"#,
        ),
        // pipeline aggregation sharing a metric
        (
            "select exchange, sum(ipo_year), sum(ipo_year)/sum(last_sale) AS yyyy from symbol group by exchange",
            r#"{
                "aggs": {"exchange": {
                    "aggs": {
                        "sum(ipo_year)": {"sum": {"field": "ipo_year"}},
                        "sum(last_sale)": {"sum": {"field": "last_sale"}},
                        "yyyy": {"bucket_script": {
                            "buckets_path": {"path0": "sum(ipo_year)", "path1": "sum(last_sale)"},
                            "script": {"inline": "path0 / path1", "lang": "expression"}
                        }}
                    },
                    "terms": {"field": "exchange", "size": 0}
                }},
                "query": {"bool": {"filter": {"and": [{"exists": {"field": "exchange"}}]}}},
                "size": 0
            }"#,
        ),
        // pipeline aggregation over scripted metrics
        (
            "select exchange, sum(ipo_year), sum(ipo_year*2)/avg(last_sale) AS yyyy from symbol group by exchange",
            r#"{
                "aggs": {"exchange": {
                    "aggs": {
                        "avg(last_sale)": {"avg": {"field": "last_sale"}},
                        "sum(ipo_year * 2)": {"sum": {"script": "doc['ipo_year'].value * 2"}},
                        "sum(ipo_year)": {"sum": {"field": "ipo_year"}},
                        "yyyy": {"bucket_script": {
                            "buckets_path": {"path0": "sum(ipo_year * 2)", "path1": "avg(last_sale)"},
                            "script": {"inline": "path0 / path1", "lang": "expression"}
                        }}
                    },
                    "terms": {"field": "exchange", "size": 0}
                }},
                "query": {"bool": {"filter": {"and": [{"exists": {"field": "exchange"}}]}}},
                "size": 0
            }"#,
        ),
        // pipeline aggregation mixing field and script metrics
        (
            "select exchange, sum(ipo_year), sum(ipo_year+last_sale)/sum(last_sale) AS yyyy from symbol group by exchange",
            r#"{
                "aggs": {"exchange": {
                    "aggs": {
                        "sum(ipo_year + last_sale)": {
                            "sum": {"script": "doc['ipo_year'].value + doc['last_sale'].value"}
                        },
                        "sum(ipo_year)": {"sum": {"field": "ipo_year"}},
                        "sum(last_sale)": {"sum": {"field": "last_sale"}},
                        "yyyy": {"bucket_script": {
                            "buckets_path": {"path0": "sum(ipo_year + last_sale)", "path1": "sum(last_sale)"},
                            "script": {"inline": "path0 / path1", "lang": "expression"}
                        }}
                    },
                    "terms": {"field": "exchange", "size": 0}
                }},
                "query": {"bool": {"filter": {"and": [{"exists": {"field": "exchange"}}]}}},
                "size": 0
            }"#,
        ),
        // pipeline aggregation with a leading minus
        (
            "select  -5*sum(ipo_year+last_sale*2)  AS yyyy from symbol group by exchange",
            r#"{
                "aggs": {"exchange": {
                    "aggs": {
                        "sum(ipo_year + last_sale * 2)": {
                            "sum": {"script": "doc['ipo_year'].value + doc['last_sale'].value * 2"}
                        },
                        "yyyy": {"bucket_script": {
                            "buckets_path": {"path0": "sum(ipo_year + last_sale * 2)"},
                            "script": {"inline": "0 - 5 * path0", "lang": "expression"}
                        }}
                    },
                    "terms": {"field": "exchange", "size": 0}
                }},
                "query": {"bool": {"filter": {"and": [{"exists": {"field": "exchange"}}]}}},
                "size": 0
            }"#,
        ),
        // count distinct becomes cardinality
        (
            "select count(distinct(sector)) from symbol",
            r#"{
                "aggs": {"count(distinct(sector))": {"cardinality": {"field": "sector"}}},
                "from": 0, "size": 0, "sort": []
            }"#,
        ),
        // set membership keeps its list in the filter script
        (
            "select * from symbol where exchange in ['nyse', 'nasdaq'] limit 2",
            r#"{
                "from": 0,
                "query": {"bool": {"filter": {"script": {
                    "script": "doc['exchange'].value IN ['nyse', 'nasdaq']"
                }}}},
                "size": 2,
                "sort": []
            }"#,
        ),
    ];

    for (i, (sql, expected)) in tests.iter().enumerate() {
        let dsl = compile(sql).unwrap_or_else(|e| panic!("{}. {}: error: {}", i, sql, e));
        let expected: Value =
            serde_json::from_str(expected).unwrap_or_else(|e| panic!("{}. bad expectation: {}", i, e));
        assert_eq!(expected, dsl, "{}. {}\n\ndsl mismatch", i, sql);
    }
}
