use esdsl::server::make_envelope;
use esdsl::sql::{compile, SqlError};

/// Compiling the same statement twice produces equal JSON values.
#[test]
fn test_compile_is_idempotent() {
    let inputs = vec![
        "SELECT * FROM symbol LIMIT 5",
        "SELECT sum(market_cap) FROM symbol WHERE ipo_year=1998",
        "SELECT exchange, max(market_cap) FROM symbol GROUP BY exchange",
        "SELECT ipo_year, COUNT(*) AS ipo_count FROM symbol GROUP BY ipo_year HAVING ipo_count > 200",
    ];
    for input in inputs {
        let first = compile(input).unwrap();
        let second = compile(input).unwrap();
        assert_eq!(first, second, "{}", input);
    }
}

#[test]
fn test_compile_rejects_non_select() {
    let err = compile("UPDATE symbol SET x = 1").unwrap_err();
    assert!(matches!(err, SqlError::Parse { .. }));
    assert_eq!(
        err.to_string(),
        "found UPDATE, expected SELECT at line 1, char 1"
    );
}

#[test]
fn test_compile_surfaces_lex_errors() {
    let err = compile("SELECT * FROM symbol WHERE name = 'unterminated").unwrap_err();
    assert!(matches!(err, SqlError::Parse { .. }));

    let err = compile("SELECT ! FROM symbol").unwrap_err();
    assert_eq!(
        err.to_string(),
        "found !, expected identifier, string, number, bool at line 1, char 8"
    );
}

#[test]
fn test_compile_reports_semantic_errors_without_position() {
    let err = compile("SELECT value > 2 FROM cpu").unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid operator > in SELECT field, only support +-*/"
    );

    let err = compile("SELECT * FROM cpu WHERE max(value) > 2").unwrap_err();
    assert_eq!(err.to_string(), "invalid filter, unsupported function max");
}

#[test]
fn test_envelope_shape() {
    let ok = make_envelope("SELECT * FROM symbol LIMIT 5");
    assert_eq!(ok["sql"], "SELECT * FROM symbol LIMIT 5");
    assert_eq!(ok["dsl"]["from"], 0);
    assert_eq!(ok["dsl"]["size"], 5);
    assert!(ok.get("err").is_none());

    let bad = make_envelope("not sql");
    assert_eq!(bad["sql"], "not sql");
    assert!(bad.get("dsl").is_none());
    assert_eq!(bad["err"], "found not, expected SELECT at line 1, char 1");
}

/// Positions in messages are one-based even on later lines.
#[test]
fn test_compile_positions_are_one_based() {
    let err = compile("SELECT a\nFROM").unwrap_err();
    assert_eq!(
        err.to_string(),
        "found EOF, expected identifier at line 2, char 5"
    );
}
