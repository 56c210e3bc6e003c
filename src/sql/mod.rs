/*!
# SQL → Elasticsearch DSL compiler

This module implements the complete compilation pipeline from a restricted
SQL dialect to an Elasticsearch Query DSL document:

1. **Scanning** — `parser::lexer` converts text into positioned tokens
2. **Parsing** — `parser` builds a `SelectStatement` AST by recursive
   descent with precedence-climbing expressions
3. **Validation** — `validator` enforces the structural rules the grammar
   cannot express
4. **Rewriting** — `rewrite` decorates field accesses for the target's
   inline-script dialect
5. **Emission** — `translator` produces the final JSON document

## Supported grammar

```sql
SELECT fields FROM source
[WHERE condition]
[GROUP BY dimensions]
[HAVING condition]
[ORDER BY sorts]
[LIMIT n[, offset]]
```

## Example

```rust,no_run
let dsl = esdsl::sql::compile("SELECT count(*) FROM quote")?;
println!("{}", dsl);
# Ok::<(), esdsl::sql::SqlError>(())
```

Compilation is synchronous and shares no state between invocations; the
compile function may be called from any thread.
*/

pub mod ast;
pub mod error;
pub mod parser;
pub mod rewrite;
pub mod translator;
pub mod validator;

// Re-export main API
pub use ast::SelectStatement;
pub use error::{SqlError, SqlResult};
pub use parser::Parser;

use serde_json::Value;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compile a statement into its Elasticsearch DSL document.
///
/// Parsing, validation, rewriting and emission run in order; the first
/// error aborts the compile.
pub fn compile(sql: &str) -> SqlResult<Value> {
    let mut stmt = Parser::parse_statement(sql)?;
    rewrite::rewrite_statement(&mut stmt);
    translator::es_dsl(&stmt)
}
