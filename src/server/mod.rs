/*!
HTTP facade over the compiler.

Routes:
- `GET /?sql=…` and `POST /` (raw body) compile a statement and return a
  JSON envelope `{sql, dsl?, err?}`. Compile failures are part of the
  envelope with status 200; only a missing statement is a client error.
- `GET /health` and `GET /version` for probes.

Requests compile concurrently on independent tasks; the compiler shares
nothing between invocations.
*/

use std::collections::HashMap;
use std::io;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use log::info;
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;

use crate::sql;

/// Build the result envelope for one statement.
pub fn make_envelope(input: &str) -> Value {
    let mut envelope = Map::new();
    envelope.insert("sql".to_string(), json!(input));
    match sql::compile(input) {
        Ok(dsl) => {
            envelope.insert("dsl".to_string(), dsl);
        }
        Err(err) => {
            envelope.insert("err".to_string(), json!(err.to_string()));
        }
    }
    Value::Object(envelope)
}

async fn translate_get(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    match params.get("sql") {
        Some(input) if !input.is_empty() => {
            (StatusCode::OK, Json(make_envelope(input))).into_response()
        }
        _ => (StatusCode::BAD_REQUEST, "sql param error").into_response(),
    }
}

async fn translate_post(body: String) -> impl IntoResponse {
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, "empty request body").into_response();
    }
    (StatusCode::OK, Json(make_envelope(&body))).into_response()
}

async fn health() -> Json<Value> {
    Json(json!({ "health": "good" }))
}

async fn version() -> Json<Value> {
    Json(json!({ "version": sql::VERSION }))
}

fn router() -> Router {
    Router::new()
        .route("/", get(translate_get).post(translate_post))
        .route("/health", get(health))
        .route("/version", get(version))
}

/// Bind and serve until the process exits.
pub async fn serve(listen: &str) -> io::Result<()> {
    let listener = TcpListener::bind(listen).await?;
    info!("http listening on {}", listen);
    axum::serve(listener, router()).await.map_err(io::Error::other)
}
