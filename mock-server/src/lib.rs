use axum::{
    body::Bytes,
    extract::Path,
    http::{header, HeaderMap, Method, StatusCode},
    response::{AppendHeaders, IntoResponse},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// What `/inspect` saw of the incoming request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Inspection {
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body_len: usize,
}

pub fn app() -> Router {
    Router::new()
        .route("/status/{code}", any(status))
        .route("/echo", any(echo))
        .route("/inspect", any(inspect))
        .route("/hello/{name}", get(hello))
        .route("/bytes/{len}", get(bytes))
        .route("/cookies", get(cookies))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, format!("status {code}")))
}

async fn echo(method: Method, body: Bytes) -> impl IntoResponse {
    ([("x-echo-method", method.to_string())], body)
}

async fn inspect(method: Method, headers: HeaderMap, body: Bytes) -> Json<Inspection> {
    let headers = headers
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_string(),
                String::from_utf8_lossy(v.as_bytes()).into_owned(),
            )
        })
        .collect();
    Json(Inspection {
        method: method.to_string(),
        headers,
        body_len: body.len(),
    })
}

async fn hello(Path(name): Path<String>) -> String {
    format!("hello {name}")
}

/// `len` bytes cycling through 0..=255, so embedded NULs are always present.
async fn bytes(Path(len): Path<usize>) -> Vec<u8> {
    (0..len).map(|i| (i % 256) as u8).collect()
}

async fn cookies() -> impl IntoResponse {
    (
        AppendHeaders([
            (header::SET_COOKIE, "a=1"),
            (header::HeaderName::from_static("x-mid"), "1"),
            (header::SET_COOKIE, "b=2"),
        ]),
        "cookies",
    )
}
