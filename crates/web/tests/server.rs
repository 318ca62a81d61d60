use indoc::indoc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use switchyard_http::protocol::{HandlerError, Request, Response, StatusCode};
use switchyard_web::converter::{JsonConverter, Json, read_body};
use switchyard_web::router::{Router, get, post};
use switchyard_web::{Server, ServerConfig, ServerHandle, handler_fn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

async fn hello(_request: Request) -> Response {
    Response::ok().with_body("hello").header(switchyard_http::protocol::Header::from_static("Content-Type", "text/plain"))
}

async fn greet(request: Request) -> String {
    format!("{}|{}", request.path_param("name").unwrap_or("?"), request.query().get("query").unwrap_or("-"))
}

async fn param_x(request: Request) -> String {
    format!("param [{}]", request.path_param("x").unwrap_or("?"))
}

async fn fixed(_request: Request) -> &'static str {
    "fixed"
}

async fn explode(_request: Request) -> Result<Response, HandlerError> {
    Err(HandlerError::internal("storage is gone"))
}

#[derive(Debug, Serialize, Deserialize)]
struct Sum {
    a: i64,
    b: i64,
}

async fn sum(request: Request) -> Result<Json<i64>, HandlerError> {
    let Sum { a, b } = read_body(&JsonConverter, &request)?;
    Ok(Json(a + b))
}

async fn start() -> ServerHandle {
    let router = Router::builder()
        .route("/hello", get(handler_fn(hello)))
        .route("/greet/:name", get(handler_fn(greet)))
        .route("/a/:x", get(handler_fn(param_x)))
        .route("/a/fixed", get(handler_fn(fixed)))
        .route("/a/:x/b", get(handler_fn(param_x)))
        .route("/users/:id", get(handler_fn(fixed)))
        .route("/users/:id", post(handler_fn(fixed)))
        .route("/explode", get(handler_fn(explode)))
        .route("/sum", post(handler_fn(sum)))
        .build()
        .unwrap();

    let config = ServerConfig { server_name: "switchyard-test".to_string(), ..ServerConfig::default() };
    Server::builder().config(config).bind("127.0.0.1:0").router(router).build().unwrap().start().await.unwrap()
}

async fn send(handle: &ServerHandle, request: &str) -> String {
    let mut stream = TcpStream::connect(handle.local_addr()).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response)).await.unwrap().unwrap();
    String::from_utf8(response).unwrap()
}

fn split_response(response: &str) -> (Vec<&str>, &str) {
    let (head, body) = response.split_once("\r\n\r\n").unwrap();
    (head.split("\r\n").collect(), body)
}

#[tokio::test]
async fn test_hello() {
    let handle = start().await;
    let response = send(&handle, "GET /hello HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

    let (head, body) = split_response(&response);
    assert_eq!(head[0], "HTTP/1.1 200 OK");
    assert_eq!(head[1], "Server: switchyard-test");
    assert!(head[2].starts_with("Date: ") && head[2].ends_with(" GMT"));
    assert_eq!(&head[3..], ["Content-Type: text/plain", "Content-Length: 5"]);
    assert_eq!(body, "hello");
}

#[tokio::test]
async fn test_path_param_and_query_are_decoded() {
    let handle = start().await;
    let response = send(&handle, "GET /greet/john%20doe?query=java%2Fscript HTTP/1.1\r\n\r\n").await;
    assert!(response.ends_with("\r\n\r\njohn doe|java/script"), "{response}");
}

#[tokio::test]
async fn test_encoded_literal_segment_is_routed() {
    let handle = start().await;
    let response = send(&handle, "GET /h%65llo HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.ends_with("\r\n\r\nhello"), "{response}");
}

#[tokio::test]
async fn test_first_match_wins_and_empty_segment() {
    let handle = start().await;
    let response = send(&handle, "GET /a/fixed HTTP/1.1\r\n\r\n").await;
    assert!(response.ends_with("param [fixed]"), "{response}");

    let response = send(&handle, "GET /a//b HTTP/1.1\r\n\r\n").await;
    assert!(response.ends_with("param []"), "{response}");
}

#[tokio::test]
async fn test_not_found_and_method_not_allowed() {
    let handle = start().await;

    let response = send(&handle, "DELETE /users/1 HTTP/1.1\r\n\r\n").await;
    let (head, body) = split_response(&response);
    assert_eq!(head[0], "HTTP/1.1 405 Method Not Allowed");
    assert!(head.contains(&"Allow: GET, POST"), "{response}");
    assert!(head.contains(&"Content-Length: 0"));
    assert!(body.is_empty());

    let response = send(&handle, "GET /teams/1 HTTP/1.1\r\n\r\n").await;
    let (head, body) = split_response(&response);
    assert_eq!(head[0], "HTTP/1.1 404 Not Found");
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_protocol_and_handler_errors() {
    let handle = start().await;

    let response = send(&handle, "FETCH /hello HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{response}");

    let response = send(&handle, "GET /explode HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"), "{response}");
    assert!(response.ends_with("\r\n\r\nstorage is gone"));
}

#[tokio::test]
async fn test_json_body() {
    let handle = start().await;
    let request = indoc! {"
        POST /sum HTTP/1.1\r
        Content-Type: application/json\r
        Content-Length: 14\r
        \r
        {\"a\":40,\"b\":2}"};
    let response = send(&handle, request).await;
    let (head, body) = split_response(&response);
    assert_eq!(head[0], "HTTP/1.1 200 OK");
    assert!(head.contains(&"Content-Type: application/json"));
    assert_eq!(body, "42");

    let request = "POST /sum HTTP/1.1\r\nContent-Length: 5\r\n\r\n{oops";
    let response = send(&handle, request).await;
    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{response}");
}

#[tokio::test]
async fn test_peer_closing_early_is_harmless() {
    let handle = start().await;
    drop(TcpStream::connect(handle.local_addr()).await.unwrap());

    let response = send(&handle, "GET /hello HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
}

#[tokio::test]
async fn test_stop() {
    let handle = start().await;
    let address = handle.local_addr();

    handle.stop();
    handle.stop();
    tokio::time::timeout(Duration::from_secs(5), handle.stopped()).await.unwrap();
    assert!(TcpStream::connect(address).await.is_err());
}

#[tokio::test]
async fn test_status_code_from_responder() {
    let router = Router::builder()
        .route("/created", post(handler_fn(|_request: Request| async { (StatusCode::CREATED, "made") })))
        .build()
        .unwrap();
    let handle = Server::builder().bind("127.0.0.1:0").router(router).build().unwrap().start().await.unwrap();

    let response = send(&handle, "POST /created HTTP/1.1\r\nContent-Length: 0\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 201 Created\r\n"));
    assert!(response.ends_with("\r\n\r\nmade"));
}
