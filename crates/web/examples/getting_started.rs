use serde::{Deserialize, Serialize};
use switchyard_http::protocol::{HandlerError, Request, StatusCode};
use switchyard_web::converter::{Json, JsonConverter, read_body};
use switchyard_web::router::{Router, get, post};
use switchyard_web::{Server, ServerConfig, handler_fn};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Deserialize, Serialize)]
pub struct User {
    name: String,
    zip: String,
}

// curl -v http://127.0.0.1:8080/hello/john%20doe?greeting=hi
async fn hello(request: Request) -> String {
    let name = request.path_param("name").unwrap_or("stranger");
    let greeting = request.query().get("greeting").unwrap_or("hello");
    format!("{greeting}, {name}\r\n")
}

// curl -v -H 'Content-Type: application/json' -d '{"name":"hello","zip":"world"}' http://127.0.0.1:8080/users
async fn create_user(request: Request) -> Result<(StatusCode, Json<User>), HandlerError> {
    let user: User = read_body(&JsonConverter, &request)?;
    info!(?user, "receive user");
    Ok((StatusCode::CREATED, Json(user)))
}

// curl -v http://127.0.0.1:8080/users/abc
async fn get_user(request: Request) -> Result<String, HandlerError> {
    let id = request.path_param("id").unwrap_or_default();
    let id = id.parse::<u32>().map_err(|_| HandlerError::bad_request(format!("user id must be a number, got {id:?}")))?;
    Ok(format!("user {id}\r\n"))
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let router = Router::builder()
        .route("/hello/:name", get(handler_fn(hello)))
        .route("/users", post(handler_fn(create_user)))
        .route("/users/:id", get(handler_fn(get_user)))
        // curl -v http://127.0.0.1:8080/static/
        .files("/static", std::env::current_dir().expect("current dir should be readable"))
        .build()
        .expect("routes should be valid");

    let config = ServerConfig { bind: "127.0.0.1:8080".to_string(), max_body_bytes: 64 * 1024, ..ServerConfig::default() };
    let server = Server::builder().config(config).router(router).build().expect("server config should be valid");
    if let Err(e) = server.run().await {
        error!(cause = %e, "server stopped with error");
    }
}
