use switchyard_http::protocol::Request;
use switchyard_web::router::{Router, get};
use switchyard_web::{Server, handler_fn};
use tracing::{Level, error};
use tracing_subscriber::FmtSubscriber;

async fn hello_world(_request: Request) -> &'static str {
    "hello world"
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let router = Router::builder().route("/", get(handler_fn(hello_world))).build().expect("routes should be valid");

    let server = Server::builder().router(router).bind("127.0.0.1:3000").build().expect("server config should be valid");
    if let Err(e) = server.run().await {
        error!(cause = %e, "server stopped with error");
    }
}
