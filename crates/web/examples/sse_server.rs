use std::time::Duration;
use switchyard_web::router::Router;
use switchyard_web::sse::{SseMessage, SseRegistry};
use switchyard_web::Server;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

// curl -N http://127.0.0.1:8080/clock
#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let registry = SseRegistry::new();
    let clock = registry.endpoint("/clock");
    clock.on_active_change(|active| info!(active, "clock listeners changed"));

    let router = Router::builder().sse("/clock", &clock).build().expect("routes should be valid");
    let handle = Server::builder().router(router).bind("127.0.0.1:8080").build().expect("server config should be valid").start().await;
    let handle = match handle {
        Ok(handle) => handle,
        Err(e) => {
            error!(cause = %e, "can't start server");
            return;
        }
    };

    let mut tick = 0u64;
    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        tick += 1;
        let delivered = registry.broadcast("/clock", |client| {
            SseMessage::data(format!("tick {tick} for client {}", client.id())).event("tick").id(tick.to_string())
        });
        if delivered > 0 {
            info!(tick, delivered, "broadcast");
        }
        if tick == 600 {
            break;
        }
    }

    handle.stop();
    handle.stopped().await;
}
