// Server loop module
// Accepts connections and hands each one to the connection handler

use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::{handle_connection, ConnectionSettings};
use crate::app::Router;
use crate::logger;

/// Accept connections forever.
///
/// Accept failures (for example descriptor exhaustion) are logged and the
/// loop keeps going. Must be run inside a `LocalSet`.
pub async fn serve(
    listener: TcpListener,
    router: Arc<Router>,
    settings: ConnectionSettings,
) -> crate::Result<()> {
    let settings = Arc::new(settings);

    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                logger::log_debug(&format!("Accepted connection from {peer_addr}"));
                handle_connection(
                    stream,
                    peer_addr,
                    Arc::clone(&router),
                    Arc::clone(&settings),
                );
            }
            Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
        }
    }
}
