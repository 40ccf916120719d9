// Server module entry
// Binds the loopback listener and runs the accept loop on a LocalSet

pub mod connection;
pub mod listener;

// `loop` is a keyword, so the module is named server_loop
#[path = "loop.rs"]
pub mod server_loop;

pub use connection::ConnectionSettings;
pub use listener::create_listener;
pub use server_loop::serve;

use std::sync::Arc;
use tokio::task::LocalSet;

use crate::app::Router;
use crate::config::Config;
use crate::error::Error;
use crate::logger;

/// Initialize logging, bind `127.0.0.1:<port>` and serve `router` forever.
///
/// # Returns
///
/// * `Err(Error::Logger)` - A configured log file could not be opened
/// * `Err(Error::Bind)` - The port is unavailable
///
/// Once bound it only returns if the accept loop does, which it never does.
pub async fn listen(router: Arc<Router>, config: Config) -> crate::Result<()> {
    logger::init(&config.logging).map_err(Error::Logger)?;

    let addr = config.socket_addr();
    let listener = create_listener(addr).map_err(|source| Error::Bind { addr, source })?;
    let bound = listener.local_addr()?;

    logger::log_server_start(&bound, &config, router.routes().keys());

    let settings = ConnectionSettings::from_config(&config);
    LocalSet::new()
        .run_until(serve(listener, router, settings))
        .await
}
