//! route99
//!
//! A minimal GET-only JSON/JSONP router. Handlers are registered per path
//! pattern (`/post/:id`), grouped into modules mounted at a base path, and
//! wrapped by a middleware chain that runs just before each response is
//! written. Each module namespace may carry a one-shot `before` hook that
//! runs on the first request into it.

pub mod app;
pub mod config;
pub mod error;
pub mod http;
pub mod logger;
pub mod routing;
pub mod server;

pub use app::{Done, Environment, Module, Next, Router};
pub use config::Config;
pub use error::{Error, Result};
pub use http::{Request, Response};
