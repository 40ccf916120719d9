//! Application module
//!
//! The router and the per-request machinery it drives: middleware chain,
//! one-shot before-init hooks, and the shared environment.

mod before;
mod env;
mod middleware;
mod router;

pub use before::{BeforeHook, BeforeRegistry, Continuation, Done};
pub use env::Environment;
pub use middleware::{ChainEnd, Middleware, MiddlewareChain, Next};
pub use router::{Handler, Module, RoutePaths, Router};
