//! Middleware chain module
//!
//! Middleware run in registration order each time a response is sent. Each one
//! receives the shared request/response handles and a [`Next`] continuation;
//! the chain only advances when `Next::run` is called. Dropping `Next` without
//! running it halts the chain and the response is never written.

use std::fmt;
use std::sync::Arc;

use crate::http::{Request, Response};

/// A middleware function: `(request, response, next)`
pub type Middleware = Arc<dyn Fn(Arc<Request>, Response, Next) + Send + Sync>;

/// Final step invoked once every middleware has advanced
pub type ChainEnd = Box<dyn FnOnce(Arc<Request>, Response) + Send>;

/// Ordered, append-only middleware list shared by all routes
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    stack: Arc<Vec<Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, middleware: Middleware) {
        Arc::make_mut(&mut self.stack).push(middleware);
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Run the whole chain, then `end`, with the same request/response handles
    pub fn run(&self, request: Arc<Request>, response: Response, end: ChainEnd) {
        run_from(Arc::clone(&self.stack), 0, request, response, end);
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.stack.len())
            .finish()
    }
}

/// Continuation handed to each middleware.
///
/// Holds the original arguments, so later middleware always see the same
/// request/response handles regardless of what earlier ones did.
pub struct Next {
    stack: Arc<Vec<Middleware>>,
    position: usize,
    request: Arc<Request>,
    response: Response,
    end: ChainEnd,
}

impl Next {
    /// Advance to the next middleware (or the end of the chain)
    pub fn run(self) {
        run_from(self.stack, self.position, self.request, self.response, self.end);
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("position", &self.position)
            .field("remaining", &self.stack.len().saturating_sub(self.position))
            .finish_non_exhaustive()
    }
}

fn run_from(
    stack: Arc<Vec<Middleware>>,
    position: usize,
    request: Arc<Request>,
    response: Response,
    end: ChainEnd,
) {
    let Some(middleware) = stack.get(position).cloned() else {
        end(request, response);
        return;
    };

    let next = Next {
        stack,
        position: position + 1,
        request: Arc::clone(&request),
        response: response.clone(),
        end,
    };
    middleware(request, response, next);
}
