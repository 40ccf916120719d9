//! HTTP protocol layer module
//!
//! Request/response types exchanged between the dispatcher, handlers and
//! middleware, plus the builders that turn them into hyper responses.

pub mod request;
pub mod response;

// Re-export commonly used types
pub use request::{parse_query, Params, Query, Request};
pub use response::{
    build_405_response, build_payload_response, jsonp_body, payload_to_body, HttpResponse,
    Response,
};
