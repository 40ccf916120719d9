//! Routing module
//!
//! Provides path-pattern routing:
//! - Pattern normalization and `:param` segments
//! - An insertion-ordered route table
//! - First-match path resolution with parameter extraction

mod matcher;
mod pattern;
mod table;

pub use matcher::{find_route, RouteMatch};
pub use pattern::{namespace_of, normalize_path, RoutePattern, Segment};
pub use table::{RouteEntry, RouteTable};
