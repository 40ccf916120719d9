//! Route matching module
//!
//! Scans the route table in registration order and returns the first
//! structural match. No specificity ranking: a parameterized pattern
//! registered before a colliding static one wins.

use super::pattern::{normalize_path, Segment};
use super::table::RouteTable;
use crate::http::Params;

/// A matched handler plus the parameters bound from the path
#[derive(Debug)]
pub struct RouteMatch<'a, H> {
    pub handler: &'a H,
    pub params: Params,
}

/// Find the first route matching `request_path`.
///
/// Static patterns compare against the normalized request path. Parameterized
/// patterns compare the raw `/`-split segments, so a trailing slash adds an
/// empty segment that never satisfies a parameter slot.
pub fn find_route<'a, H>(request_path: &str, table: &'a RouteTable<H>) -> Option<RouteMatch<'a, H>> {
    let normalized = normalize_path(request_path);
    let request_segments: Vec<&str> = request_path.split('/').collect();

    table.iter().find_map(|entry| {
        if entry.pattern.is_static() {
            return (entry.pattern.key() == normalized).then(|| RouteMatch {
                handler: &entry.handler,
                params: Params::new(),
            });
        }

        match_segments(entry.pattern.segments(), &request_segments).map(|params| RouteMatch {
            handler: &entry.handler,
            params,
        })
    })
}

/// Segment-by-segment comparison; params are only returned on a full match
fn match_segments(pattern: &[Segment], request: &[&str]) -> Option<Params> {
    if pattern.len() != request.len() {
        return None;
    }

    let mut params = Params::new();
    for (segment, value) in pattern.iter().zip(request) {
        match segment {
            Segment::Literal(literal) => {
                if literal != value {
                    return None;
                }
            }
            Segment::Param(name) => {
                if value.is_empty() {
                    return None;
                }
                params.insert(name.clone(), (*value).to_string());
            }
        }
    }

    Some(params)
}
