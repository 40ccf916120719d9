//! Route pattern module
//!
//! Normalizes raw path strings and splits them into literal and parameter segments.

/// One segment of a route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the request segment exactly
    Literal(String),
    /// `:name`, binds any non-empty request segment
    Param(String),
}

/// A normalized route path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    key: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Build a pattern from a raw path, normalizing it first
    pub fn parse(raw: &str) -> Self {
        let key = normalize_path(raw);
        let segments = key
            .split('/')
            .map(|part| match part.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(part.to_string()),
            })
            .collect();

        Self { key, segments }
    }

    /// Normalized string form, used as the route table key
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// A pattern is static iff it has no parameter segment
    pub fn is_static(&self) -> bool {
        !self
            .segments
            .iter()
            .any(|segment| matches!(segment, Segment::Param(_)))
    }
}

/// Ensure a leading `/` and strip exactly one trailing `/`.
///
/// The root path stays `/` so that it remains a usable key.
/// No case folding or percent-decoding is applied.
pub fn normalize_path(raw: &str) -> String {
    let mut path = if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{raw}")
    };

    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }

    path
}

/// First segment after the leading slash (`/blog/post/1` -> `blog`).
///
/// Returns `None` for the root path and for paths with an empty first segment.
pub fn namespace_of(path: &str) -> Option<&str> {
    path.strip_prefix('/')
        .unwrap_or(path)
        .split('/')
        .next()
        .filter(|segment| !segment.is_empty())
}
