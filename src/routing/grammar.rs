//! Path grammar: file paths to URL patterns.
//!
//! # Responsibilities
//! - Classify path segments (static vs dynamic `[name]`)
//! - Elide index files (`a/b/index.rs` → `/a/b`)
//! - Render patterns in `:name` syntax
//! - Score patterns for match precedence
//!
//! # Design Decisions
//! - Every function here is pure: same input, same output, no I/O
//! - Precedence is a base-3 positional number so integer order equals
//!   lexicographic order of segment kinds (static > dynamic > absent)
//! - Exact shape ties are left to the resolver

use std::fmt;

/// Number of leading segments that contribute to precedence.
pub const MAX_RANKED_DEPTH: usize = 32;

const STATIC_WEIGHT: u64 = 2;
const DYNAMIC_WEIGHT: u64 = 1;

/// A single URL pattern segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Literal segment, matched verbatim.
    Static(String),
    /// Named capture matching exactly one path segment.
    Dynamic(String),
}

impl Segment {
    fn weight(&self) -> u64 {
        match self {
            Segment::Static(_) => STATIC_WEIGHT,
            Segment::Dynamic(_) => DYNAMIC_WEIGHT,
        }
    }
}

/// Classify one file-path segment.
///
/// `[id]` becomes a capture named `id`; anything else is literal.
pub fn classify_segment(segment: &str) -> Segment {
    match segment
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    {
        Some(name) if !name.is_empty() && !name.contains(['[', ']']) => {
            Segment::Dynamic(name.to_string())
        }
        _ => Segment::Static(segment.to_string()),
    }
}

/// A parsed URL pattern.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoutePattern {
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Build a pattern from already classified segments.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Parse a URL pattern string.
    ///
    /// Accepts `:name`, `{name}` and `[name]` captures so explicitly
    /// configured endpoints can use whichever syntax they were written in.
    pub fn parse(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if let Some(name) = s.strip_prefix(':').filter(|n| !n.is_empty()) {
                    Segment::Dynamic(name.to_string())
                } else if let Some(name) = s
                    .strip_prefix('{')
                    .and_then(|r| r.strip_suffix('}'))
                    .filter(|n| !n.is_empty())
                {
                    Segment::Dynamic(name.to_string())
                } else {
                    classify_segment(s)
                }
            })
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of the dynamic segments, in path order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Dynamic(name) => Some(name.as_str()),
            Segment::Static(_) => None,
        })
    }

    /// The pattern with capture names erased.
    ///
    /// Two routes with the same shape match exactly the same paths.
    pub fn shape(&self) -> String {
        render(&self.segments, |_| ":".to_string())
    }

    /// Precedence score; higher matches first.
    pub fn precedence(&self) -> u64 {
        precedence(&self.segments)
    }

    /// Match already split path segments, returning captured values.
    pub fn capture<'p>(&self, path: &[&'p str]) -> Option<Vec<(String, &'p str)>> {
        if path.len() != self.segments.len() {
            return None;
        }

        let mut captures = Vec::new();
        for (segment, actual) in self.segments.iter().zip(path) {
            match segment {
                Segment::Static(expected) if expected == actual => {}
                Segment::Static(_) => return None,
                Segment::Dynamic(name) => captures.push((name.clone(), *actual)),
            }
        }
        Some(captures)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(&self.segments, |name| format!(":{}", name)))
    }
}

fn render(segments: &[Segment], dynamic: impl Fn(&str) -> String) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }

    segments.iter().fold(String::new(), |mut out, segment| {
        out.push('/');
        match segment {
            Segment::Static(s) => out.push_str(s),
            Segment::Dynamic(name) => out.push_str(&dynamic(name)),
        }
        out
    })
}

/// Compute the precedence score for a segment list.
///
/// Each of the first [`MAX_RANKED_DEPTH`] segments contributes its weight
/// times `3^(MAX_RANKED_DEPTH - 1 - depth)`.
pub fn precedence(segments: &[Segment]) -> u64 {
    segments
        .iter()
        .take(MAX_RANKED_DEPTH)
        .enumerate()
        .map(|(depth, segment)| {
            segment.weight() * 3u64.pow((MAX_RANKED_DEPTH - 1 - depth) as u32)
        })
        .sum()
}

/// Strip the final extension from a file name.
///
/// Hidden-style names (`.env`) keep their leading dot.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

fn is_index_stem(stem: &str, index_stems: &[String]) -> bool {
    index_stems.iter().any(|index| {
        stem == index
            || stem
                .strip_prefix(index.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
    })
}

/// Module key for a relative file path: `/`-separated, extension removed.
pub fn module_key(relative_path: &str) -> String {
    let normalized = relative_path.replace('\\', "/");
    let trimmed = normalized.trim_start_matches('/');
    match trimmed.rsplit_once('/') {
        Some((dir, file)) => format!("{}/{}", dir, strip_extension(file)),
        None => strip_extension(trimmed).to_string(),
    }
}

/// Convert a path relative to the api root into a URL pattern.
///
/// # Examples
///
/// ```
/// use api_dispatch::routing::grammar::pattern_from_path;
///
/// let stems = vec!["index".to_string()];
/// assert_eq!(pattern_from_path("users/[id].rs", &stems).to_string(), "/users/:id");
/// assert_eq!(pattern_from_path("a/b/index.rs", &stems).to_string(), "/a/b");
/// assert_eq!(pattern_from_path("index.rs", &stems).to_string(), "/");
/// ```
pub fn pattern_from_path(relative_path: &str, index_stems: &[String]) -> RoutePattern {
    let key = module_key(relative_path);
    let mut parts: Vec<&str> = key.split('/').filter(|s| !s.is_empty()).collect();

    if parts
        .last()
        .is_some_and(|last| is_index_stem(last, index_stems))
    {
        parts.pop();
    }

    RoutePattern::from_segments(parts.into_iter().map(classify_segment).collect())
}
