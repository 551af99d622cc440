//! Parameter requirements and source paths.

use std::fmt;

/// Which half of the request context a source path addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Request,
    Response,
}

/// Ordered segments addressing a value inside the request context.
///
/// `request.params.id`, `["query", "page"]` and `params.id` are all valid;
/// a path that does not start with `request` or `response` is relative to
/// `request`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourcePath {
    namespace: Namespace,
    segments: Vec<String>,
}

impl SourcePath {
    /// Build from a segment list, honouring a leading namespace segment.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut segments: Vec<String> = segments
            .into_iter()
            .map(Into::into)
            .filter(|s| !s.is_empty())
            .collect();

        let namespace = match segments.first().map(String::as_str) {
            Some("request") => {
                segments.remove(0);
                Namespace::Request
            }
            Some("response") => {
                segments.remove(0);
                Namespace::Response
            }
            _ => Namespace::Request,
        };

        Self { namespace, segments }
    }

    /// Parse a dotted path such as `request.query.page`.
    pub fn parse(dotted: &str) -> Self {
        Self::from_segments(dotted.split('.'))
    }

    /// A path inside the request namespace.
    pub fn request<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespace: Namespace::Request,
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// A path inside the response namespace.
    pub fn response<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespace: Namespace::Response,
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = match self.namespace {
            Namespace::Request => "request",
            Namespace::Response => "response",
        };
        f.write_str(ns)?;
        for segment in &self.segments {
            write!(f, ".{}", segment)?;
        }
        Ok(())
    }
}

impl From<&str> for SourcePath {
    fn from(dotted: &str) -> Self {
        SourcePath::parse(dotted)
    }
}

impl From<&[&str]> for SourcePath {
    fn from(segments: &[&str]) -> Self {
        SourcePath::from_segments(segments.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for SourcePath {
    fn from(segments: [&str; N]) -> Self {
        SourcePath::from_segments(segments)
    }
}

/// How one handler parameter is located and coerced.
///
/// `None` fields fall back to their effective defaults at dispatch time so
/// that merging can tell "unset" apart from "explicitly false".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterRequirement {
    pub required: Option<bool>,
    pub auto_convert: Option<bool>,
    pub sources: Vec<SourcePath>,
}

impl ParameterRequirement {
    /// A requirement that only sets `required`.
    pub fn required(required: bool) -> Self {
        Self {
            required: Some(required),
            ..Self::default()
        }
    }

    /// A requirement that adds one source.
    pub fn source(path: impl Into<SourcePath>, auto_convert: bool) -> Self {
        Self {
            required: None,
            auto_convert: Some(auto_convert),
            sources: vec![path.into()],
        }
    }

    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(true)
    }

    pub fn is_auto_convert(&self) -> bool {
        self.auto_convert.unwrap_or(false)
    }

    /// Sources to consult, in order.
    ///
    /// With no declared sources: path captures, then query, then body.
    pub fn effective_sources(&self, name: &str) -> Vec<SourcePath> {
        if self.sources.is_empty() {
            vec![
                SourcePath::request(["params", name]),
                SourcePath::request(["query", name]),
                SourcePath::request(["body", name]),
            ]
        } else {
            self.sources.clone()
        }
    }

    /// Merge a later fragment into this one.
    ///
    /// Scalars are last-wins when set; sources append, skipping any path
    /// already present.
    pub fn merge(&mut self, other: ParameterRequirement) {
        if other.required.is_some() {
            self.required = other.required;
        }
        if other.auto_convert.is_some() {
            self.auto_convert = other.auto_convert;
        }
        for source in other.sources {
            if !self.sources.contains(&source) {
                self.sources.push(source);
            }
        }
    }
}
