use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Values captured from dynamic and catch-all segments, keyed by name
pub type Params = BTreeMap<String, String>;

/// Param key under which a catch-all segment stores the rest of the path
pub const CATCH_ALL_PARAM: &str = "*";

/// One segment of a route path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text, matched exactly
    Static(String),
    /// `:name`, matches any single segment
    Dynamic(String),
    /// `*`, matches the remainder of the path
    CatchAll,
}

impl Segment {
    pub fn parse(raw: &str) -> Segment {
        if raw == "*" {
            Segment::CatchAll
        } else if let Some(name) = raw.strip_prefix(':') {
            Segment::Dynamic(name.to_string())
        } else {
            Segment::Static(raw.to_string())
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, Segment::Static(_))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Static(s) => write!(f, "{}", s),
            Segment::Dynamic(name) => write!(f, ":{}", name),
            Segment::CatchAll => write!(f, "*"),
        }
    }
}

/// Split a path on `/`, dropping empty pieces so that
/// `"/post/"`, `"post"` and `"post//"` all yield `["post"]`.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Join a parent route path with a relative child path.
///
/// The result is always normalized to a leading slash and no trailing slash,
/// with the root represented as `/`.
pub fn join_path(parent: &str, child: &str) -> String {
    let segments: Vec<&str> = split_path(parent)
        .into_iter()
        .chain(split_path(child))
        .collect();
    format!("/{}", segments.join("/"))
}

/// Parse and validate a route path into segments.
///
/// Rejects `.` and `..`, backslashes, and a catch-all anywhere but last.
/// An empty path (pathless layout or index route) yields no segments.
pub fn parse_route_path(path: &str) -> Result<Vec<Segment>> {
    let raw = split_path(path);
    let mut segments = Vec::with_capacity(raw.len());

    for (i, piece) in raw.iter().enumerate() {
        check_piece(piece, path)?;

        let segment = Segment::parse(piece);
        match &segment {
            Segment::CatchAll if i + 1 != raw.len() => {
                return Err(Error::InvalidRoute(format!(
                    "Catch-all '*' must be the last segment in '{}'",
                    path
                )));
            }
            Segment::Dynamic(name) if name.is_empty() => {
                return Err(Error::InvalidRoute(format!(
                    "Dynamic segment without a name in '{}'",
                    path
                )));
            }
            _ => {}
        }
        segments.push(segment);
    }

    Ok(segments)
}

/// Validate one concrete value supplied for a parametrized route.
///
/// Catch-all values may span several segments (`2024/hello`); each piece is
/// checked like a static segment.
pub fn validate_static_path(value: &str, route: &str) -> Result<()> {
    let pieces = split_path(value);
    if pieces.is_empty() {
        return Err(Error::InvalidRoute(format!(
            "Empty static path for route '{}'",
            route
        )));
    }
    for piece in pieces {
        check_piece(piece, route)?;
    }
    Ok(())
}

fn check_piece(piece: &str, path: &str) -> Result<()> {
    if piece == "." || piece == ".." {
        return Err(Error::InvalidRoute(format!(
            "Relative segment '{}' not allowed in '{}'",
            piece, path
        )));
    }
    if piece.contains('\\') {
        return Err(Error::InvalidRoute(format!(
            "Backslash not allowed in '{}'",
            path
        )));
    }
    Ok(())
}

/// A concrete file to generate for one concrete route
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputTarget {
    /// Normalized route path, e.g. `/post/a`
    pub route_path: String,
    /// File path relative to the output directory, e.g. `post/a/index.html`
    pub file: String,
}

impl OutputTarget {
    pub fn from_route_path(path: &str) -> Self {
        let segments = split_path(path);
        let file = if segments.is_empty() {
            "index.html".to_string()
        } else {
            format!("{}/index.html", segments.join("/"))
        };

        OutputTarget {
            route_path: format!("/{}", segments.join("/")),
            file,
        }
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.route_path, self.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_parse() {
        assert_eq!(Segment::parse("post"), Segment::Static("post".into()));
        assert_eq!(Segment::parse(":slug"), Segment::Dynamic("slug".into()));
        assert_eq!(Segment::parse("*"), Segment::CatchAll);
    }

    #[test]
    fn test_join_path_normalizes() {
        assert_eq!(join_path("/", ""), "/");
        assert_eq!(join_path("/", "post/"), "/post");
        assert_eq!(join_path("/post", "a"), "/post/a");
        assert_eq!(join_path("post//", "/a/b/"), "/post/a/b");
    }

    #[test]
    fn test_output_target_naming() {
        assert_eq!(OutputTarget::from_route_path("/").file, "index.html");
        assert_eq!(OutputTarget::from_route_path("").file, "index.html");
        assert_eq!(
            OutputTarget::from_route_path("/post/").file,
            "post/index.html"
        );

        let target = OutputTarget::from_route_path("post/a");
        assert_eq!(target.route_path, "/post/a");
        assert_eq!(target.file, "post/a/index.html");
    }

    #[test]
    fn test_parse_route_path_valid() {
        let segments = parse_route_path("/docs/:section/*").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Static("docs".into()),
                Segment::Dynamic("section".into()),
                Segment::CatchAll,
            ]
        );
        assert!(parse_route_path("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_route_path_rejects_bad_segments() {
        let result = parse_route_path("../secret");
        assert!(result.unwrap_err().to_string().contains("Relative segment"));

        assert!(parse_route_path("docs/./x").is_err());
        assert!(parse_route_path("a\\b").is_err());
        assert!(parse_route_path("*/tail").is_err());
        assert!(parse_route_path("post/:").is_err());
    }

    #[test]
    fn test_validate_static_path() {
        assert!(validate_static_path("a", "/post/*").is_ok());
        assert!(validate_static_path("2024/hello", "/post/*").is_ok());
        assert!(validate_static_path("", "/post/*").is_err());
        assert!(validate_static_path("../../etc", "/post/*").is_err());
    }
}
