//! Path template matching module
//!
//! Templates are `/`-separated literal segments and `{name}` captures.
//! A capture matches exactly one non-empty segment.

/// One segment of a parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture(String),
}

/// Parsed path template such as `/items/{item_id}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .split('/')
            .map(|segment| {
                segment
                    .strip_prefix('{')
                    .and_then(|s| s.strip_suffix('}'))
                    .map_or_else(
                        || Segment::Literal(segment.to_string()),
                        |name| Segment::Capture(name.to_string()),
                    )
            })
            .collect();

        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a request path, returning the captured segments
    ///
    /// The whole path is percent-decoded before it is split, so an
    /// encoded `/` separates segments like a literal one.
    pub fn match_path(&self, path: &str) -> Option<Vec<(String, String)>> {
        let decoded = urlencoding::decode(path).ok()?;
        let parts: Vec<&str> = decoded.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut captures = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) => {
                    if literal != part {
                        return None;
                    }
                }
                Segment::Capture(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    captures.push((name.clone(), part.to_string()));
                }
            }
        }
        Some(captures)
    }
}

/// The same path with its trailing slash added or removed
pub fn toggle_trailing_slash(path: &str) -> Option<String> {
    if path == "/" || path.is_empty() {
        return None;
    }
    Some(path.strip_suffix('/').map_or_else(
        || format!("{path}/"),
        ToString::to_string,
    ))
}
