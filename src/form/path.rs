use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One step below a container: a struct field name or a list position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Field(String),
    Index(usize),
}

impl Segment {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Field(_) => None,
        }
    }

    /// Wire strings carry no segment kind, so all-digit names come back as indices.
    fn parse(raw: &str) -> Self {
        if !raw.is_empty() && raw.bytes().all(|byte| byte.is_ascii_digit()) {
            if let Ok(index) = raw.parse::<usize>() {
                return Self::Index(index);
            }
        }
        Self::Field(raw.to_string())
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathParseError {
    #[error("path `{0}` must start with `.`")]
    MissingRoot(String),
    #[error("path `{0}` contains an empty segment")]
    EmptySegment(String),
}

/// Location of a leaf relative to the root of a rendered tree.
///
/// The wire form is the dot-joined segment list with a leading `.` standing for
/// the root, so the root itself formats as the empty string and `items[2].x`
/// formats as `.items.2.x`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn append(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    pub fn field(&self, name: &str) -> Self {
        self.append(Segment::field(name))
    }

    pub fn index(&self, index: usize) -> Self {
        self.append(Segment::Index(index))
    }

    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Re-roots this path at `prefix`, or `None` when it lies outside it.
    pub fn strip_prefix(&self, prefix: &Path) -> Option<Path> {
        self.segments
            .strip_prefix(prefix.segments.as_slice())
            .map(|rest| Path::from_segments(rest.to_vec()))
    }

    /// Index immediately under `prefix`, if this path descends into a list there.
    pub fn index_under(&self, prefix: &Path) -> Option<usize> {
        if !self.starts_with(prefix) {
            return None;
        }
        self.segments.get(prefix.len()).and_then(Segment::as_index)
    }

    /// Moves the index right below `prefix` by `delta` when it is `>= pivot`.
    ///
    /// Paths outside `prefix`, the prefix itself, and paths whose next segment is
    /// a field name are returned unchanged.
    pub fn shift_indices_from(&self, prefix: &Path, pivot: usize, delta: isize) -> Path {
        let Some(index) = self.index_under(prefix) else {
            return self.clone();
        };
        if index < pivot {
            return self.clone();
        }

        let shifted = index.saturating_add_signed(delta);
        let mut segments = self.segments.clone();
        segments[prefix.len()] = Segment::Index(shifted);
        Path { segments }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = PathParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.is_empty() {
            return Ok(Path::root());
        }
        let Some(rest) = raw.strip_prefix('.') else {
            return Err(PathParseError::MissingRoot(raw.to_string()));
        };

        let mut segments = Vec::new();
        for part in rest.split('.') {
            if part.is_empty() {
                return Err(PathParseError::EmptySegment(raw.to_string()));
            }
            segments.push(Segment::parse(part));
        }
        Ok(Path { segments })
    }
}

impl Serialize for Path {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(raw: &str) -> Path {
        raw.parse().expect("test path should parse")
    }

    #[test]
    fn formats_with_leading_root_marker() {
        let path = Path::root().field("items").index(2).field("x");
        assert_eq!(path.to_string(), ".items.2.x");
        assert_eq!(Path::root().to_string(), "");
    }

    #[test]
    fn parse_treats_digit_segments_as_indices() {
        let path = p(".items.10.x");
        assert_eq!(
            path.segments(),
            &[
                Segment::field("items"),
                Segment::Index(10),
                Segment::field("x")
            ]
        );
    }

    #[test]
    fn parse_rejects_missing_root_and_empty_segments() {
        assert!(matches!(
            "items.0".parse::<Path>(),
            Err(PathParseError::MissingRoot(_))
        ));
        assert!(matches!(
            ".items..0".parse::<Path>(),
            Err(PathParseError::EmptySegment(_))
        ));
    }

    #[test]
    fn shift_only_touches_indices_at_or_after_pivot() {
        let list = p(".items");
        assert_eq!(p(".items.0.x").shift_indices_from(&list, 1, 1), p(".items.0.x"));
        assert_eq!(p(".items.1.x").shift_indices_from(&list, 1, 1), p(".items.2.x"));
        assert_eq!(p(".items.3").shift_indices_from(&list, 2, -1), p(".items.2"));
        assert_eq!(p(".items").shift_indices_from(&list, 0, 1), p(".items"));
        assert_eq!(p(".other.4").shift_indices_from(&list, 0, 1), p(".other.4"));
    }

    #[test]
    fn shift_does_not_confuse_longer_indices_sharing_a_prefix() {
        let list = p(".items");
        assert_eq!(p(".items.10").index_under(&list), Some(10));
        assert_eq!(p(".items.10").shift_indices_from(&list, 11, -1), p(".items.10"));
    }

    #[test]
    fn strip_prefix_re_roots_descendants() {
        let prefix = p(".a.b");
        let full = p(".a.b.3.c");
        let relative = full.strip_prefix(&prefix).expect("prefix should match");
        assert_eq!(relative, p(".3.c"));
        assert_eq!(p(".a.b").strip_prefix(&prefix), Some(Path::root()));
        assert!(p(".a.c").strip_prefix(&prefix).is_none());
    }
}
