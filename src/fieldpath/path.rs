//! Path element and path types.

use std::cmp::Ordering;

/// PathElement represents one level of path navigation through a config tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathElement {
    /// Field name for struct fields.
    FieldName(String),
    /// Key for keyed maps (named sidecars, volumes, environments).
    Key(String),
    /// Index for list elements.
    Index(usize),
}

impl PathElement {
    /// Creates a new field name path element.
    pub fn field_name(name: impl Into<String>) -> Self {
        PathElement::FieldName(name.into())
    }

    /// Creates a new map key path element.
    pub fn key(key: impl Into<String>) -> Self {
        PathElement::Key(key.into())
    }

    /// Creates a new index path element.
    pub fn index(i: usize) -> Self {
        PathElement::Index(i)
    }

    /// Returns true if this is a field name element.
    pub fn is_field_name(&self) -> bool {
        matches!(self, PathElement::FieldName(_))
    }
}

impl PartialOrd for PathElement {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathElement {
    fn cmp(&self, other: &Self) -> Ordering {
        fn type_order(pe: &PathElement) -> u8 {
            match pe {
                PathElement::FieldName(_) => 0,
                PathElement::Key(_) => 1,
                PathElement::Index(_) => 2,
            }
        }

        match (self, other) {
            (PathElement::FieldName(a), PathElement::FieldName(b)) => a.cmp(b),
            (PathElement::Key(a), PathElement::Key(b)) => a.cmp(b),
            (PathElement::Index(a), PathElement::Index(b)) => a.cmp(b),
            _ => type_order(self).cmp(&type_order(other)),
        }
    }
}

/// Path represents a complete path from the document root to a nested node.
///
/// Rendered the way a manifest author reads it: `http.additional_rules[2].healthcheck`
/// or `sidecars[nginx].port`. The empty path renders as `.`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    elements: Vec<PathElement>,
}

impl Path {
    /// Creates a new empty path.
    pub fn new() -> Self {
        Path {
            elements: Vec::new(),
        }
    }

    /// Parses a dotted path such as `image.build` into field name elements.
    pub fn from_dotted(dotted: &str) -> Self {
        dotted
            .split('.')
            .filter(|s| !s.is_empty())
            .map(PathElement::field_name)
            .collect()
    }

    /// Returns the number of elements in the path.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if the path is empty.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns an iterator over the path elements.
    pub fn iter(&self) -> impl Iterator<Item = &PathElement> {
        self.elements.iter()
    }

    /// Appends a path element.
    pub fn push(&mut self, element: PathElement) {
        self.elements.push(element);
    }

    /// Creates a new path with the given element appended.
    pub fn with(&self, element: PathElement) -> Self {
        let mut new_path = self.clone();
        new_path.push(element);
        new_path
    }

    /// Shorthand for `with(PathElement::field_name(name))`.
    pub fn child(&self, name: &str) -> Self {
        self.with(PathElement::field_name(name))
    }

    /// Shorthand for `with(PathElement::key(key))`.
    pub fn key(&self, key: &str) -> Self {
        self.with(PathElement::key(key))
    }

    /// Shorthand for `with(PathElement::index(i))`.
    pub fn index(&self, i: usize) -> Self {
        self.with(PathElement::index(i))
    }
}

impl FromIterator<PathElement> for Path {
    fn from_iter<T: IntoIterator<Item = PathElement>>(iter: T) -> Self {
        Path {
            elements: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Path {
    type Item = PathElement;
    type IntoIter = std::vec::IntoIter<PathElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathElement;
    type IntoIter = std::slice::Iter<'a, PathElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl std::fmt::Display for PathElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathElement::FieldName(name) => write!(f, "{}", name),
            PathElement::Key(key) => write!(f, "[{}]", key),
            PathElement::Index(i) => write!(f, "[{}]", i),
        }
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.elements.is_empty() {
            return write!(f, ".");
        }
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 && element.is_field_name() {
                write!(f, ".")?;
            }
            write!(f, "{}", element)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_element_field_name() {
        let pe = PathElement::field_name("foo");
        assert!(pe.is_field_name());
        assert!(!PathElement::index(3).is_field_name());
        assert!(!PathElement::key("foo").is_field_name());
    }

    #[test]
    fn test_path_operations() {
        let mut path = Path::new();
        assert!(path.is_empty());

        path.push(PathElement::field_name("image"));
        path.push(PathElement::field_name("build"));
        assert_eq!(path.len(), 2);
        assert_eq!(path, Path::new().child("image").child("build"));

        let indexed = path.index(0);
        assert_eq!(indexed.len(), 3);
        assert_eq!(
            indexed.iter().last(),
            Some(&PathElement::Index(0))
        );
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_path_display() {
        let path = Path::new()
            .child("http")
            .child("additional_rules")
            .index(2)
            .child("healthcheck");
        assert_eq!(path.to_string(), "http.additional_rules[2].healthcheck");

        let path = Path::new().child("sidecars").key("nginx").child("port");
        assert_eq!(path.to_string(), "sidecars[nginx].port");

        assert_eq!(Path::new().to_string(), ".");
    }

    #[test]
    fn test_path_from_dotted() {
        let path = Path::from_dotted("count.range");
        assert_eq!(path, Path::new().child("count").child("range"));
        assert!(Path::from_dotted("").is_empty());
    }

    #[test]
    fn test_path_element_ordering() {
        let a = PathElement::field_name("a");
        let b = PathElement::field_name("b");
        assert!(a < b);

        let idx = PathElement::index(0);
        // Field names come before indices
        assert!(a < idx);
        assert!(PathElement::key("z") < idx);
    }
}
