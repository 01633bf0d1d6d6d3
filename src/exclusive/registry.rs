//! Registry of mutually exclusive field groups per composite type.

use crate::fieldpath::Path;
use crate::merge::MergeError;
use crate::validate::{ValidationError, ValidationErrors};
use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

/// ExclusiveGroup names one side of a binary choice on a composite type.
///
/// The fields are accessed structurally through `is_set` and `clear`; the
/// names are only used to describe the group in errors and listings.
pub struct ExclusiveGroup<T> {
    fields: &'static [&'static str],
    is_set: fn(&T) -> bool,
    clear: fn(&mut T),
}

impl<T> ExclusiveGroup<T> {
    /// Creates a group from its field names and structural accessors.
    pub fn new(fields: &'static [&'static str], is_set: fn(&T) -> bool, clear: fn(&mut T)) -> Self {
        ExclusiveGroup {
            fields,
            is_set,
            clear,
        }
    }

    /// Returns the field names of this group.
    pub fn fields(&self) -> &'static [&'static str] {
        self.fields
    }

    /// Returns true if any field of the group holds a non-zero value.
    pub fn is_set(&self, value: &T) -> bool {
        (self.is_set)(value)
    }

    /// Resets every field of the group to its zero value.
    pub fn clear(&self, value: &mut T) {
        (self.clear)(value)
    }

    /// Describes the group for messages: `build` or `{spot}`-style lists.
    pub fn describe(&self) -> String {
        describe_fields(self.fields)
    }
}

fn describe_fields(fields: &[&str]) -> String {
    match fields {
        [single] => format!("\"{}\"", single),
        many => format!("{{{}}}", many.join(", ")),
    }
}

/// ExclusivePair holds the two sides of one binary choice.
pub struct ExclusivePair<T> {
    pub first: ExclusiveGroup<T>,
    pub second: ExclusiveGroup<T>,
}

impl<T> ExclusivePair<T> {
    /// Returns true if both sides hold a non-zero value.
    pub fn both_set(&self, value: &T) -> bool {
        self.first.is_set(value) && self.second.is_set(value)
    }
}

/// Which side of a pair an override selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    First,
    Second,
}

/// Describes one registered pair for listings, without the accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairDescription {
    pub first: Vec<&'static str>,
    pub second: Vec<&'static str>,
}

impl fmt::Display for PairDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vs {}",
            describe_fields(&self.first),
            describe_fields(&self.second)
        )
    }
}

struct Entry {
    type_name: &'static str,
    descriptions: Vec<PairDescription>,
    pairs: Box<dyn Any + Send + Sync>,
}

/// Registry is a table of exclusive pairs keyed by the composite type.
///
/// It is populated once and read-only afterwards; [`registry`] returns the
/// process-wide instance.
#[derive(Default)]
pub struct Registry {
    entries: HashMap<TypeId, Entry>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Registry::default()
    }

    /// Registers a pair of mutually exclusive groups on `T`.
    pub fn register<T: 'static>(&mut self, first: ExclusiveGroup<T>, second: ExclusiveGroup<T>) {
        let entry = self.entries.entry(TypeId::of::<T>()).or_insert_with(|| Entry {
            type_name: short_name::<T>(),
            descriptions: Vec::new(),
            pairs: Box::new(Vec::<ExclusivePair<T>>::new()),
        });
        entry.descriptions.push(PairDescription {
            first: first.fields.to_vec(),
            second: second.fields.to_vec(),
        });
        if let Some(pairs) = entry.pairs.downcast_mut::<Vec<ExclusivePair<T>>>() {
            pairs.push(ExclusivePair { first, second });
        }
    }

    /// Returns the pairs registered on `T`, or an empty slice.
    pub fn pairs<T: 'static>(&self) -> &[ExclusivePair<T>] {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|e| e.pairs.downcast_ref::<Vec<ExclusivePair<T>>>())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `(type name, pairs)` for every registered type, sorted by name.
    pub fn describe(&self) -> Vec<(&'static str, Vec<PairDescription>)> {
        let mut out: Vec<_> = self
            .entries
            .values()
            .map(|e| (e.type_name, e.descriptions.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }
}

fn short_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let mut registry = Registry::new();
    crate::manifest::register_exclusive_fields(&mut registry);
    registry
});

/// Returns the process-wide registry of exclusive field groups.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

/// Resolves one pair after `src` has been merged into `dst`.
///
/// Fails if `src` sets both sides. If `src` sets exactly one side, the other
/// side is cleared on `dst`; if it sets neither, `dst` keeps its prior choice.
pub fn resolve<T>(
    dst: &mut T,
    src: &T,
    pair: &ExclusivePair<T>,
    path: &Path,
) -> Result<(), MergeError> {
    match side_set_by(src, pair, path)? {
        Some(Side::First) => pair.second.clear(dst),
        Some(Side::Second) => pair.first.clear(dst),
        None => {}
    }
    Ok(())
}

fn side_set_by<T>(src: &T, pair: &ExclusivePair<T>, path: &Path) -> Result<Option<Side>, MergeError> {
    match (pair.first.is_set(src), pair.second.is_set(src)) {
        (true, true) => Err(MergeError::exclusive_conflict(
            path.clone(),
            pair.first.describe(),
            pair.second.describe(),
        )),
        (true, false) => Ok(Some(Side::First)),
        (false, true) => Ok(Some(Side::Second)),
        (false, false) => Ok(None),
    }
}

/// ClearPlan records which groups an override selected, computed before the
/// override is consumed by the structural merge and applied after it.
pub struct ClearPlan<T: 'static> {
    clears: Vec<&'static ExclusiveGroup<T>>,
}

impl<T: 'static> ClearPlan<T> {
    /// Returns true if the plan clears nothing.
    pub fn is_empty(&self) -> bool {
        self.clears.is_empty()
    }

    /// Clears the complementary groups on the merged value.
    pub fn apply(self, dst: &mut T) {
        for group in self.clears {
            tracing::trace!(fields = %group.describe(), "clearing exclusive group");
            group.clear(dst);
        }
    }
}

/// Inspects an override against every pair registered on `T`.
pub fn plan<T: 'static>(src: &T, path: &Path) -> Result<ClearPlan<T>, MergeError> {
    let mut clears = Vec::new();
    for pair in registry().pairs::<T>() {
        match side_set_by(src, pair, path)? {
            Some(Side::First) => clears.push(&pair.second),
            Some(Side::Second) => clears.push(&pair.first),
            None => {}
        }
    }
    Ok(ClearPlan { clears })
}

/// Reports every registered pair on `T` whose both sides are set.
pub fn check<T: 'static>(value: &T, path: &Path, errors: &mut ValidationErrors) {
    for pair in registry().pairs::<T>() {
        if pair.both_set(value) {
            errors.add(ValidationError::exclusive_conflict(
                path.clone(),
                pair.first.describe(),
                pair.second.describe(),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Image {
        build: Option<String>,
        location: Option<String>,
    }

    fn image_pair() -> (ExclusiveGroup<Image>, ExclusiveGroup<Image>) {
        (
            ExclusiveGroup::new(&["build"], |i: &Image| i.build.is_some(), |i: &mut Image| i.build = None),
            ExclusiveGroup::new(
                &["location"],
                |i: &Image| i.location.is_some(),
                |i: &mut Image| i.location = None,
            ),
        )
    }

    fn local_pair() -> ExclusivePair<Image> {
        let (first, second) = image_pair();
        ExclusivePair { first, second }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());
        let (a, b) = image_pair();
        registry.register::<Image>(a, b);

        assert_eq!(registry.pairs::<Image>().len(), 1);
        assert!(registry.pairs::<String>().is_empty());

        let described = registry.describe();
        assert_eq!(described.len(), 1);
        assert_eq!(described[0].0, "Image");
        assert_eq!(described[0].1[0].to_string(), "\"build\" vs \"location\"");
    }

    #[test]
    fn test_resolve_clears_other_side() {
        let pair = local_pair();
        let mut dst = Image {
            build: Some("./Dockerfile".into()),
            location: None,
        };
        let src = Image {
            build: None,
            location: Some("nginx".into()),
        };
        dst.location = src.location.clone();
        resolve(&mut dst, &src, &pair, &Path::new()).unwrap();
        assert_eq!(dst.build, None);
        assert_eq!(dst.location.as_deref(), Some("nginx"));
    }

    #[test]
    fn test_resolve_keeps_prior_choice_when_neither_set() {
        let pair = local_pair();
        let mut dst = Image {
            build: Some("./Dockerfile".into()),
            location: None,
        };
        resolve(&mut dst, &Image::default(), &pair, &Path::new()).unwrap();
        assert_eq!(dst.build.as_deref(), Some("./Dockerfile"));
    }

    #[test]
    fn test_resolve_rejects_both_sides() {
        let pair = local_pair();
        let src = Image {
            build: Some("x".into()),
            location: Some("y".into()),
        };
        let mut dst = Image::default();
        let err = resolve(&mut dst, &src, &pair, &Path::from_dotted("image")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("build") && msg.contains("location"), "{}", msg);
        assert!(msg.starts_with("image"), "{}", msg);
    }

    #[test]
    fn test_group_describe() {
        let group: ExclusiveGroup<Image> =
            ExclusiveGroup::new(&["range", "cpu_percentage"], |_| false, |_| {});
        assert_eq!(group.describe(), "{range, cpu_percentage}");
    }
}
