//! The Merge trait and its field-kind rules.

use super::MergeError;
use crate::fieldpath::Path;
use crate::union::Union;
use std::collections::BTreeMap;

/// Merge applies an override onto a base value of the same type.
///
/// Field-kind rules:
/// - scalars: the override replaces the base;
/// - `Option<T>`: `None` leaves the base untouched, `Some` is merged into the
///   base value (or taken as is when the base is `None`). Optional scalars
///   therefore honor an explicit zero;
/// - `Vec<T>`: replaced wholesale, so `Some(vec![])` clears a list;
/// - `BTreeMap<String, V>`: merged key-wise, recursing on shared keys;
/// - `Union<B, A>`: unset keeps the base, the same shape merges recursively,
///   the other shape replaces the base;
/// - composite structs: every field, then the type's exclusive pairs.
pub trait Merge: Sized {
    /// Merges `overlay` into `self`. `path` locates the override node and is
    /// only used for errors.
    fn merge_at(&mut self, overlay: Self, path: &Path) -> Result<(), MergeError>;
}

/// Merges `overlay` onto `base` and returns the resolved value.
///
/// `base` is consumed: on error it is dropped, so no caller can observe a
/// partially merged tree. Clone first to keep the original.
pub fn merge<T: Merge>(base: T, overlay: T) -> Result<T, MergeError> {
    merge_at(base, overlay, &Path::new())
}

/// Like [`merge`], reporting errors relative to `path`.
pub fn merge_at<T: Merge>(mut base: T, overlay: T, path: &Path) -> Result<T, MergeError> {
    base.merge_at(overlay, path)?;
    Ok(base)
}

macro_rules! replace_on_merge {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Merge for $ty {
                fn merge_at(&mut self, overlay: Self, _path: &Path) -> Result<(), MergeError> {
                    *self = overlay;
                    Ok(())
                }
            }
        )*
    };
}

replace_on_merge!(String, bool, u8, u16, u32, u64, i32, i64, usize, f64, std::time::Duration);

impl<T: Merge> Merge for Option<T> {
    fn merge_at(&mut self, overlay: Self, path: &Path) -> Result<(), MergeError> {
        let Some(overlay) = overlay else {
            return Ok(());
        };
        match self {
            Some(base) => base.merge_at(overlay, path),
            None => {
                *self = Some(overlay);
                Ok(())
            }
        }
    }
}

impl<T> Merge for Vec<T> {
    fn merge_at(&mut self, overlay: Self, _path: &Path) -> Result<(), MergeError> {
        *self = overlay;
        Ok(())
    }
}

impl<V: Merge> Merge for BTreeMap<String, V> {
    fn merge_at(&mut self, overlay: Self, path: &Path) -> Result<(), MergeError> {
        for (key, value) in overlay {
            match self.get_mut(&key) {
                Some(base) => base.merge_at(value, &path.key(&key))?,
                None => {
                    self.insert(key, value);
                }
            }
        }
        Ok(())
    }
}

impl<B: Merge, A: Merge> Merge for Union<B, A> {
    fn merge_at(&mut self, overlay: Self, path: &Path) -> Result<(), MergeError> {
        match overlay {
            Union::Unset => Ok(()),
            Union::Basic(b) => match self {
                Union::Basic(base) => base.merge_at(b, path),
                _ => {
                    *self = Union::Basic(b);
                    Ok(())
                }
            },
            Union::Advanced(a) => match self {
                Union::Advanced(base) => base.merge_at(a, path),
                _ => {
                    *self = Union::Advanced(a);
                    Ok(())
                }
            },
        }
    }
}

/// Implements [`Merge`] for a composite struct.
///
/// Each listed field merges at `path.<field>`; fields listed under `inline`
/// are flattened into the parent document and merge at `path` itself. The
/// exclusive pairs registered for the type are inspected on the override
/// before the fields are consumed and applied after.
#[macro_export]
macro_rules! impl_merge {
    ($ty:ty { $($field:ident),* $(,)? } $(, inline { $($inline:ident),* $(,)? })?) => {
        impl $crate::merge::Merge for $ty {
            fn merge_at(
                &mut self,
                overlay: Self,
                path: &$crate::fieldpath::Path,
            ) -> ::std::result::Result<(), $crate::merge::MergeError> {
                let plan = $crate::exclusive::plan(&overlay, path)?;
                $(
                    $crate::merge::Merge::merge_at(
                        &mut self.$field,
                        overlay.$field,
                        &path.child(stringify!($field)),
                    )?;
                )*
                $($(
                    $crate::merge::Merge::merge_at(&mut self.$inline, overlay.$inline, path)?;
                )*)?
                plan.apply(self);
                Ok(())
            }
        }
    };
}
