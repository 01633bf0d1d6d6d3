//! Emptiness predicate used to decide which side of a union was authored.

use std::collections::BTreeMap;

/// IsZero reports whether a value carries no authored content.
///
/// Optional values are zero only when absent, so an explicit `Some(0)` or
/// `Some(false)` counts as set. Collections are zero when empty. Composite
/// config types are zero when every field is zero (see [`impl_is_zero!`]).
///
/// [`impl_is_zero!`]: crate::impl_is_zero
pub trait IsZero {
    /// Returns true if the value is the zero value for its type.
    fn is_zero(&self) -> bool;
}

macro_rules! zero_by_default {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IsZero for $ty {
                fn is_zero(&self) -> bool {
                    *self == <$ty>::default()
                }
            }
        )*
    };
}

zero_by_default!(bool, u8, u16, u32, u64, i32, i64, usize, f64);

impl IsZero for String {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T> IsZero for Option<T> {
    fn is_zero(&self) -> bool {
        self.is_none()
    }
}

impl<T> IsZero for Vec<T> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> IsZero for BTreeMap<K, V> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl IsZero for std::time::Duration {
    fn is_zero(&self) -> bool {
        std::time::Duration::is_zero(self)
    }
}

/// Implements [`IsZero`] for a struct as "every listed field is zero".
#[macro_export]
macro_rules! impl_is_zero {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::union::IsZero for $ty {
            fn is_zero(&self) -> bool {
                true $(&& $crate::union::IsZero::is_zero(&self.$field))*
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Pair {
        a: Option<u32>,
        b: Vec<String>,
    }

    crate::impl_is_zero!(Pair { a, b });

    #[test]
    fn test_scalars() {
        assert!(0u32.is_zero());
        assert!(!7u32.is_zero());
        assert!(String::new().is_zero());
        assert!(false.is_zero());
        assert!(!true.is_zero());
    }

    #[test]
    fn test_option_presence_is_not_zero() {
        assert!(None::<u32>.is_zero());
        assert!(!Some(0u32).is_zero());
        assert!(!Some(String::new()).is_zero());
    }

    #[test]
    fn test_struct_macro() {
        assert!(Pair::default().is_zero());
        assert!(!Pair { a: Some(0), ..Default::default() }.is_zero());
        assert!(!Pair { b: vec!["x".into()], ..Default::default() }.is_zero());
    }
}
