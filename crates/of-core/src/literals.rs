//! Storage literals for unit enums persisted as text.

/// Implement `as_str`, `Display`, and `FromStr` over a fixed literal table.
///
/// Unknown literals map to [`CoreError::UnknownVariant`](crate::error::CoreError::UnknownVariant).
macro_rules! storage_literals {
    ($ty:ident, $kind:literal, { $($variant:ident => $lit:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $lit),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::error::CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($lit => Ok($ty::$variant),)+
                    other => Err($crate::error::CoreError::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub(crate) use storage_literals;
