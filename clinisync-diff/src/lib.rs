//! Structural diff/patch engine for clinisync.
//!
//! Computes the minimal set of field-level mutations that turn a stored
//! record into an updated one, and applies such patches to JSON documents.
//!
//! # Value trees
//!
//! Every type that takes part in a diff implements [`Diffable`]. A node is one
//! of four kinds:
//! - **Scalar**: strings, numbers, booleans, timestamps (see [`diffable_scalar!`])
//! - **Object**: named fields declared once with [`diffable_object!`]
//! - **Keyed map**: `BTreeMap<String, V>` / `HashMap<String, V>`
//! - **Identity list**: `Vec<T>` where `T: Keyed`, matched by diff key
//!
//! `Option<T>` and JSON `null` mean "absent".
//!
//! # Patches
//!
//! A [`Patch`] maps dot-delimited paths to [`PatchOp::Set`] or
//! [`PatchOp::Unset`]. Patches are minimal (no entry where old and new agree)
//! and their paths never nest, so entries can be applied in any order.
//!
//! ```
//! use clinisync_diff::{diff, diffable_object, PatchOp};
//! use serde::Serialize;
//!
//! #[derive(Debug, Clone, PartialEq, Serialize)]
//! struct Name {
//!     first: String,
//!     last: String,
//! }
//! diffable_object!(Name { first, last });
//!
//! let old = Name { first: "Ada".into(), last: "Byron".into() };
//! let new = Name { first: "Ada".into(), last: "Lovelace".into() };
//!
//! let patch = diff(Some(&old), Some(&new)).unwrap();
//! assert_eq!(patch.len(), 1);
//! assert_eq!(patch.get("last"), Some(&PatchOp::Set("Lovelace".into())));
//! ```

mod apply;
mod diffable;
mod error;
mod json;
mod patch;
mod path;

pub use apply::{apply_patch, value_at};
pub use diffable::{diff, diff_at, Diffable, Keyed, NodeKind};
pub use error::{DiffError, DiffResult};
pub use patch::{Patch, PatchOp};
pub use path::FieldPath;

#[doc(hidden)]
pub use serde_json::Value as __Value;

/// Serializes `value` into a JSON node for a `Set` entry.
pub fn to_node<T: serde::Serialize + ?Sized>(value: &T) -> DiffResult<serde_json::Value> {
    serde_json::to_value(value).map_err(DiffError::from)
}

/// Implements [`Diffable`] for a scalar type.
///
/// Scalars are compared with `PartialEq` and replaced whole when they differ.
/// Use this for enums stored as plain strings.
#[macro_export]
macro_rules! diffable_scalar {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Diffable for $ty {
                fn kind(&self) -> $crate::NodeKind {
                    $crate::NodeKind::Scalar
                }

                fn to_value(&self) -> $crate::DiffResult<$crate::__Value> {
                    $crate::to_node(self)
                }

                fn diff_from(
                    &self,
                    old: &Self,
                    path: &$crate::FieldPath,
                    patch: &mut $crate::Patch,
                ) -> $crate::DiffResult<()> {
                    if self != old {
                        patch.set(path, self.to_value()?);
                    }
                    Ok(())
                }
            }
        )+
    };
}

/// Implements [`Diffable`] for a struct by listing its fields once.
///
/// Each listed field is diffed recursively under a path segment equal to the
/// field's name, so the struct must serialize with its Rust field names.
/// Fields left out of the list are ignored by the diff.
#[macro_export]
macro_rules! diffable_object {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl $crate::Diffable for $ty {
            fn kind(&self) -> $crate::NodeKind {
                $crate::NodeKind::Object
            }

            fn to_value(&self) -> $crate::DiffResult<$crate::__Value> {
                $crate::to_node(self)
            }

            fn insert_into(
                &self,
                path: &$crate::FieldPath,
                patch: &mut $crate::Patch,
            ) -> $crate::DiffResult<()> {
                let before = patch.len();
                $(
                    $crate::diff_at(
                        None,
                        Some(&self.$field),
                        &path.child(stringify!($field)),
                        patch,
                    )?;
                )+
                if patch.len() == before {
                    patch.set(path, self.to_value()?);
                }
                Ok(())
            }

            fn diff_from(
                &self,
                old: &Self,
                path: &$crate::FieldPath,
                patch: &mut $crate::Patch,
            ) -> $crate::DiffResult<()> {
                $(
                    $crate::diff_at(
                        Some(&old.$field),
                        Some(&self.$field),
                        &path.child(stringify!($field)),
                        patch,
                    )?;
                )+
                Ok(())
            }
        }
    };
}
