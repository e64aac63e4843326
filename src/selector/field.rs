use serde::{Deserialize, Serialize};

/// Emission class of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Emitted unless excluded
    Public,
    /// Emitted only with the private flag or when named as a plain inclusion
    Private,
    /// Never emitted
    Hidden,
}

/// Shape of a declared field's value, used to decide selector propagation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Scalar, temporal or decimal value
    Scalar,
    /// A single nested entity (may be null)
    One,
    /// A sequence or lazy query of entities
    Many,
}

/// One row of an entity's static field table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub visibility: Visibility,
    pub kind: FieldKind,
}

impl FieldDef {
    pub const fn public(name: &'static str) -> Self {
        Self { name, visibility: Visibility::Public, kind: FieldKind::Scalar }
    }

    pub const fn private(name: &'static str) -> Self {
        Self { name, visibility: Visibility::Private, kind: FieldKind::Scalar }
    }

    pub const fn hidden(name: &'static str) -> Self {
        Self { name, visibility: Visibility::Hidden, kind: FieldKind::Scalar }
    }

    /// Mark the field as holding one nested entity
    pub const fn one(mut self) -> Self {
        self.kind = FieldKind::One;
        self
    }

    /// Mark the field as holding a sequence of entities
    pub const fn many(mut self) -> Self {
        self.kind = FieldKind::Many;
        self
    }

    pub fn is_relation(&self) -> bool {
        !matches!(self.kind, FieldKind::Scalar)
    }
}

/// Declare a static field table for an [`Entity`](crate::serialize::Entity) implementation.
///
/// ```rust,ignore
/// const PERSON_FIELDS: &[FieldDef] = fields![
///     public id,
///     public name,
///     private ssn,
///     hidden password,
///     public friends: many,
/// ];
/// ```
#[macro_export]
macro_rules! fields {
    (@def public $name:ident) => { $crate::selector::FieldDef::public(stringify!($name)) };
    (@def private $name:ident) => { $crate::selector::FieldDef::private(stringify!($name)) };
    (@def hidden $name:ident) => { $crate::selector::FieldDef::hidden(stringify!($name)) };
    ($($vis:ident $name:ident $(: $kind:ident)?),* $(,)?) => {{
        const FIELDS: &[$crate::selector::FieldDef] =
            &[$( $crate::fields!(@def $vis $name) $( .$kind() )? ),*];
        FIELDS
    }};
}
