//! Runtime value representation
//!
//! This module defines the [`Value`] enum stored in every heap slot. Container
//! variants do not own their elements: they hold the [`ObjectId`]s of other
//! heap objects, and those ids are exactly the object's outgoing edges.
//!
//! # Value Types
//!
//! - Scalars: [`Value::None`], [`Value::Bool`], [`Value::Int`], [`Value::Float`]
//! - Buffers: [`Value::Str`], [`Value::Bytes`]
//! - Containers: [`Value::List`], [`Value::Tuple`], [`Value::Set`], [`Value::Dict`]
//! - [`Value::Record`]: named fields, like an instance of a user type
//! - [`Value::Native`]: an application object implementing [`NativeObject`]
//!
//! # Length
//!
//! Buffers and containers have a length; scalars and records do not. Native
//! objects decide for themselves through [`NativeObject::len`].

use super::ObjectId;
use crate::error::ReprError;
use std::fmt;
use std::sync::Arc;

/// An application object living in the heap.
///
/// The heap cannot look inside arbitrary Rust values, so a native object
/// registers its outgoing edges by returning them from [`referents`].
/// [`repr`] may be slow or fail; it only ever runs on a background worker.
///
/// [`referents`]: NativeObject::referents
/// [`repr`]: NativeObject::repr
pub trait NativeObject: Send + Sync {
    fn type_name(&self) -> &str;

    fn repr(&self) -> Result<String, ReprError>;

    fn referents(&self) -> Vec<ObjectId> {
        Vec::new()
    }

    fn len(&self) -> Option<usize> {
        None
    }
}

/// Values stored in the heap
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<ObjectId>),
    Tuple(Vec<ObjectId>),
    Set(Vec<ObjectId>),
    Dict(Vec<(ObjectId, ObjectId)>), // key -> value
    Record {
        type_name: String,
        fields: Vec<(String, ObjectId)>,
    },
    Native(Arc<dyn NativeObject>),
}

impl Value {
    /// Name of the value's type as shown in the browser
    pub fn type_name(&self) -> &str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Set(_) => "set",
            Value::Dict(_) => "dict",
            Value::Record { type_name, .. } => type_name,
            Value::Native(obj) => obj.type_name(),
        }
    }

    /// Number of elements, or `None` if the type has no size concept
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Str(s) => Some(s.chars().count()),
            Value::Bytes(b) => Some(b.len()),
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => Some(items.len()),
            Value::Dict(entries) => Some(entries.len()),
            Value::Native(obj) => obj.len(),
            Value::None
            | Value::Bool(_)
            | Value::Int(_)
            | Value::Float(_)
            | Value::Record { .. } => None,
        }
    }

    /// Direct outgoing edges, in declaration order (duplicates included)
    pub fn referents(&self) -> Vec<ObjectId> {
        match self {
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => items.clone(),
            Value::Dict(entries) => entries.iter().flat_map(|&(k, v)| [k, v]).collect(),
            Value::Record { fields, .. } => fields.iter().map(|(_, id)| *id).collect(),
            Value::Native(obj) => obj.referents(),
            _ => Vec::new(),
        }
    }

    /// Check whether this value points directly at `target`
    pub fn references(&self, target: ObjectId) -> bool {
        match self {
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => {
                items.contains(&target)
            }
            Value::Dict(entries) => entries.iter().any(|&(k, v)| k == target || v == target),
            Value::Record { fields, .. } => fields.iter().any(|(_, id)| *id == target),
            Value::Native(obj) => obj.referents().contains(&target),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(n) => write!(f, "Int({})", n),
            Value::Float(x) => write!(f, "Float({})", x),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Tuple(items) => f.debug_tuple("Tuple").field(items).finish(),
            Value::Set(items) => f.debug_tuple("Set").field(items).finish(),
            Value::Dict(entries) => f.debug_tuple("Dict").field(entries).finish(),
            Value::Record { type_name, fields } => f
                .debug_struct("Record")
                .field("type_name", type_name)
                .field("fields", fields)
                .finish(),
            Value::Native(obj) => write!(f, "Native({})", obj.type_name()),
        }
    }
}
