//! Sample object graphs for the `refscope` binary
//!
//! Each demo allocates into a fresh [`Heap`] and returns the heap together
//! with the object browsing starts from.

use crate::error::{HeapError, ReprError};
use crate::heap::{Heap, NativeObject, ObjRef, ObjectId, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Nesting of the `deep` list in the web demo, past the representation limit
const DEEP_NESTING: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Demo {
    /// `L = [L]` plus a few objects pointing at it
    #[default]
    Cycle,
    /// The integer 42 and nothing else
    Int,
    /// Records with back-pointers and native objects that fail to print
    Web,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown demo {0:?} (expected cycle, int or web)")]
pub struct UnknownDemo(pub String);

impl FromStr for Demo {
    type Err = UnknownDemo;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cycle" => Ok(Demo::Cycle),
            "int" => Ok(Demo::Int),
            "web" => Ok(Demo::Web),
            other => Err(UnknownDemo(other.to_string())),
        }
    }
}

impl fmt::Display for Demo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Demo::Cycle => "cycle",
            Demo::Int => "int",
            Demo::Web => "web",
        };
        f.write_str(name)
    }
}

/// Build the demo graph, returning the heap and the root object
pub fn build(demo: Demo) -> Result<(Arc<Heap>, ObjRef), HeapError> {
    let heap = Heap::new();
    let root = match demo {
        Demo::Cycle => build_cycle(&heap)?,
        Demo::Int => heap.alloc(Value::Int(42))?,
        Demo::Web => build_web(&heap)?,
    };
    Ok((heap, root))
}

fn build_cycle(heap: &Arc<Heap>) -> Result<ObjRef, HeapError> {
    let list = heap.alloc(Value::List(Vec::new()))?;
    list.set(Value::List(vec![list.id()]))?;

    let key = heap.alloc(Value::Str("self".to_string()))?;
    heap.alloc(Value::Dict(vec![(key.id(), list.id())]))?;
    let one = heap.alloc(Value::Int(1))?;
    heap.alloc(Value::Tuple(vec![list.id(), one.id()]))?;

    Ok(list)
}

fn build_web(heap: &Arc<Heap>) -> Result<ObjRef, HeapError> {
    let app = heap.alloc(Value::None)?;

    let mut users = Vec::new();
    for (name, admin) in [("ada", true), ("grace", false), ("linus", false)] {
        let name = heap.alloc(Value::Str(name.to_string()))?;
        let admin = heap.alloc(Value::Bool(admin))?;
        let user = heap.alloc(Value::Record {
            type_name: "User".to_string(),
            fields: vec![
                ("name".to_string(), name.id()),
                ("admin".to_string(), admin.id()),
                ("app".to_string(), app.id()),
            ],
        })?;
        users.push(user.id());
    }
    let users = heap.alloc(Value::List(users))?;

    let mut settings = Vec::new();
    for (key, value) in [("debug", Value::Bool(false)), ("ratio", Value::Float(0.75))] {
        let key = heap.alloc(Value::Str(key.to_string()))?;
        let value = heap.alloc(value)?;
        settings.push((key.id(), value.id()));
    }
    let settings = heap.alloc(Value::Dict(settings))?;

    let banner = heap.alloc(Value::Str(
        "Welcome to the object graph browser. ".repeat(8),
    ))?;
    let payload = heap.alloc(Value::Bytes(b"\x00\x01binary\xff".to_vec()))?;

    let socket = heap.alloc(Value::Native(Arc::new(Socket {
        peer: "10.0.0.7:5432".to_string(),
        owner: app.id(),
    })))?;
    let probe = heap.alloc(Value::Native(Arc::new(Probe)))?;

    let mut deep = heap.alloc(Value::Int(0))?;
    for _ in 0..DEEP_NESTING {
        deep = heap.alloc(Value::List(vec![deep.id()]))?;
    }

    app.set(Value::Record {
        type_name: "App".to_string(),
        fields: vec![
            ("users".to_string(), users.id()),
            ("settings".to_string(), settings.id()),
            ("banner".to_string(), banner.id()),
            ("payload".to_string(), payload.id()),
            ("socket".to_string(), socket.id()),
            ("probe".to_string(), probe.id()),
            ("deep".to_string(), deep.id()),
        ],
    })?;

    Ok(app)
}

/// A connection whose representation needs the network and always fails
struct Socket {
    peer: String,
    owner: ObjectId,
}

impl NativeObject for Socket {
    fn type_name(&self) -> &str {
        "Socket"
    }

    fn repr(&self) -> Result<String, ReprError> {
        Err(ReprError::Failed {
            kind: "ConnectionError".to_string(),
            message: format!("lost connection to {}", self.peer),
        })
    }

    fn referents(&self) -> Vec<ObjectId> {
        vec![self.owner]
    }
}

/// An object whose representation panics
struct Probe;

impl NativeObject for Probe {
    fn type_name(&self) -> &str {
        "Probe"
    }

    fn repr(&self) -> Result<String, ReprError> {
        panic!("probe representation is not implemented")
    }

    fn len(&self) -> Option<usize> {
        Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_demo_names() {
        assert_eq!("cycle".parse::<Demo>(), Ok(Demo::Cycle));
        assert_eq!("web".parse::<Demo>(), Ok(Demo::Web));
        assert_eq!(
            "nope".parse::<Demo>(),
            Err(UnknownDemo("nope".to_string()))
        );
        assert_eq!(Demo::default().to_string(), "cycle");
    }

    #[test]
    fn test_cycle_demo_root_contains_itself() {
        let (heap, root) = build(Demo::Cycle).unwrap();
        assert_eq!(heap.referents_of(root.id()).unwrap(), vec![root.id()]);
        // itself, the dict and the tuple
        assert_eq!(heap.referrers_of(root.id()).unwrap().len(), 3);
        assert_eq!(root.repr().unwrap(), "[[...]]");
    }

    #[test]
    fn test_web_demo_users_point_back() {
        let (heap, app) = build(Demo::Web).unwrap();
        assert_eq!(app.type_name().unwrap(), "App");
        let users = heap.referents_of(app.id()).unwrap()[0];
        for user in heap.referents_of(users).unwrap() {
            assert!(heap.referents_of(user).unwrap().contains(&app.id()));
        }
    }
}
