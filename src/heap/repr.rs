//! Full textual representation of heap objects
//!
//! Containers are printed recursively, the way an interactive interpreter
//! would echo them: `[1, 'a', {...}]`. An object that is already being
//! printed further up the recursion prints as `[...]`, `{...}`, `(...)` or
//! `<Type ...>` instead of recursing forever.
//!
//! This produces the *untruncated* text. Capping it for display is the job of
//! [`crate::bridge::safe_repr`].

use super::value::Value;
use super::ObjectId;
use crate::error::{HeapError, ReprError};
use rustc_hash::FxHashMap;
use std::fmt::Write;

/// Maximum nesting before giving up with [`ReprError::TooDeep`]
pub const MAX_REPR_DEPTH: usize = 64;

/// Render the object `id` using the heap contents in `objects`
pub(crate) fn repr_object(
    objects: &FxHashMap<ObjectId, Value>,
    id: ObjectId,
) -> Result<String, ReprError> {
    let value = objects.get(&id).ok_or(HeapError::Collected(id))?;
    let mut printer = Printer {
        objects,
        out: String::new(),
        active: vec![id],
    };
    printer.write_value(value, 0)?;
    Ok(printer.out)
}

struct Printer<'a> {
    objects: &'a FxHashMap<ObjectId, Value>,
    out: String,
    active: Vec<ObjectId>, // objects currently being printed
}

impl Printer<'_> {
    fn write_child(&mut self, id: ObjectId, depth: usize) -> Result<(), ReprError> {
        let Some(value) = self.objects.get(&id) else {
            // A dangling edge inside a container is not the container's fault
            let _ = write!(self.out, "<collected {}>", id);
            return Ok(());
        };

        if self.active.contains(&id) {
            self.out.push_str(match value {
                Value::List(_) => "[...]",
                Value::Set(_) | Value::Dict(_) => "{...}",
                Value::Tuple(_) => "(...)",
                _ => "...",
            });
            return Ok(());
        }

        self.active.push(id);
        let result = self.write_value(value, depth + 1);
        self.active.pop();
        result
    }

    fn write_items(
        &mut self,
        items: &[ObjectId],
        open: &str,
        close: &str,
        depth: usize,
    ) -> Result<(), ReprError> {
        self.out.push_str(open);
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.write_child(*item, depth)?;
        }
        self.out.push_str(close);
        Ok(())
    }

    fn write_value(&mut self, value: &Value, depth: usize) -> Result<(), ReprError> {
        if depth > MAX_REPR_DEPTH {
            return Err(ReprError::TooDeep);
        }

        match value {
            Value::None => self.out.push_str("None"),
            Value::Bool(true) => self.out.push_str("True"),
            Value::Bool(false) => self.out.push_str("False"),
            Value::Int(n) => {
                let _ = write!(self.out, "{}", n);
            }
            Value::Float(x) => {
                let _ = write!(self.out, "{:?}", x);
            }
            Value::Str(s) => write_str_literal(&mut self.out, s),
            Value::Bytes(b) => write_bytes_literal(&mut self.out, b),
            Value::List(items) => self.write_items(items, "[", "]", depth)?,
            Value::Tuple(items) if items.len() == 1 => self.write_items(items, "(", ",)", depth)?,
            Value::Tuple(items) => self.write_items(items, "(", ")", depth)?,
            Value::Set(items) if items.is_empty() => self.out.push_str("set()"),
            Value::Set(items) => self.write_items(items, "{", "}", depth)?,
            Value::Dict(entries) => {
                self.out.push('{');
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.write_child(*k, depth)?;
                    self.out.push_str(": ");
                    self.write_child(*v, depth)?;
                }
                self.out.push('}');
            }
            Value::Record { type_name, fields } => {
                self.out.push_str(type_name);
                self.out.push('(');
                for (i, (name, id)) in fields.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push_str(name);
                    self.out.push('=');
                    self.write_child(*id, depth)?;
                }
                self.out.push(')');
            }
            Value::Native(obj) => {
                let text = obj.repr()?;
                self.out.push_str(&text);
            }
        }
        Ok(())
    }
}

/// Quote a string, preferring single quotes and escaping control characters
fn write_str_literal(out: &mut String, s: &str) {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
}

fn write_bytes_literal(out: &mut String, bytes: &[u8]) {
    out.push_str("b'");
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(out, "\\x{:02x}", b);
            }
        }
    }
    out.push('\'');
}
