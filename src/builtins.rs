//! Host-provided globals bound into every interpreter at construction.

use std::time::Instant;

use crate::value::{NativeFunction, Value};

/// `clock()` — zero-arity, returns seconds elapsed since `start`.
pub fn clock(start: Instant) -> NativeFunction {
    NativeFunction::new("clock", 0, move |_args| {
        Ok(Value::Float(start.elapsed().as_secs_f64()))
    })
}
