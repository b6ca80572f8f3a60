//! A node's type-erased value slot.
//!
//! Plain `Option<Box<dyn Any>>` would do the job; this thin wrapper exists
//! only so `Node`'s field list reads `value: RefCell<Value>` instead of the
//! more easily-mistaken `RefCell<Option<Box<dyn Any>>>` appearing twice
//! (once for the current value, once for the previous one kept around for
//! `Snapshot`/cutoff comparisons).

use std::any::Any;

pub enum Value {
    None,
    Some(Box<dyn Any>),
}

impl Value {
    pub fn take(&mut self) -> Option<Box<dyn Any>> {
        match std::mem::replace(self, Value::None) {
            Value::None => None,
            Value::Some(b) => Some(b),
        }
    }
}
