//! Compile-time constants spliced into kernel source templates.

use std::fmt;

use core_types::DataType;
use derive_more::From;

use crate::params::{OpParams, TensorDesc};

/// Value of one named constant
#[derive(Clone, Debug, PartialEq, Eq, Hash, From)]
pub enum JitValue {
    Int(i64),
    Bool(bool),
    Type(DataType),
    Text(String),
}

impl From<usize> for JitValue {
    fn from(v: usize) -> Self {
        JitValue::Int(v as i64)
    }
}

impl From<&str> for JitValue {
    fn from(v: &str) -> Self {
        JitValue::Text(v.to_string())
    }
}

impl fmt::Display for JitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JitValue::Int(v) => write!(f, "{v}"),
            JitValue::Bool(v) => write!(f, "{}", u8::from(*v)),
            JitValue::Type(dt) => write!(f, "{dt}"),
            JitValue::Text(s) => f.write_str(s),
        }
    }
}

/// Ordered set of named constants. Names are unique; re-adding a name
/// replaces its value in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JitConstants {
    entries: Vec<(String, JitValue)>,
}

impl JitConstants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl Into<JitValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn merge(&mut self, other: JitConstants) {
        for (name, value) in other.entries {
            self.add(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&JitValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JitValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Constants describing one tensor, prefixed with `prefix`.
pub fn tensor_jit_constants(prefix: &str, t: &TensorDesc) -> JitConstants {
    let mut jit = JitConstants::new();
    let dims = t.padded_shape();
    let pitches = t.pitches();

    jit.add(format!("{prefix}_TYPE"), t.dtype);
    jit.add(format!("{prefix}_LAYOUT"), t.layout.to_string());
    jit.add(format!("{prefix}_DIMS"), dims.len());
    for (i, name) in t.layout.dim_names().iter().enumerate() {
        let name = name.to_ascii_uppercase();
        jit.add(format!("{prefix}_SIZE_{name}"), dims[i]);
        jit.add(format!("{prefix}_PITCH_{name}"), pitches[i]);
    }
    jit.add(format!("{prefix}_OFFSET"), 0usize);
    jit.add(format!("{prefix}_LENGTH"), t.element_count());
    jit
}

/// Base parameter constants: one block per input (`INPUT0`, `INPUT1`, ...)
/// and one for the output.
pub fn make_base_params_jit_constants(params: &OpParams) -> JitConstants {
    let mut jit = JitConstants::new();
    for (i, t) in params.inputs().iter().enumerate() {
        jit.merge(tensor_jit_constants(&format!("INPUT{i}"), t));
    }
    jit.merge(tensor_jit_constants("OUTPUT", params.output()));
    jit
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Layout;

    #[test]
    fn add_replaces_in_place() {
        let mut jit = JitConstants::new();
        jit.add("A", 1usize);
        jit.add("B", true);
        jit.add("A", 7usize);
        let names: Vec<_> = jit.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(jit.get("A"), Some(&JitValue::Int(7)));
        assert_eq!(jit.get("B").map(ToString::to_string).as_deref(), Some("1"));
    }

    #[test]
    fn tensor_constants_use_layout_dims() {
        let t = TensorDesc::new(DataType::F32, Layout::Bfzyx, [2, 3, 4]);
        let jit = tensor_jit_constants("INPUT0", &t);
        assert_eq!(jit.get("INPUT0_TYPE"), Some(&JitValue::Type(DataType::F32)));
        assert_eq!(jit.get("INPUT0_DIMS"), Some(&JitValue::Int(5)));
        assert_eq!(jit.get("INPUT0_SIZE_Z"), Some(&JitValue::Int(4)));
        assert_eq!(jit.get("INPUT0_SIZE_X"), Some(&JitValue::Int(1)));
        assert_eq!(jit.get("INPUT0_PITCH_B"), Some(&JitValue::Int(12)));
        assert_eq!(jit.get("INPUT0_LENGTH"), Some(&JitValue::Int(24)));
        assert!(jit.get("INPUT0_SIZE_W").is_none());
    }
}
