/// Supported element types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Bool,
    U8,
    I8,
    F16,
    F32,
    I32,
    U32,
    I64,
}

impl DataType {
    /// Every element type, in declaration order
    pub const ALL: &'static [DataType] = &[
        DataType::Bool,
        DataType::U8,
        DataType::I8,
        DataType::F16,
        DataType::F32,
        DataType::I32,
        DataType::U32,
        DataType::I64,
    ];

    /// Size of one element, in bytes
    pub fn size_in_bytes(self) -> usize {
        match self {
            DataType::Bool => 1,
            DataType::U8 => 1,
            DataType::I8 => 1,
            DataType::F16 => 2,
            DataType::F32 => 4,
            DataType::I32 => 4,
            DataType::U32 => 4,
            DataType::I64 => 8,
        }
    }

    /// Lower-case name used in diagnostics and JIT constants
    pub fn label(self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::U8 => "u8",
            DataType::I8 => "i8",
            DataType::F16 => "f16",
            DataType::F32 => "f32",
            DataType::I32 => "i32",
            DataType::U32 => "u32",
            DataType::I64 => "i64",
        }
    }

    /// WGSL spelling, if the type can be bound by a shader
    pub fn wgsl_name(self) -> Option<&'static str> {
        match self {
            DataType::Bool => None,
            DataType::U8 => None,
            DataType::I8 => None,
            DataType::F16 => Some("f16"),
            DataType::F32 => Some("f32"),
            DataType::I32 => Some("i32"),
            DataType::U32 => Some("u32"),
            DataType::I64 => Some("i64"),
        }
    }
}
