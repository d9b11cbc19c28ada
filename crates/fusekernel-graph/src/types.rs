//! Element scalar types.
//!
//! Operands carry their element type as supplied by the front end. No
//! promotion or inference happens here; the type only selects spellings in
//! generated source.

use std::fmt;
use std::str::FromStr;

use crate::GraphError;

/// Scalar element types supported in generated kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarType {
    /// 32-bit floating point.
    F32,
    /// 64-bit floating point (requires device support).
    F64,
    /// 32-bit signed integer.
    I32,
    /// 32-bit unsigned integer.
    U32,
    /// 64-bit signed integer.
    I64,
    /// 64-bit unsigned integer.
    U64,
}

impl ScalarType {
    /// C-family spelling used in OpenCL and CUDA source.
    pub fn c_name(&self) -> &'static str {
        match self {
            ScalarType::F32 => "float",
            ScalarType::F64 => "double",
            ScalarType::I32 => "int",
            ScalarType::U32 => "unsigned int",
            ScalarType::I64 => "long",
            ScalarType::U64 => "unsigned long",
        }
    }

    /// Get the size in bytes.
    pub fn size_bytes(&self) -> usize {
        match self {
            ScalarType::F32 | ScalarType::I32 | ScalarType::U32 => 4,
            ScalarType::F64 | ScalarType::I64 | ScalarType::U64 => 8,
        }
    }

    /// Check if this is a floating point type.
    pub fn is_float(&self) -> bool {
        matches!(self, ScalarType::F32 | ScalarType::F64)
    }

    /// Common type of an arithmetic expression over `self` and `other`.
    ///
    /// Floating point wins over integers, then the wider type wins.
    pub fn promote(self, other: ScalarType) -> ScalarType {
        match (self.is_float(), other.is_float()) {
            (true, false) => self,
            (false, true) => other,
            _ if other.size_bytes() > self.size_bytes() => other,
            _ => self,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarType::F32 => write!(f, "f32"),
            ScalarType::F64 => write!(f, "f64"),
            ScalarType::I32 => write!(f, "i32"),
            ScalarType::U32 => write!(f, "u32"),
            ScalarType::I64 => write!(f, "i64"),
            ScalarType::U64 => write!(f, "u64"),
        }
    }
}

impl FromStr for ScalarType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "f32" | "float" => Ok(ScalarType::F32),
            "f64" | "double" => Ok(ScalarType::F64),
            "i32" | "int" => Ok(ScalarType::I32),
            "u32" | "uint" | "unsigned int" => Ok(ScalarType::U32),
            "i64" | "long" => Ok(ScalarType::I64),
            "u64" | "ulong" | "unsigned long" => Ok(ScalarType::U64),
            other => Err(GraphError::UnknownScalarType(other.to_string())),
        }
    }
}
