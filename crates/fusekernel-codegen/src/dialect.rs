//! Target dialects.
//!
//! The generated kernel body is plain C-family code; only the kernel
//! qualifier, the parameter address spaces, and the work-item builtins differ
//! between targets.

use std::fmt;
use std::str::FromStr;

use crate::CodegenError;

/// Target kernel language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// OpenCL C.
    #[default]
    OpenCl,
    /// CUDA C.
    Cuda,
}

impl Dialect {
    /// Kernel function qualifier and return type.
    pub fn kernel_qualifier(&self) -> &'static str {
        match self {
            Dialect::OpenCl => "__kernel void",
            Dialect::Cuda => "extern \"C\" __global__ void",
        }
    }

    /// Global work-item index along `dim`.
    pub fn global_id(&self, dim: u32) -> String {
        match self {
            Dialect::OpenCl => format!("get_global_id({dim})"),
            Dialect::Cuda => {
                let axis = cuda_axis(dim);
                format!("(blockIdx.{axis} * blockDim.{axis} + threadIdx.{axis})")
            }
        }
    }

    /// Total number of work-items along `dim`.
    pub fn global_size(&self, dim: u32) -> String {
        match self {
            Dialect::OpenCl => format!("get_global_size({dim})"),
            Dialect::Cuda => {
                let axis = cuda_axis(dim);
                format!("(blockDim.{axis} * gridDim.{axis})")
            }
        }
    }

    /// Work-group index along `dim`.
    pub fn group_id(&self, dim: u32) -> String {
        match self {
            Dialect::OpenCl => format!("get_group_id({dim})"),
            Dialect::Cuda => format!("blockIdx.{}", cuda_axis(dim)),
        }
    }

    /// Work-item index within its group along `dim`.
    pub fn local_id(&self, dim: u32) -> String {
        match self {
            Dialect::OpenCl => format!("get_local_id({dim})"),
            Dialect::Cuda => format!("threadIdx.{}", cuda_axis(dim)),
        }
    }

    /// Work-group size along `dim`.
    pub fn local_size(&self, dim: u32) -> String {
        match self {
            Dialect::OpenCl => format!("get_local_size({dim})"),
            Dialect::Cuda => format!("blockDim.{}", cuda_axis(dim)),
        }
    }

    /// Number of work-groups along `dim`.
    pub fn num_groups(&self, dim: u32) -> String {
        match self {
            Dialect::OpenCl => format!("get_num_groups({dim})"),
            Dialect::Cuda => format!("gridDim.{}", cuda_axis(dim)),
        }
    }

    /// Declaration of a device-memory pointer parameter.
    pub fn pointer_parameter(&self, ty: &str, name: &str) -> String {
        match self {
            Dialect::OpenCl => format!("__global {ty}* {name}"),
            Dialect::Cuda => format!("{ty}* __restrict__ {name}"),
        }
    }

    /// Declaration of a by-value parameter.
    pub fn value_parameter(&self, ty: &str, name: &str) -> String {
        format!("{ty} {name}")
    }

    /// Conventional source file extension.
    pub fn file_extension(&self) -> &'static str {
        match self {
            Dialect::OpenCl => "cl",
            Dialect::Cuda => "cu",
        }
    }
}

fn cuda_axis(dim: u32) -> char {
    match dim {
        0 => 'x',
        1 => 'y',
        _ => 'z',
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::OpenCl => write!(f, "opencl"),
            Dialect::Cuda => write!(f, "cuda"),
        }
    }
}

impl FromStr for Dialect {
    type Err = CodegenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "opencl" | "cl" | "ocl" => Ok(Dialect::OpenCl),
            "cuda" | "cu" => Ok(Dialect::Cuda),
            other => Err(CodegenError::UnknownDialect(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opencl_builtins() {
        let d = Dialect::OpenCl;
        assert_eq!(d.global_id(0), "get_global_id(0)");
        assert_eq!(d.global_size(1), "get_global_size(1)");
        assert_eq!(d.pointer_parameter("float", "x"), "__global float* x");
    }

    #[test]
    fn test_cuda_builtins() {
        let d = Dialect::Cuda;
        assert_eq!(d.global_id(0), "(blockIdx.x * blockDim.x + threadIdx.x)");
        assert_eq!(d.global_size(1), "(blockDim.y * gridDim.y)");
        assert_eq!(d.num_groups(0), "gridDim.x");
        assert_eq!(d.pointer_parameter("double", "A"), "double* __restrict__ A");
        assert!(d.kernel_qualifier().contains("__global__"));
    }

    #[test]
    fn test_parse() {
        assert_eq!("OpenCL".parse::<Dialect>().unwrap(), Dialect::OpenCl);
        assert_eq!("cu".parse::<Dialect>().unwrap(), Dialect::Cuda);
        assert!(matches!(
            "wgsl".parse::<Dialect>(),
            Err(CodegenError::UnknownDialect(_))
        ));
    }
}
