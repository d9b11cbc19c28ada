//! Launch profiles.
//!
//! A profile fixes the work-group shape and the number of work-groups, which
//! together determine the launch configuration, and chooses how loop indices
//! are distributed over work-items.

use serde::{Deserialize, Serialize};

use crate::{CodegenError, Dialect, Result, SourceWriter};

/// How one loop dimension is split over work-items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decomposition {
    /// Grid-stride loop: work-item `g` handles `g`, `g + G`, `g + 2G`, ...
    #[default]
    Global,
    /// Each work-group owns one contiguous chunk of the index range.
    Blocked,
}

/// Work-group shape and count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Work-items per group, per dimension.
    pub local_size: (usize, usize),
    /// Work-groups, per dimension.
    pub num_groups: (usize, usize),
    /// Index distribution.
    #[serde(default)]
    pub decomposition: Decomposition,
}

impl Profile {
    /// One-dimensional profile.
    pub fn vector(local_size: usize, num_groups: usize, decomposition: Decomposition) -> Self {
        Self {
            local_size: (local_size, 1),
            num_groups: (num_groups, 1),
            decomposition,
        }
    }

    /// Two-dimensional profile.
    pub fn matrix(
        local_size: (usize, usize),
        num_groups: (usize, usize),
        decomposition: Decomposition,
    ) -> Self {
        Self {
            local_size,
            num_groups,
            decomposition,
        }
    }

    /// Work-group shape.
    pub fn local_sizes(&self) -> (usize, usize) {
        self.local_size
    }

    /// Total work-items per dimension.
    pub fn global_sizes(&self) -> (usize, usize) {
        (
            self.local_size.0 * self.num_groups.0,
            self.local_size.1 * self.num_groups.1,
        )
    }

    /// Number of dimensions with more than one work-item.
    pub fn dimensions(&self) -> usize {
        if self.local_size.1 > 1 || self.num_groups.1 > 1 {
            2
        } else {
            1
        }
    }

    /// Check that every size is non-zero.
    pub fn validate(&self) -> Result<()> {
        let (lx, ly) = self.local_size;
        let (gx, gy) = self.num_groups;
        if lx == 0 || ly == 0 {
            return Err(CodegenError::InvalidProfile(format!(
                "local size must be non-zero, got ({lx}, {ly})"
            )));
        }
        if gx == 0 || gy == 0 {
            return Err(CodegenError::InvalidProfile(format!(
                "group count must be non-zero, got ({gx}, {gy})"
            )));
        }
        Ok(())
    }

    /// Write the loop that visits this work-item's share of `0..bound`.
    ///
    /// The caller opens the loop body block.
    pub fn loop_header(
        &self,
        writer: &mut SourceWriter,
        dialect: Dialect,
        var: &str,
        bound: &str,
        dim: u32,
    ) {
        match self.decomposition {
            Decomposition::Global => writer.line(format!(
                "for (unsigned int {var} = {}; {var} < {bound}; {var} += {})",
                dialect.global_id(dim),
                dialect.global_size(dim)
            )),
            Decomposition::Blocked => {
                let groups = dialect.num_groups(dim);
                let group = dialect.group_id(dim);
                writer.line(format!(
                    "unsigned int {var}_chunk = ({bound} + {groups} - 1) / {groups};"
                ));
                writer.line(format!(
                    "unsigned int {var}_end = min(({group} + 1) * {var}_chunk, {bound});"
                ));
                writer.line(format!(
                    "for (unsigned int {var} = {group} * {var}_chunk + {}; {var} < {var}_end; {var} += {})",
                    dialect.local_id(dim),
                    dialect.local_size(dim)
                ));
            }
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::vector(128, 128, Decomposition::Global)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        let p = Profile::matrix((16, 8), (4, 2), Decomposition::Global);
        assert_eq!(p.local_sizes(), (16, 8));
        assert_eq!(p.global_sizes(), (64, 16));
        assert_eq!(p.dimensions(), 2);
        assert_eq!(Profile::vector(128, 32, Decomposition::Global).dimensions(), 1);
    }

    #[test]
    fn test_validate() {
        assert!(Profile::default().validate().is_ok());
        let p = Profile::vector(0, 4, Decomposition::Global);
        assert!(matches!(p.validate(), Err(CodegenError::InvalidProfile(_))));
        let p = Profile::vector(64, 0, Decomposition::Blocked);
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_global_loop() {
        let mut w = SourceWriter::default();
        Profile::default().loop_header(&mut w, Dialect::OpenCl, "i", "N", 0);
        assert_eq!(
            w.finish(),
            "for (unsigned int i = get_global_id(0); i < N; i += get_global_size(0))\n"
        );
    }

    #[test]
    fn test_blocked_loop() {
        let mut w = SourceWriter::default();
        Profile::vector(64, 8, Decomposition::Blocked).loop_header(
            &mut w,
            Dialect::Cuda,
            "j",
            "N",
            1,
        );
        let text = w.finish();
        assert!(text.contains("unsigned int j_chunk = (N + gridDim.y - 1) / gridDim.y;"));
        assert!(text.contains("unsigned int j_end = min((blockIdx.y + 1) * j_chunk, N);"));
        assert!(text.contains("j = blockIdx.y * j_chunk + threadIdx.y; j < j_end; j += blockDim.y"));
    }

    #[test]
    fn test_serde_shape() {
        let p: Profile = toml::from_str("local_size = [16, 16]\nnum_groups = [8, 8]\n").unwrap();
        assert_eq!(p, Profile::matrix((16, 16), (8, 8), Decomposition::Global));

        let p: Profile =
            toml::from_str("local_size = [256, 1]\nnum_groups = [64, 1]\ndecomposition = \"blocked\"\n")
                .unwrap();
        assert_eq!(p.decomposition, Decomposition::Blocked);
    }
}
