//! Device capability snapshot consumed by dispatch geometry and validation.

use std::collections::BTreeSet;

use core_types::DataType;

/// Read-only view of what a compute device can run.
///
/// Taken once after device initialization and shared by every dispatch
/// request afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeviceInfo {
    max_work_group_size: usize,
    max_work_group_dims: [usize; 3],
    supported_types: BTreeSet<DataType>,
}

impl DeviceInfo {
    /// Snapshot with a total work-group limit, no tighter per-dimension
    /// limits, and every element type available.
    pub fn new(max_work_group_size: usize) -> Self {
        let max = max_work_group_size.max(1);
        Self {
            max_work_group_size: max,
            max_work_group_dims: [max; 3],
            supported_types: DataType::ALL.iter().copied().collect(),
        }
    }

    pub fn with_dim_limits(mut self, dims: [usize; 3]) -> Self {
        self.max_work_group_dims = dims.map(|d| d.max(1));
        self
    }

    /// Maximum number of invocations in one work-group, at least 1
    pub fn max_work_group_size(&self) -> usize {
        self.max_work_group_size
    }

    /// Per-dimension work-group maxima (x, y, z), each at least 1
    pub fn max_work_group_dims(&self) -> [usize; 3] {
        self.max_work_group_dims
    }

    /// Restrict the snapshot to `types`.
    pub fn with_supported_types(mut self, types: impl IntoIterator<Item = DataType>) -> Self {
        self.supported_types = types.into_iter().collect();
        self
    }

    pub fn supports_type(&self, dt: DataType) -> bool {
        self.supported_types.contains(&dt)
    }

    pub fn supported_types(&self) -> impl Iterator<Item = DataType> + '_ {
        self.supported_types.iter().copied()
    }

    /// Device-capability query for a wgpu device.
    ///
    /// Element types without a shader spelling are never reported; `f16` and
    /// `i64` additionally need their shader features.
    pub fn from_wgpu(limits: &wgpu::Limits, features: wgpu::Features) -> Self {
        let types = DataType::ALL.iter().copied().filter(|dt| {
            dt.wgsl_name().is_some()
                && match dt {
                    DataType::F16 => features.contains(wgpu::Features::SHADER_F16),
                    DataType::I64 => features.contains(wgpu::Features::SHADER_INT64),
                    _ => true,
                }
        });

        Self::new(limits.max_compute_invocations_per_workgroup as usize)
            .with_dim_limits([
                limits.max_compute_workgroup_size_x as usize,
                limits.max_compute_workgroup_size_y as usize,
                limits.max_compute_workgroup_size_z as usize,
            ])
            .with_supported_types(types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wgpu_defaults_map_to_snapshot() {
        let info = DeviceInfo::from_wgpu(&wgpu::Limits::default(), wgpu::Features::empty());
        assert_eq!(info.max_work_group_size(), 256);
        assert_eq!(info.max_work_group_dims(), [256, 256, 64]);

        let types: Vec<_> = info.supported_types().collect();
        assert_eq!(types, vec![DataType::F32, DataType::I32, DataType::U32]);
    }

    #[test]
    fn shader_features_unlock_types() {
        let info = DeviceInfo::from_wgpu(
            &wgpu::Limits::default(),
            wgpu::Features::SHADER_F16 | wgpu::Features::SHADER_INT64,
        );
        assert!(info.supports_type(DataType::F16));
        assert!(info.supports_type(DataType::I64));
        assert!(!info.supports_type(DataType::Bool));
    }

    #[test]
    fn zero_limits_are_clamped() {
        let info = DeviceInfo::new(0).with_dim_limits([0, 4, 4]);
        assert_eq!(info.max_work_group_size(), 1);
        assert_eq!(info.max_work_group_dims(), [1, 4, 4]);
    }
}
