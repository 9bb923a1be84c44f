//! Work partitioning for kernel launches.

use ksel_core::DeviceInfo;

/// Global and local work sizes of one launch
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DispatchData {
    pub gws: [usize; 3],
    pub lws: [usize; 3],
}

impl DispatchData {
    /// Geometry for `gws` with the best local size the device allows.
    pub fn for_global(gws: [usize; 3], info: &DeviceInfo) -> Self {
        Self { gws, lws: optimal_local_work_group_sizes(gws, info) }
    }
}

/// Local sizes tried per dimension, best first
pub const OPTIMAL_LWS_VALUES: [usize; 17] =
    [256, 227, 224, 192, 160, 128, 96, 64, 32, 16, 8, 7, 6, 5, 4, 2, 1];

/// Per dimension, the largest tabled value that divides the global size and
/// keeps the work-group within the device limits.
pub fn optimal_local_work_group_sizes(gws: [usize; 3], info: &DeviceInfo) -> [usize; 3] {
    let mut lws = [1usize; 3];
    let mut total = 1usize;
    for i in 0..3 {
        let rest = (info.max_work_group_size() / total).min(info.max_work_group_dims()[i]);
        let size = OPTIMAL_LWS_VALUES
            .iter()
            .copied()
            .find(|&v| v <= rest && gws[i] % v == 0)
            .unwrap_or(1);
        lws[i] = size;
        total *= size;
    }
    lws
}
