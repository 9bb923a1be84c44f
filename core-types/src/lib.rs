mod utils;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use utils::compute_strides;

include!("generated_data_types.rs");

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Compute backend a kernel is registered for
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// wgpu compute shaders
    Gpu,
    /// host fallback implementations
    Cpu,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Gpu => f.write_str("gpu"),
            Backend::Cpu => f.write_str("cpu"),
        }
    }
}

/// Memory layout tag of a tensor.
///
/// Shapes are always given in logical order (batch, feature, spatial...);
/// the layout decides how those dimensions are laid out in memory.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Bfyx,
    Bfzyx,
    Bfwzyx,
    Yxfb,
    Byxf,
}

impl Layout {
    pub const ALL: &'static [Layout] =
        &[Layout::Bfyx, Layout::Bfzyx, Layout::Bfwzyx, Layout::Yxfb, Layout::Byxf];

    /// Number of logical dimensions
    pub fn rank(self) -> usize {
        self.dim_names().len()
    }

    /// Logical dimension names, outermost first
    pub fn dim_names(self) -> &'static [char] {
        match self {
            Layout::Bfyx | Layout::Yxfb | Layout::Byxf => &['b', 'f', 'y', 'x'],
            Layout::Bfzyx => &['b', 'f', 'z', 'y', 'x'],
            Layout::Bfwzyx => &['b', 'f', 'w', 'z', 'y', 'x'],
        }
    }

    /// Logical dimension indices in memory order, outermost first
    fn storage_order(self) -> &'static [usize] {
        match self {
            Layout::Bfyx => &[0, 1, 2, 3],
            Layout::Bfzyx => &[0, 1, 2, 3, 4],
            Layout::Bfwzyx => &[0, 1, 2, 3, 4, 5],
            Layout::Yxfb => &[2, 3, 1, 0],
            Layout::Byxf => &[0, 2, 3, 1],
        }
    }

    /// Pad `shape` with trailing 1s up to the layout rank.
    ///
    /// Returns `None` when the shape has more dimensions than the layout.
    pub fn pad_shape(self, shape: &[usize]) -> Option<Vec<usize>> {
        if shape.len() > self.rank() {
            return None;
        }
        let mut padded = shape.to_vec();
        padded.resize(self.rank(), 1);
        Some(padded)
    }

    /// Element strides of a dense tensor, indexed by logical dimension.
    ///
    /// `padded` must already have `self.rank()` entries.
    pub fn strides(self, padded: &[usize]) -> Vec<usize> {
        let order = self.storage_order();
        let in_memory: Vec<usize> = order.iter().map(|&d| padded[d]).collect();
        let memory_strides = compute_strides(&in_memory);
        let mut strides = vec![0; padded.len()];
        for (pos, &d) in order.iter().enumerate() {
            strides[d] = memory_strides[pos];
        }
        strides
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Layout::Bfyx => "bfyx",
            Layout::Bfzyx => "bfzyx",
            Layout::Bfwzyx => "bfwzyx",
            Layout::Yxfb => "yxfb",
            Layout::Byxf => "byxf",
        };
        f.write_str(name)
    }
}

/// Type alias for a buffer identifier
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BufferId(pub u64);
impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BufferId({})", self.0)
    }
}

/// Storage a tensor is bound to, when known at selection time.
///
/// Externally-allocated surfaces (video decoder output) are exposed by
/// their surface handle and plane index.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TensorMemory {
    Buffer(BufferId),
    SharedSurface { surface: u32, plane: u32 },
}

impl TensorMemory {
    /// Whether both handles refer to the same device storage.
    /// Distinct planes of one surface are separate storage.
    pub fn shares_storage_with(&self, other: &TensorMemory) -> bool {
        self == other
    }
}

/// Maximum number of dimensions for a view descriptor
pub const MAX_DIMS: usize = 8;

/// Descriptor for a view into a buffer, as bound to a kernel
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq, Eq)]
pub struct ViewDescriptor {
    pub offset:  u32,
    pub ndim:    u32,
    pub shape:   [u32; MAX_DIMS],
    pub strides: [u32; MAX_DIMS],
}

impl ViewDescriptor {
    /// Pack `shape`/`strides` (at most `MAX_DIMS` entries) into a view.
    /// Returns `None` when a value does not fit the kernels' u32 indexing.
    pub fn new(shape: &[usize], strides: &[usize], offset: usize) -> Option<Self> {
        let mut vd = ViewDescriptor::zeroed();
        vd.offset = u32::try_from(offset).ok()?;
        vd.ndim = shape.len().min(MAX_DIMS) as u32;
        for (i, (&d, &s)) in shape.iter().zip(strides).take(MAX_DIMS).enumerate() {
            vd.shape[i] = u32::try_from(d).ok()?;
            vd.strides[i] = u32::try_from(s).ok()?;
        }
        Some(vd)
    }
}
