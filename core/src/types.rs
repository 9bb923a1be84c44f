use wgpu::{Buffer, BufferUsages, BindGroupLayout, ComputePipeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// storage buffer bound to a kernel
    Main,
    Download,
}
impl From<BufferKind> for BufferUsages {
    fn from(kind: BufferKind) -> Self {
        match kind {
            BufferKind::Main => BufferUsages::STORAGE | BufferUsages::COPY_SRC | BufferUsages::COPY_DST,
            BufferKind::Download => BufferUsages::MAP_READ | BufferUsages::COPY_DST,
        }
    }
}

/// How a kernel argument is bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingAccess {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Eq, PartialEq)]
pub struct AbstractBuffer(pub(crate) Buffer);
impl AbstractBuffer {
    pub fn size(&self) -> u64 {
        self.0.size()
    }
}

#[derive(Debug, Eq, PartialEq)]
pub struct AbstractBindGroupLayout(pub(crate) BindGroupLayout);

#[derive(Debug, Eq, PartialEq)]
pub struct AbstractComputePipeline(pub(crate) ComputePipeline);
