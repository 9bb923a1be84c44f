mod bucketize;
mod error;
mod implementation_map;
mod kernel_manager;
mod primitive;

use core_types::Backend;
use ksel_core::{GpuContext, types::AbstractBuffer, types::BufferKind, work_group_count};
use ksel_ops::{ArgumentKind, KernelSelector, SelectorConfig};

pub use bucketize::attach_bucketize_impl;
pub use error::ExecError;
pub use implementation_map::{implementations, ImplAttachment, ImplFactory, ImplementationMap};
pub use kernel_manager::{render_source, KernelManager};
pub use primitive::{PrimitiveImpl, ProgramNode};


/// Builds primitives for graph nodes and launches them on one GPU device.
pub struct ExecutionEngine {
    ctx:      GpuContext,
    kernels:  KernelManager,
    selector: KernelSelector<'static>,
}

impl ExecutionEngine {
    pub fn new(ctx: GpuContext) -> Self {
        Self {
            kernels: KernelManager::new(ctx.clone()),
            selector: KernelSelector::global(),
            ctx,
        }
    }

    /// Engine on the default adapter
    pub fn with_default_device() -> Result<Self, ExecError> {
        Ok(Self::new(GpuContext::new_blocking()?))
    }

    pub fn with_config(mut self, config: SelectorConfig) -> Self {
        self.selector = self.selector.with_config(config);
        self
    }

    /// Select a kernel for `node` and wrap it into an executable primitive.
    pub fn build(&self, node: &ProgramNode) -> Result<PrimitiveImpl, ExecError> {
        implementations().create(Backend::Gpu, node, self.ctx.device_info(), &self.selector)
    }

    /// Compile (or reuse) the primitive's kernel and launch it.
    pub fn run(
        &self,
        prim:    &PrimitiveImpl,
        inputs:  &[&AbstractBuffer],
        outputs: &[&AbstractBuffer],
    ) -> Result<(), ExecError> {
        let package = prim.package();
        let (pipeline, layout) = self.kernels.compile_and_cache(package)?;

        // internal buffers live for this launch only
        let internals: Vec<AbstractBuffer> = package.internal_buffers.iter()
            .map(|b| self.ctx.create_buffer_with_data(&b.bytes, BufferKind::Main))
            .collect();

        let mut bound: Vec<&AbstractBuffer> = Vec::with_capacity(package.argument_count());
        for &arg in &package.arguments {
            let buffer = match arg {
                ArgumentKind::Input(i) => inputs.get(i).copied(),
                ArgumentKind::Output(i) => outputs.get(i).copied(),
                ArgumentKind::Internal(i) => internals.get(i),
            };
            let buffer = buffer.ok_or_else(|| ExecError::MissingArgument {
                node: prim.node_id().to_string(),
                argument: arg,
            })?;
            bound.push(buffer);
        }

        let groups = work_group_count(package.dispatch.gws, package.dispatch.lws)?;
        tracing::debug!(node = prim.node_id(), entry = prim.entry_point(), ?groups, "dispatch");
        self.ctx.dispatch(&pipeline, &layout, &bound, groups);
        Ok(())
    }
}


/* ------------------------------------------------------------------------- */
/*                                  Tests                                    */
/* ------------------------------------------------------------------------- */
#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{DataType, Layout};
    use ksel_ops::{OpKind, OpSpecific, TensorDesc};

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn run_bucketize() {
        let ctx = GpuContext::new_blocking().unwrap();
        let engine = ExecutionEngine::new(ctx.clone());

        let node = ProgramNode::new(
            "bucketize",
            OpKind::BUCKETIZE,
            [
                TensorDesc::new(DataType::F32, Layout::Bfyx, [2, 3]),
                TensorDesc::new(DataType::F32, Layout::Bfyx, [3]),
            ],
            TensorDesc::new(DataType::I32, Layout::Bfyx, [2, 3]),
        )
        .with_specific(OpSpecific::Bucketize { with_right_bound: true });
        let prim = engine.build(&node).unwrap();

        let values: [f32; 6] = [0.0, 1.0, 1.5, 2.0, 5.0, 9.0];
        let bounds: [f32; 3] = [1.0, 2.0, 5.0];
        let a = ctx.create_buffer_with_data(bytemuck::cast_slice(&values), BufferKind::Main);
        let b = ctx.create_buffer_with_data(bytemuck::cast_slice(&bounds), BufferKind::Main);
        let c = ctx.create_buffer(6 * 4, BufferKind::Main);

        engine.run(&prim, &[&a, &b], &[&c]).unwrap();

        let out: Vec<i32> = ctx.read_buffer(&c).unwrap()
            .chunks_exact(4)
            .map(|w| i32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .collect();
        assert_eq!(out, vec![0, 0, 1, 1, 2, 3]);
    }
}
