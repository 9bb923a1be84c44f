pub mod device;
pub mod types;

use anyhow::{Context, Result};
use std::sync::Arc;
use wgpu::{
    util::DeviceExt, BindGroupLayoutDescriptor, BindGroupLayoutEntry, ShaderStages,
    CommandEncoder, CommandEncoderDescriptor, Device, Instance, PollType, ComputePipelineDescriptor,
    PipelineLayoutDescriptor, Queue, ShaderModule, ShaderModuleDescriptor, ShaderSource,
    PipelineCompilationOptions, BindGroupEntry, BindGroupDescriptor, ComputePassDescriptor,
};

pub use device::DeviceInfo;
use types::{AbstractBuffer, AbstractBindGroupLayout, AbstractComputePipeline, BindingAccess, BufferKind};

/// Context for GPU operations
#[derive(Clone)]
pub struct GpuContext {
    pub device: Arc<Device>,
    pub queue:  Arc<Queue>,
    info:       DeviceInfo,
}

impl GpuContext {
    /* ------------------------------------------------------------------ */
    /* Construction                                                       */
    /* ------------------------------------------------------------------ */
    pub async fn new() -> Result<Self> {
        let instance = Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .map_err(|e| anyhow::anyhow!("No suitable adapter found: {}", e))?;

        // Ask for the optional shader types the adapter can provide
        let wanted = wgpu::Features::SHADER_F16 | wgpu::Features::SHADER_INT64;
        let descriptor = wgpu::DeviceDescriptor {
            required_features: adapter.features() & wanted,
            ..Default::default()
        };
        let (device, queue) = adapter.request_device(&descriptor).await?;

        let info = DeviceInfo::from_wgpu(&device.limits(), device.features());
        tracing::info!(
            adapter = %adapter.get_info().name,
            max_work_group_size = info.max_work_group_size(),
            "gpu context created"
        );

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            info,
        })
    }

    /// Blocking variant of [`GpuContext::new`].
    pub fn new_blocking() -> Result<Self> {
        pollster::block_on(Self::new())
    }

    /// Capability snapshot taken when the device was created.
    pub fn device_info(&self) -> &DeviceInfo {
        &self.info
    }

    /* ------------------------------------------------------------------ */
    /* Buffers                                                            */
    /* ------------------------------------------------------------------ */

    /// Allocate an uninitialised GPU buffer.
    pub fn create_buffer(&self, size: u64, usage: BufferKind) -> AbstractBuffer {
        AbstractBuffer(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size,
            usage: usage.into(),
            mapped_at_creation: false,
        }))
    }

    /// Allocate and initialise a GPU buffer from host data.
    pub fn create_buffer_with_data(&self, data: &[u8], usage: BufferKind) -> AbstractBuffer {
        AbstractBuffer(self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: None,
            contents: data,
            usage: usage.into(),
        }))
    }

    /// Blocking read of a whole storage buffer back to the host.
    pub fn read_buffer(&self, buffer: &AbstractBuffer) -> Result<Vec<u8>> {
        let size = buffer.size();
        let staging = self.create_buffer(size, BufferKind::Download);
        let mut enc = self.create_encoder("readback");
        enc.copy_buffer_to_buffer(&buffer.0, 0, &staging.0, 0, size);
        self.queue.submit(Some(enc.finish()));

        let slice = staging.0.slice(..);
        slice.map_async(wgpu::MapMode::Read, |_| ());
        self.device.poll(PollType::Wait)?;
        let data = slice.get_mapped_range().to_vec();
        staging.0.unmap();
        Ok(data)
    }

    /* ------------------------------------------------------------------ */
    /* Pipelines                                                          */
    /* ------------------------------------------------------------------ */

    /// Storage-buffer layout with one binding per kernel argument, in order.
    pub fn create_storage_layout(&self, bindings: &[BindingAccess]) -> Arc<AbstractBindGroupLayout> {
        let entries: Vec<BindGroupLayoutEntry> = bindings
            .iter()
            .enumerate()
            .map(|(i, access)| BindGroupLayoutEntry {
                binding: i as u32,
                visibility: ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage {
                        read_only: *access == BindingAccess::ReadOnly,
                    },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();

        let bgl = self.device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("storage-layout"),
            entries: &entries,
        });
        Arc::new(AbstractBindGroupLayout(bgl))
    }

    /// Create a compute pipeline from WGSL source code.
    pub fn create_compute_pipeline(
        &self,
        src: &str,
        entry: &str,
        layout: &AbstractBindGroupLayout,
    ) -> Arc<AbstractComputePipeline> {
        let module: ShaderModule = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some(entry),
            source: ShaderSource::Wgsl(src.into()),
        });
        let pipeline_layout = self.device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("compute-pl-layout"),
            bind_group_layouts: &[&layout.0],
            push_constant_ranges: &[],
        });
        let pipeline = self.device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some(entry),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some(entry),
            compilation_options: PipelineCompilationOptions::default(),
            cache: None,
        });
        Arc::new(AbstractComputePipeline(pipeline))
    }

    /* ------------------------------------------------------------------ */
    /* Dispatch                                                           */
    /* ------------------------------------------------------------------ */

    fn create_encoder(&self, label: &str) -> CommandEncoder {
        self.device
            .create_command_encoder(&CommandEncoderDescriptor { label: Some(label) })
    }

    /// Bind `buffers` in argument order and launch `groups` work-groups.
    pub fn dispatch(
        &self,
        pipeline: &AbstractComputePipeline,
        layout: &AbstractBindGroupLayout,
        buffers: &[&AbstractBuffer],
        groups: [u32; 3],
    ) {
        let entries: Vec<BindGroupEntry> = buffers
            .iter()
            .enumerate()
            .map(|(i, b)| BindGroupEntry {
                binding: i as u32,
                resource: b.0.as_entire_binding(),
            })
            .collect();
        let bg = self.device.create_bind_group(&BindGroupDescriptor {
            label: Some("storage-bg"),
            layout: &layout.0,
            entries: &entries,
        });

        let mut enc = self.create_encoder("dispatch");
        {
            let mut pass = enc.begin_compute_pass(&ComputePassDescriptor::default());
            pass.set_pipeline(&pipeline.0);
            pass.set_bind_group(0, &bg, &[]);
            pass.dispatch_workgroups(groups[0], groups[1], groups[2]);
        }
        self.queue.submit(Some(enc.finish()));
    }
}

/// Number of work-groups needed to cover `global` with `local`-sized groups.
pub fn work_group_count(global: [usize; 3], local: [usize; 3]) -> Result<[u32; 3]> {
    let mut groups = [1u32; 3];
    for i in 0..3 {
        let count = global[i].div_ceil(local[i].max(1));
        groups[i] = u32::try_from(count)
            .with_context(|| format!("work-group count {count} in dimension {i} exceeds u32"))?;
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_count_covers_global_size() {
        assert_eq!(work_group_count([4, 1, 1], [4, 1, 1]).unwrap(), [1, 1, 1]);
        assert_eq!(work_group_count([100, 3, 1], [32, 1, 1]).unwrap(), [4, 3, 1]);
    }

    #[test]
    fn group_count_past_u32_is_an_error() {
        let wide = u32::MAX as usize + 1;
        assert!(work_group_count([wide, 1, 1], [1, 1, 1]).is_err());
        assert!(work_group_count([wide, 1, 1], [2, 1, 1]).is_ok());
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn test_gpu_context_creation() {
        let ctx = GpuContext::new_blocking().expect("Failed to create GPU context");
        let limits = ctx.device.limits();

        assert!(limits.max_compute_invocations_per_workgroup > 0);
        assert_eq!(
            ctx.device_info().max_work_group_size(),
            limits.max_compute_invocations_per_workgroup as usize
        );
    }
}
