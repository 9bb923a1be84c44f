//! Reference bucketize: for every value, the index of the bucket it falls
//! into given sorted boundaries.

use core_types::{Backend, DataType, Layout, ViewDescriptor};

use crate::dispatch::DispatchData;
use crate::jit::{make_base_params_jit_constants, JitConstants};
use crate::kernel::{check_common, KernelCandidate};
use crate::key::CapabilityKey;
use crate::params::{OpKind, OpParams, OpSpecific};
use crate::register_candidate;
use crate::types::{InternalBuffer, KernelPriority};

const SOURCE: &str = include_str!("bucketize_ref.wgsl");

/// Element types accepted for values and boundaries
pub const INPUT_TYPES: &[DataType] = &[
    DataType::U8, DataType::I8, DataType::F16, DataType::F32, DataType::I32, DataType::I64,
];
/// Element types of the bucket indices
pub const OUTPUT_TYPES: &[DataType] = &[DataType::I32, DataType::I64];
pub const LAYOUTS: &[Layout] = &[Layout::Bfyx, Layout::Bfzyx, Layout::Bfwzyx];

/// Reference kernel, one work item per output batch entry
pub struct BucketizeKernelRef {
    key: CapabilityKey,
}

impl BucketizeKernelRef {
    pub const NAME: &'static str = "bucketize_ref";

    pub fn new() -> Self {
        let key = CapabilityKey::new()
            .enable_inputs(INPUT_TYPES, LAYOUTS)
            .enable_outputs(OUTPUT_TYPES, LAYOUTS)
            .enable_different_types()
            .enable_batching();
        Self { key }
    }
}

impl Default for BucketizeKernelRef {
    fn default() -> Self {
        Self::new()
    }
}

impl KernelCandidate for BucketizeKernelRef {
    fn name(&self) -> &'static str { Self::NAME }

    fn kind(&self) -> OpKind { OpKind::BUCKETIZE }

    fn supported_key(&self) -> &CapabilityKey { &self.key }

    fn priority(&self) -> KernelPriority {
        KernelPriority::DONT_USE_IF_HAVE_SOMETHING_ELSE
    }

    fn source_template(&self) -> &'static str { SOURCE }

    fn validate(&self, params: &OpParams) -> bool {
        if !check_common(Self::NAME, &self.kind(), &self.key, params) {
            return false;
        }
        // the kernel reads values while writing buckets
        let out = params.output();
        if params.inputs().iter().any(|t| t.aliases(out)) {
            tracing::debug!(kernel = Self::NAME, layer = params.layer_id(), "rejected: output aliases an input");
            return false;
        }
        matches!(params.specific(), OpSpecific::Bucketize { .. })
    }

    fn dispatch_data(&self, params: &OpParams) -> DispatchData {
        let dispatch = DispatchData::for_global([params.output().batch(), 1, 1], params.device());
        tracing::trace!(kernel = Self::NAME, gws = ?dispatch.gws, lws = ?dispatch.lws, "dispatch");
        dispatch
    }

    fn jit_constants(&self, params: &OpParams) -> JitConstants {
        let mut jit = make_base_params_jit_constants(params);
        let with_right_bound = match params.specific() {
            OpSpecific::Bucketize { with_right_bound } => *with_right_bound,
            OpSpecific::None => false,
        };
        jit.add("WITH_RIGHT_BOUND", with_right_bound);
        jit
    }

    fn internal_buffers(&self, params: &OpParams) -> Option<Vec<InternalBuffer>> {
        let input_views: Vec<ViewDescriptor> = params.inputs().iter()
            .map(|t| t.view())
            .collect::<Option<_>>()?;
        let output_view = params.output().view()?;
        Some(vec![
            InternalBuffer {
                name: "input_views",
                bytes: bytemuck::cast_slice(&input_views).to_vec(),
            },
            InternalBuffer {
                name: "output_view",
                bytes: bytemuck::bytes_of(&output_view).to_vec(),
            },
        ])
    }
}

register_candidate!(Backend::Gpu, BucketizeKernelRef);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jit::JitValue;
    use crate::params::TensorDesc;
    use crate::types::ArgumentKind;
    use core_types::{BufferId, TensorMemory, MAX_DIMS};
    use ksel_core::DeviceInfo;
    use proptest::prelude::*;

    fn params_with(
        values: TensorDesc,
        boundaries: TensorDesc,
        output: TensorDesc,
        device: DeviceInfo,
    ) -> OpParams {
        OpParams::builder(OpKind::BUCKETIZE, device)
            .layer_id("bucketize:0")
            .specific(OpSpecific::Bucketize { with_right_bound: true })
            .inputs([values, boundaries])
            .output(output)
            .build()
            .unwrap()
    }

    fn scenario_a() -> OpParams {
        params_with(
            TensorDesc::new(DataType::F32, Layout::Bfyx, [4, 3]),
            TensorDesc::new(DataType::F32, Layout::Bfyx, [5]),
            TensorDesc::new(DataType::I32, Layout::Bfyx, [4, 3]),
            DeviceInfo::new(256),
        )
    }

    #[test]
    fn validates_supported_combination() {
        let k = BucketizeKernelRef::new();
        assert!(k.validate(&scenario_a()));
    }

    #[test]
    fn rejects_unsupported_types_and_layouts() {
        let k = BucketizeKernelRef::new();
        let bool_values = params_with(
            TensorDesc::new(DataType::Bool, Layout::Bfyx, [4, 3]),
            TensorDesc::new(DataType::F32, Layout::Bfyx, [5]),
            TensorDesc::new(DataType::I32, Layout::Bfyx, [4, 3]),
            DeviceInfo::new(256),
        );
        assert!(!k.validate(&bool_values));
        assert!(k.assemble(&bool_values).is_none());

        let yxfb = params_with(
            TensorDesc::new(DataType::F32, Layout::Yxfb, [4, 3]),
            TensorDesc::new(DataType::F32, Layout::Bfyx, [5]),
            TensorDesc::new(DataType::I32, Layout::Bfyx, [4, 3]),
            DeviceInfo::new(256),
        );
        assert!(!k.validate(&yxfb));

        let float_out = params_with(
            TensorDesc::new(DataType::F32, Layout::Bfyx, [4, 3]),
            TensorDesc::new(DataType::F32, Layout::Bfyx, [5]),
            TensorDesc::new(DataType::F32, Layout::Bfyx, [4, 3]),
            DeviceInfo::new(256),
        );
        assert!(!k.validate(&float_out));
    }

    #[test]
    fn rejects_other_kinds() {
        let k = BucketizeKernelRef::new();
        let relu = OpParams::builder(OpKind::new("relu"), DeviceInfo::new(256))
            .input(TensorDesc::new(DataType::F32, Layout::Bfyx, [4, 3]))
            .input(TensorDesc::new(DataType::F32, Layout::Bfyx, [5]))
            .output(TensorDesc::new(DataType::I32, Layout::Bfyx, [4, 3]))
            .build()
            .unwrap();
        assert!(!k.validate(&relu));
    }

    #[test]
    fn rejects_types_the_device_lacks() {
        let k = BucketizeKernelRef::new();
        let device = DeviceInfo::new(256).with_supported_types([DataType::F32, DataType::I32]);
        let f16 = params_with(
            TensorDesc::new(DataType::F16, Layout::Bfyx, [4, 3]),
            TensorDesc::new(DataType::F16, Layout::Bfyx, [5]),
            TensorDesc::new(DataType::I32, Layout::Bfyx, [4, 3]),
            device.clone(),
        );
        assert!(!k.validate(&f16));

        let f32 = params_with(
            TensorDesc::new(DataType::F32, Layout::Bfyx, [4, 3]),
            TensorDesc::new(DataType::F32, Layout::Bfyx, [5]),
            TensorDesc::new(DataType::I32, Layout::Bfyx, [4, 3]),
            device,
        );
        assert!(k.validate(&f32));
    }

    #[test]
    fn rejects_in_place_output() {
        let k = BucketizeKernelRef::new();
        let surface = TensorMemory::SharedSurface { surface: 3, plane: 0 };
        let aliased = params_with(
            TensorDesc::new(DataType::I32, Layout::Bfyx, [4, 3]).with_memory(surface),
            TensorDesc::new(DataType::I32, Layout::Bfyx, [5]),
            TensorDesc::new(DataType::I32, Layout::Bfyx, [4, 3]).with_memory(surface),
            DeviceInfo::new(256),
        );
        assert!(!k.validate(&aliased));

        let separate = params_with(
            TensorDesc::new(DataType::I32, Layout::Bfyx, [4, 3]).with_memory(surface),
            TensorDesc::new(DataType::I32, Layout::Bfyx, [5]),
            TensorDesc::new(DataType::I32, Layout::Bfyx, [4, 3])
                .with_memory(TensorMemory::Buffer(BufferId(9))),
            DeviceInfo::new(256),
        );
        assert!(k.validate(&separate));
    }

    #[test]
    fn assembles_package() {
        let k = BucketizeKernelRef::new();
        let params = scenario_a();
        let pkg = k.assemble(&params).unwrap();

        assert_eq!(pkg.kernel_name, "bucketize_ref");
        assert!(pkg.entry_point.starts_with("bucketize_ref_bucketize_0_"));
        assert_eq!(pkg.dispatch.gws, [4, 1, 1]);
        assert_eq!(pkg.dispatch.lws, [4, 1, 1]);
        assert_eq!(
            pkg.arguments,
            vec![
                ArgumentKind::Input(0),
                ArgumentKind::Input(1),
                ArgumentKind::Output(0),
                ArgumentKind::Internal(0),
                ArgumentKind::Internal(1),
            ]
        );
        assert_eq!(pkg.internal_buffers.len(), 2);
        let view_size = 4 * (2 + 2 * MAX_DIMS);
        assert_eq!(pkg.internal_buffers[0].bytes.len(), 2 * view_size);
        assert_eq!(pkg.internal_buffers[1].bytes.len(), view_size);

        let out_view: ViewDescriptor = bytemuck::pod_read_unaligned(&pkg.internal_buffers[1].bytes);
        assert_eq!(pkg.jit.get("OUTPUT_PITCH_B"), Some(&JitValue::Int(out_view.strides[0] as i64)));
        assert_eq!(pkg.jit.get("OUTPUT_SIZE_B"), Some(&JitValue::Int(out_view.shape[0] as i64)));

        assert_eq!(pkg.jit.get("WITH_RIGHT_BOUND"), Some(&JitValue::Bool(true)));
        assert_eq!(pkg.jit.get("INPUT1_LENGTH"), Some(&JitValue::Int(5)));
        assert_eq!(pkg.jit.get("OUTPUT_TYPE"), Some(&JitValue::Type(DataType::I32)));
        assert_eq!(pkg.jit.get("KERNEL_NAME"), Some(&JitValue::Text(pkg.entry_point.clone())));
    }

    #[test]
    fn assembly_is_deterministic() {
        let k = BucketizeKernelRef::new();
        assert_eq!(k.assemble(&scenario_a()), k.assemble(&scenario_a()));
    }

    #[test]
    fn right_bound_flag_changes_constants_and_entry_point() {
        let k = BucketizeKernelRef::new();
        let left = OpParams::builder(OpKind::BUCKETIZE, DeviceInfo::new(256))
            .layer_id("bucketize:0")
            .specific(OpSpecific::Bucketize { with_right_bound: false })
            .inputs(scenario_a().inputs().to_vec())
            .output(scenario_a().output().clone())
            .build()
            .unwrap();
        let l = k.assemble(&left).unwrap();
        let r = k.assemble(&scenario_a()).unwrap();
        assert_eq!(l.jit.get("WITH_RIGHT_BOUND"), Some(&JitValue::Bool(false)));
        assert_ne!(l.entry_point, r.entry_point);
    }

    proptest! {
        #[test]
        fn geometry_follows_output_batch(
            batch in 1usize..2048,
            feature in 1usize..16,
            max in 1usize..1025,
        ) {
            let k = BucketizeKernelRef::new();
            let params = params_with(
                TensorDesc::new(DataType::F32, Layout::Bfyx, [batch, feature]),
                TensorDesc::new(DataType::F32, Layout::Bfyx, [7]),
                TensorDesc::new(DataType::I64, Layout::Bfyx, [batch, feature]),
                DeviceInfo::new(max),
            );
            let pkg = k.assemble(&params).unwrap();
            prop_assert_eq!(pkg.dispatch.gws, [batch, 1, 1]);
            prop_assert!(pkg.dispatch.lws[0] <= max);
            prop_assert_eq!(batch % pkg.dispatch.lws[0], 0);
            prop_assert_eq!(&pkg, &k.assemble(&params).unwrap());
        }

        #[test]
        fn out_of_key_inputs_never_validate(
            dtype in proptest::sample::select(DataType::ALL.to_vec()),
            layout in proptest::sample::select(Layout::ALL.to_vec()),
        ) {
            let k = BucketizeKernelRef::new();
            let params = params_with(
                TensorDesc::new(dtype, layout, [2, 2]),
                TensorDesc::new(DataType::F32, Layout::Bfyx, [3]),
                TensorDesc::new(DataType::I32, Layout::Bfyx, [2, 2]),
                DeviceInfo::new(256),
            );
            let in_key = INPUT_TYPES.contains(&dtype) && LAYOUTS.contains(&layout);
            prop_assert_eq!(k.validate(&params), in_key);
        }
    }
}
