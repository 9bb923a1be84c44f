use core_types::{Backend, DataType, Layout};
use ksel_ops::{KernelSelector, OpKind, OpParams};

use crate::error::ExecError;
use crate::implementation_map::{ImplAttachment, ImplementationMap};
use crate::primitive::{PrimitiveImpl, ProgramNode};

const TYPES: &[DataType] = &[
    DataType::U8, DataType::I8, DataType::F16, DataType::F32, DataType::I32, DataType::I64,
];
const LAYOUTS: &[Layout] = &[Layout::Bfyx, Layout::Bfzyx, Layout::Bfwzyx];

fn create_bucketize(
    node: &ProgramNode,
    params: &OpParams,
    selector: &KernelSelector<'_>,
) -> Result<PrimitiveImpl, ExecError> {
    let best = selector.select_best(Backend::Gpu, params)?;
    tracing::debug!(node = %node.id, kernel = best.kernel_name, "bucketize primitive created");
    Ok(PrimitiveImpl::new(node.id.clone(), best))
}

pub fn attach_bucketize_impl(map: &mut ImplementationMap) {
    let tuples = TYPES
        .iter()
        .flat_map(|&dt| LAYOUTS.iter().map(move |&l| (dt, l)));
    map.add(Backend::Gpu, OpKind::BUCKETIZE, create_bucketize, tuples);
}

inventory::submit! {
    ImplAttachment { attach: attach_bucketize_impl }
}
