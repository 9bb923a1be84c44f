use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use minijinja::{Environment, UndefinedBehavior, Value};
use parking_lot::Mutex;

use core_types::DataType;
use ksel_core::{GpuContext, types::AbstractBindGroupLayout, types::AbstractComputePipeline, types::BindingAccess};
use ksel_ops::{ArgumentKind, JitValue, KernelPackage};

use crate::error::ExecError;

/// Compiled kernel identity: rendered source + entry point
#[derive(Clone, PartialEq, Eq, Hash)]
struct KernelKey {
    src: Arc<str>,
    ent: Arc<str>,
}

struct PipelineBundle {
    pipeline: Arc<AbstractComputePipeline>,
    layout:   Arc<AbstractBindGroupLayout>,
}

/// Splice a package's constants and geometry into its source template.
///
/// Type constants become WGSL type names; `LWS_n`/`GWS_n` carry the
/// dispatch geometry and `ENABLE_F16` is set when any operand is f16.
pub fn render_source(package: &KernelPackage) -> Result<String, ExecError> {
    let mut ctx: BTreeMap<String, Value> = BTreeMap::new();
    let mut enable_f16 = false;

    for (name, value) in package.jit.iter() {
        let value = match value {
            JitValue::Int(v) => Value::from(*v),
            JitValue::Bool(v) => Value::from(*v),
            JitValue::Type(dt) => {
                let wgsl = dt.wgsl_name().ok_or(ExecError::UnsupportedShaderType { dtype: *dt })?;
                enable_f16 |= *dt == DataType::F16;
                Value::from(wgsl)
            }
            JitValue::Text(s) => Value::from(s.as_str()),
        };
        ctx.insert(name.to_string(), value);
    }
    for i in 0..3 {
        ctx.insert(format!("GWS_{i}"), Value::from(package.dispatch.gws[i] as u64));
        ctx.insert(format!("LWS_{i}"), Value::from(package.dispatch.lws[i] as u64));
    }
    ctx.insert("ENABLE_F16".to_string(), Value::from(enable_f16));

    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    let tmpl = env.template_from_str(package.source_template)?;
    Ok(tmpl.render(&ctx)?)
}

/// Compiles kernel packages into pipelines and caches them.
pub struct KernelManager {
    ctx:   GpuContext,
    cache: Mutex<HashMap<KernelKey, Arc<PipelineBundle>>>,
}

impl KernelManager {
    pub fn new(ctx: GpuContext) -> Self {
        Self { ctx, cache: Mutex::new(HashMap::new()) }
    }

    /// Render, compile and cache `package`; later calls with an identical
    /// package return the cached pipeline.
    pub fn compile_and_cache(
        &self,
        package: &KernelPackage,
    ) -> Result<(Arc<AbstractComputePipeline>, Arc<AbstractBindGroupLayout>), ExecError> {
        let src = render_source(package)?;
        let key = KernelKey {
            src: Arc::from(src.as_str()),
            ent: Arc::from(package.entry_point.as_str()),
        };

        if let Some(b) = self.cache.lock().get(&key) {
            return Ok((b.pipeline.clone(), b.layout.clone()));
        }

        let access: Vec<BindingAccess> = package.arguments.iter()
            .map(|arg| match arg {
                ArgumentKind::Output(_) => BindingAccess::ReadWrite,
                ArgumentKind::Input(_) | ArgumentKind::Internal(_) => BindingAccess::ReadOnly,
            })
            .collect();
        let layout   = self.ctx.create_storage_layout(&access);
        let pipeline = self.ctx.create_compute_pipeline(&src, &package.entry_point, &layout);
        tracing::debug!(entry = %package.entry_point, "compiled kernel");

        let bundle = Arc::new(PipelineBundle { pipeline: pipeline.clone(), layout: layout.clone() });
        self.cache.lock().insert(key, bundle);

        Ok((pipeline, layout))
    }

    /// Number of cached pipelines
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }
}
