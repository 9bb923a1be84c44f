//! Capability keys: what a kernel candidate can accept.

use std::collections::BTreeSet;

use core_types::{DataType, Layout};

/// Immutable description of the (type, layout) combinations a kernel
/// supports, plus its batching and mixed-type flags.
///
/// Built with the consuming `enable_*`/`declare` methods at registration
/// time; nothing mutates a key once it is bound to a candidate. Equality is
/// set equality, independent of declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapabilityKey {
    inputs:          BTreeSet<(DataType, Layout)>,
    outputs:         BTreeSet<(DataType, Layout)>,
    batching:        bool,
    different_types: bool,
}

impl CapabilityKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare one supported input combination.
    pub fn declare(mut self, dtype: DataType, layout: Layout) -> Self {
        self.inputs.insert((dtype, layout));
        self
    }

    /// Declare every `types` × `layouts` input combination.
    pub fn enable_inputs(mut self, types: &[DataType], layouts: &[Layout]) -> Self {
        for &dt in types {
            for &l in layouts {
                self.inputs.insert((dt, l));
            }
        }
        self
    }

    /// Declare every `types` × `layouts` output combination.
    pub fn enable_outputs(mut self, types: &[DataType], layouts: &[Layout]) -> Self {
        for &dt in types {
            for &l in layouts {
                self.outputs.insert((dt, l));
            }
        }
        self
    }

    pub fn enable_batching(mut self) -> Self {
        self.batching = true;
        self
    }

    pub fn enable_different_types(mut self) -> Self {
        self.different_types = true;
        self
    }

    /// Whether an input of `type_in` and an output of `type_out`, both in
    /// `layout`, are accepted.
    pub fn supports(&self, type_in: DataType, type_out: DataType, layout: Layout) -> bool {
        self.supports_input(type_in, layout) && self.supports_output(type_out, layout)
    }

    pub fn supports_input(&self, dtype: DataType, layout: Layout) -> bool {
        self.inputs.contains(&(dtype, layout))
    }

    pub fn supports_output(&self, dtype: DataType, layout: Layout) -> bool {
        self.outputs.contains(&(dtype, layout))
    }

    pub fn allow_mixed_types(&self) -> bool {
        self.different_types
    }

    pub fn allow_batching(&self) -> bool {
        self.batching
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_order_does_not_matter() {
        let a = CapabilityKey::new()
            .declare(DataType::F32, Layout::Bfyx)
            .declare(DataType::I32, Layout::Bfzyx)
            .enable_batching();
        let b = CapabilityKey::new()
            .enable_batching()
            .declare(DataType::I32, Layout::Bfzyx)
            .declare(DataType::F32, Layout::Bfyx)
            .declare(DataType::F32, Layout::Bfyx);
        assert_eq!(a, b);
    }

    #[test]
    fn supports_requires_both_sides() {
        let key = CapabilityKey::new()
            .enable_inputs(&[DataType::F32, DataType::F16], &[Layout::Bfyx])
            .enable_outputs(&[DataType::I32], &[Layout::Bfyx]);

        assert!(key.supports(DataType::F32, DataType::I32, Layout::Bfyx));
        assert!(key.supports(DataType::F16, DataType::I32, Layout::Bfyx));
        assert!(!key.supports(DataType::F32, DataType::F32, Layout::Bfyx));
        assert!(!key.supports(DataType::F32, DataType::I32, Layout::Bfzyx));
        assert!(!key.supports(DataType::Bool, DataType::I32, Layout::Bfyx));
        assert!(!key.allow_mixed_types());
        assert!(!key.allow_batching());
    }

    #[test]
    fn enable_declares_cross_product() {
        let key = CapabilityKey::new()
            .enable_inputs(&[DataType::F32, DataType::I32], &[Layout::Bfyx, Layout::Bfzyx]);
        let explicit = [DataType::F32, DataType::I32].into_iter()
            .flat_map(|dt| [Layout::Bfyx, Layout::Bfzyx].map(|l| (dt, l)))
            .fold(CapabilityKey::new(), |key, (dt, l)| key.declare(dt, l));
        assert_eq!(key, explicit);
        assert!(!key.supports_output(DataType::F32, Layout::Bfyx));
    }
}
