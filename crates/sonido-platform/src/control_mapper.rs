//! Control-to-parameter mapping for connecting controls to effects.
//!
//! This module provides [`ControlMapper`] which maps platform controls to effect
//! parameters using the [`ParameterInfo`] trait for automatic denormalization.
//!
//! # Example
//!
//! ```rust,ignore
//! use sonido_platform::{ControlMapper, ControlId, ParameterInfo};
//!
//! // Create a mapper with 8 mapping slots
//! let mut mapper = ControlMapper::<8>::new();
//!
//! // Map hardware knob 0 to effect parameter 0
//! mapper.map(ControlId::hardware(0), 0);
//!
//! // In the audio loop
//! if let Some(state) = controller.read_control(ControlId::hardware(0)) {
//!     if state.changed {
//!         if let Some(param_idx) = mapper.get_param_index(ControlId::hardware(0)) {
//!             // Use ParameterInfo to denormalize
//!             if let Some(desc) = effect.param_info(param_idx) {
//!                 let value = desc.denormalize(state.value);
//!                 effect.set_param(param_idx, value);
//!             }
//!         }
//!     }
//! }
//! ```

use crate::{ControlId, ParamDescriptor, ParameterInfo};

/// A single mapping entry from control to parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MappingEntry {
    /// The control ID this mapping is for.
    control_id: ControlId,
    /// The parameter index in the effect.
    param_index: usize,
}

/// Maps controls to effect parameters.
///
/// `ControlMapper` provides a fixed-capacity mapping table that associates
/// control IDs with effect parameter indices. It uses the [`ParameterInfo`]
/// trait to automatically denormalize control values (0.0-1.0) to parameter
/// ranges.
///
/// # Type Parameter
///
/// - `N`: Maximum number of mappings (compile-time constant for no_std support)
///
/// # Example
///
/// ```rust
/// use sonido_platform::{ControlMapper, ControlId};
///
/// // Create a mapper with capacity for 16 mappings
/// let mut mapper = ControlMapper::<16>::new();
///
/// // Map controls to parameters
/// mapper.map(ControlId::hardware(0), 0); // Knob 0 -> param 0
/// mapper.map(ControlId::hardware(1), 1); // Knob 1 -> param 1
/// mapper.map(ControlId::midi(74), 2);    // MIDI CC 74 -> param 2
///
/// // Look up mappings
/// assert_eq!(mapper.get_param_index(ControlId::hardware(0)), Some(0));
/// assert_eq!(mapper.get_param_index(ControlId::midi(74)), Some(2));
/// ```
#[derive(Debug, Clone)]
pub struct ControlMapper<const N: usize> {
    /// Mapping entries (control -> parameter).
    mappings: [Option<MappingEntry>; N],
    /// Number of active mappings.
    count: usize,
}

impl<const N: usize> ControlMapper<N> {
    /// Creates a new empty control mapper.
    pub const fn new() -> Self {
        Self {
            mappings: [None; N],
            count: 0,
        }
    }

    /// Returns the number of active mappings.
    #[inline]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns true if there are no mappings.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the maximum number of mappings.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Maps a control to a parameter index.
    ///
    /// If the control is already mapped, updates the mapping.
    /// Returns `true` if the mapping was added/updated, `false` if at capacity.
    ///
    /// # Arguments
    ///
    /// * `control_id` - The control to map
    /// * `param_index` - The effect parameter index to map to
    ///
    /// # Example
    ///
    /// ```rust
    /// use sonido_platform::{ControlMapper, ControlId};
    ///
    /// let mut mapper = ControlMapper::<4>::new();
    /// assert!(mapper.map(ControlId::hardware(0), 0));
    /// assert!(mapper.map(ControlId::hardware(1), 1));
    /// ```
    pub fn map(&mut self, control_id: ControlId, param_index: usize) -> bool {
        // Check if already mapped - update if so
        for entry in self.mappings.iter_mut().flatten() {
            if entry.control_id == control_id {
                entry.param_index = param_index;
                return true;
            }
        }

        // Find empty slot
        for slot in self.mappings.iter_mut() {
            if slot.is_none() {
                *slot = Some(MappingEntry {
                    control_id,
                    param_index,
                });
                self.count += 1;
                return true;
            }
        }

        false // At capacity
    }

    /// Removes the mapping for a control.
    ///
    /// Returns `true` if a mapping was removed, `false` if not found.
    pub fn unmap(&mut self, control_id: ControlId) -> bool {
        for slot in self.mappings.iter_mut() {
            if let Some(entry) = slot
                && entry.control_id == control_id
            {
                *slot = None;
                self.count -= 1;
                return true;
            }
        }
        false
    }

    /// Gets the parameter index mapped to a control.
    ///
    /// Returns `None` if the control is not mapped.
    #[inline]
    pub fn get_param_index(&self, control_id: ControlId) -> Option<usize> {
        for entry in self.mappings.iter().flatten() {
            if entry.control_id == control_id {
                return Some(entry.param_index);
            }
        }
        None
    }

    /// Gets the control ID mapped to a parameter.
    ///
    /// Returns `None` if no control is mapped to this parameter.
    /// If multiple controls map to the same parameter, returns the first found.
    #[inline]
    pub fn get_control_for_param(&self, param_index: usize) -> Option<ControlId> {
        for entry in self.mappings.iter().flatten() {
            if entry.param_index == param_index {
                return Some(entry.control_id);
            }
        }
        None
    }

    /// Clears all mappings.
    pub fn clear(&mut self) {
        for slot in self.mappings.iter_mut() {
            *slot = None;
        }
        self.count = 0;
    }

    /// Denormalizes a control value using the effect's parameter info.
    ///
    /// Converts a normalized control value (0.0-1.0) to the actual parameter
    /// range using the [`ParamDescriptor`] for the mapped parameter.
    ///
    /// Returns `None` if:
    /// - The control is not mapped
    /// - The parameter index is out of range
    /// - The effect doesn't have parameter info for that index
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use sonido_platform::{ControlMapper, ControlId};
    ///
    /// let mut mapper = ControlMapper::<8>::new();
    /// mapper.map(ControlId::hardware(0), 0);
    ///
    /// // Denormalize control value to parameter range
    /// let control_value = 0.5; // Normalized (0.0-1.0)
    /// if let Some(param_value) = mapper.denormalize(ControlId::hardware(0), control_value, &effect) {
    ///     effect.set_param(0, param_value);
    /// }
    /// ```
    pub fn denormalize<E: ParameterInfo>(
        &self,
        control_id: ControlId,
        normalized_value: f32,
        effect: &E,
    ) -> Option<f32> {
        let param_index = self.get_param_index(control_id)?;
        let descriptor = effect.param_info(param_index)?;
        Some(descriptor.denormalize(normalized_value))
    }

    /// Normalizes a parameter value for control display.
    ///
    /// Converts a parameter value to normalized range (0.0-1.0) for
    /// displaying on a control or sending via MIDI.
    ///
    /// Returns `None` if:
    /// - The control is not mapped
    /// - The parameter index is out of range
    /// - The effect doesn't have parameter info for that index
    pub fn normalize<E: ParameterInfo>(
        &self,
        control_id: ControlId,
        param_value: f32,
        effect: &E,
    ) -> Option<f32> {
        let param_index = self.get_param_index(control_id)?;
        let descriptor = effect.param_info(param_index)?;
        Some(descriptor.normalize(param_value))
    }

    /// Applies a control change to an effect.
    ///
    /// Convenience method that denormalizes the control value and sets
    /// the corresponding effect parameter.
    ///
    /// Returns `true` if the parameter was set, `false` if the mapping
    /// or parameter info was not found.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// // When a control changes
    /// if let Some(state) = controller.read_control(control_id) {
    ///     if state.changed {
    ///         mapper.apply(control_id, state.value, &mut effect);
    ///     }
    /// }
    /// ```
    pub fn apply<E: ParameterInfo>(
        &self,
        control_id: ControlId,
        normalized_value: f32,
        effect: &mut E,
    ) -> bool {
        if let Some(param_index) = self.get_param_index(control_id)
            && let Some(descriptor) = effect.param_info(param_index)
        {
            let value = descriptor.denormalize(normalized_value);
            effect.set_param(param_index, value);
            return true;
        }
        false
    }

    /// Gets the parameter descriptor for a mapped control.
    ///
    /// Convenience method for getting the parameter info via control ID.
    pub fn get_param_descriptor<E: ParameterInfo>(
        &self,
        control_id: ControlId,
        effect: &E,
    ) -> Option<ParamDescriptor> {
        let param_index = self.get_param_index(control_id)?;
        effect.param_info(param_index)
    }
}

impl<const N: usize> Default for ControlMapper<N> {
    fn default() -> Self {
        Self::new()
    }
}
