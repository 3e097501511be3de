//! # Input Sampler
//!
//! Decides, once per frame, whether to sample, which controller to sample,
//! and converts that controller's raw snapshot into a [`ControlState`].
//!
//! ## Eligibility
//!
//! A controller is eligible when it is connected, its id is in the
//! operator's enabled set, and a binding exists for its id. Only the first
//! eligible controller in enumeration order feeds the stream.
//!
//! ## Arming
//!
//! The sampler is *armed* while an eligible controller exists. The frame
//! loop only ticks an armed sampler; a sample that finds nothing eligible
//! disarms it, and it stays idle until [`InputSampler::recompute`] runs
//! after an enable, disable, connect or disconnect.
//!
//! ## Usage
//!
//! ```
//! use pad_bridge::binding::{AxisPair, BindingRegistry, ControllerBinding};
//! use pad_bridge::input::{ButtonValue, InputSampler, RawControllerSnapshot};
//!
//! let mut registry = BindingRegistry::new();
//! registry.register("pad", ControllerBinding::new([("A", 1), ("B", 0)], [AxisPair::both(0, 1)]));
//!
//! let snapshots = vec![RawControllerSnapshot {
//!     connected: true,
//!     id: "pad".into(),
//!     buttons: vec![ButtonValue::digital(true), ButtonValue::digital(false)],
//!     axes: vec![0.5, -0.25],
//!     timestamp: 10.0,
//! }];
//!
//! let mut sampler = InputSampler::new(["pad"]);
//! assert!(sampler.recompute(&snapshots, &registry));
//!
//! let state = sampler.sample(&snapshots, &registry).unwrap();
//! assert!(!state.is_pressed("A"));
//! assert!(state.is_pressed("B"));
//! assert_eq!(state.sticks, vec![[0.5, -0.25]]);
//! ```

use std::collections::HashSet;
use tracing::{debug, info};

use super::snapshot::RawControllerSnapshot;
use crate::binding::{BindingRegistry, ControllerBinding};
use crate::protocol::ControlState;

/// Convert one raw snapshot through a binding.
///
/// The output has exactly the binding's button names. Button indices the
/// device does not have read as released; axis indices that are absent in
/// the binding or missing on the device read as 0.0.
pub fn convert(binding: &ControllerBinding, raw: &RawControllerSnapshot) -> ControlState {
    let buttons = binding
        .buttons
        .iter()
        .map(|(name, &idx)| {
            let pressed = raw.button(idx).map(|b| b.is_pressed()).unwrap_or(false);
            (name.clone(), pressed)
        })
        .collect();

    let axis_value = |idx: Option<usize>| idx.and_then(|i| raw.axis(i)).unwrap_or(0.0);
    let sticks = binding
        .axes
        .iter()
        .map(|pair| [axis_value(pair.x), axis_value(pair.y)])
        .collect();

    ControlState {
        buttons,
        sticks,
        serial: raw.timestamp,
    }
}

/// Per-frame controller selector and converter.
#[derive(Debug, Default)]
pub struct InputSampler {
    enabled: HashSet<String>,
    armed: bool,
    active_device: Option<String>,
}

impl InputSampler {
    /// Create an idle sampler with an initial enabled set.
    pub fn new<I, S>(enabled: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: enabled.into_iter().map(Into::into).collect(),
            armed: false,
            active_device: None,
        }
    }

    /// Add a device to the enabled set. Returns `false` if it already was.
    ///
    /// Callers must [`recompute`](Self::recompute) afterwards.
    pub fn enable(&mut self, device_id: impl Into<String>) -> bool {
        self.enabled.insert(device_id.into())
    }

    /// Remove a device from the enabled set. Returns `false` if it was not in it.
    ///
    /// Callers must [`recompute`](Self::recompute) afterwards.
    pub fn disable(&mut self, device_id: &str) -> bool {
        self.enabled.remove(device_id)
    }

    pub fn is_enabled(&self, device_id: &str) -> bool {
        self.enabled.contains(device_id)
    }

    /// Enabled ids in sorted order.
    pub fn enabled_devices(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.enabled.iter().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Connected, enabled and bound.
    pub fn is_eligible(&self, snapshot: &RawControllerSnapshot, registry: &BindingRegistry) -> bool {
        snapshot.connected && self.enabled.contains(&snapshot.id) && registry.contains(&snapshot.id)
    }

    /// Re-evaluate eligibility after the enabled set or the device set changed.
    ///
    /// Returns whether the sampler is now armed.
    pub fn recompute(&mut self, snapshots: &[RawControllerSnapshot], registry: &BindingRegistry) -> bool {
        let armed = snapshots.iter().any(|s| self.is_eligible(s, registry));
        if armed != self.armed {
            if armed {
                info!("Eligible controller available, sampling started");
            } else {
                info!("No eligible controller, sampling stopped");
                self.active_device = None;
            }
        }
        self.armed = armed;
        armed
    }

    /// Whether the frame loop should keep ticking this sampler.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Device that fed the most recent sample.
    pub fn active_device(&self) -> Option<&str> {
        self.active_device.as_deref()
    }

    /// Sample the first eligible controller.
    ///
    /// Returns `None` and disarms when nothing is eligible.
    pub fn sample(
        &mut self,
        snapshots: &[RawControllerSnapshot],
        registry: &BindingRegistry,
    ) -> Option<ControlState> {
        let chosen = snapshots.iter().find(|s| self.is_eligible(s, registry));

        let Some(raw) = chosen else {
            if self.armed {
                info!("Active controller gone, sampling stopped");
            }
            self.armed = false;
            self.active_device = None;
            return None;
        };
        let binding = registry.lookup(&raw.id)?;

        if self.active_device.as_deref() != Some(raw.id.as_str()) {
            info!("Streaming from controller '{}'", raw.id);
            self.active_device = Some(raw.id.clone());
        }
        self.armed = true;

        let state = convert(&binding, raw);
        debug!("Sampled '{}' serial={}", raw.id, state.serial);
        Some(state)
    }
}
