//! # Binding Registry
//!
//! Static table from a controller's exact identity string to its physical
//! button and axis layout.
//!
//! Lookups are exact-match only. A device whose id is not registered does not
//! stream; that is a normal outcome, not an error.
//!
//! ## Built-in Layout
//!
//! One binding ships out of the box, the Nintendo Switch Pro Controller as
//! reported through the standard gamepad mapping:
//!
//! | Name | Index | Name | Index |
//! |------|-------|------|-------|
//! | B | 0 | A | 1 |
//! | Y | 2 | X | 3 |
//! | L | 4 | R | 5 |
//! | ZL | 6 | ZR | 7 |
//! | - | 8 | + | 9 |
//! | LS | 10 | RS | 11 |
//! | Up | 12 | Down | 13 |
//! | Left | 14 | Right | 15 |
//! | Home | 16 | Capture | 17 |
//!
//! Sticks: left `[0, 1]`, right `[2, 3]`.
//!
//! The same controller read through Linux evdev (`hid-nintendo`) reports its
//! buttons in ascending `BTN_*` code order instead:
//!
//! | Name | Index | Name | Index |
//! |------|-------|------|-------|
//! | B | 0 | A | 1 |
//! | X | 2 | Y | 3 |
//! | Capture | 4 | L | 5 |
//! | R | 6 | ZL | 7 |
//! | ZR | 8 | - | 9 |
//! | + | 10 | Home | 11 |
//! | LS | 12 | RS | 13 |
//!
//! Sticks: left `[0, 1]` (`ABS_X`, `ABS_Y`), right `[2, 3]` (`ABS_RX`,
//! `ABS_RY`). The d-pad arrives as a hat axis and has no button binding.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Device id of the built-in Switch Pro Controller binding.
pub const SWITCH_PRO_DEVICE_ID: &str =
    "Nintendo Co., Ltd. Pro Controller (STANDARD GAMEPAD Vendor: 057e Product: 2009)";

/// Device id of the Switch Pro Controller as read through evdev.
pub const SWITCH_PRO_EVDEV_DEVICE_ID: &str =
    "Nintendo Switch Pro Controller (Vendor: 057e Product: 2009)";

/// Physical axis indices feeding one stick. `None` reads as 0.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct AxisPair {
    /// Horizontal axis index
    #[serde(default)]
    pub x: Option<usize>,
    /// Vertical axis index
    #[serde(default)]
    pub y: Option<usize>,
}

impl AxisPair {
    pub const fn new(x: Option<usize>, y: Option<usize>) -> Self {
        Self { x, y }
    }

    /// Both axes present.
    pub const fn both(x: usize, y: usize) -> Self {
        Self::new(Some(x), Some(y))
    }
}

/// Translation table from canonical names to physical indices for one device.
///
/// # Examples
///
/// ```
/// use pad_bridge::binding::{AxisPair, ControllerBinding};
///
/// let binding = ControllerBinding::new([("A", 1), ("B", 0)], [AxisPair::both(0, 1)]);
/// assert_eq!(binding.buttons["A"], 1);
/// assert_eq!(binding.axes.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControllerBinding {
    /// Canonical button name → physical button index
    pub buttons: BTreeMap<String, usize>,
    /// One entry per stick, in output order
    pub axes: Vec<AxisPair>,
}

impl ControllerBinding {
    pub fn new<N, B, A>(buttons: B, axes: A) -> Self
    where
        N: Into<String>,
        B: IntoIterator<Item = (N, usize)>,
        A: IntoIterator<Item = AxisPair>,
    {
        Self {
            buttons: buttons.into_iter().map(|(name, idx)| (name.into(), idx)).collect(),
            axes: axes.into_iter().collect(),
        }
    }

    /// Layout of the Nintendo Switch Pro Controller.
    pub fn switch_pro() -> Self {
        Self::new(
            [
                ("A", 1),
                ("B", 0),
                ("X", 3),
                ("Y", 2),
                ("L", 4),
                ("R", 5),
                ("ZL", 6),
                ("ZR", 7),
                ("+", 9),
                ("-", 8),
                ("LS", 10),
                ("RS", 11),
                ("Up", 12),
                ("Right", 15),
                ("Down", 13),
                ("Left", 14),
                ("Home", 16),
                ("Capture", 17),
            ],
            [AxisPair::both(0, 1), AxisPair::both(2, 3)],
        )
    }

    /// Layout of the Switch Pro Controller as read through evdev.
    pub fn switch_pro_evdev() -> Self {
        Self::new(
            [
                ("B", 0),
                ("A", 1),
                ("X", 2),
                ("Y", 3),
                ("Capture", 4),
                ("L", 5),
                ("R", 6),
                ("ZL", 7),
                ("ZR", 8),
                ("-", 9),
                ("+", 10),
                ("Home", 11),
                ("LS", 12),
                ("RS", 13),
            ],
            [AxisPair::both(0, 1), AxisPair::both(2, 3)],
        )
    }
}

/// Exact-match device id → binding table.
///
/// Bindings are immutable once registered; registering the same id again
/// replaces the whole entry.
#[derive(Debug, Clone, Default)]
pub struct BindingRegistry {
    bindings: HashMap<String, Arc<ControllerBinding>>,
}

impl BindingRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in bindings.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(SWITCH_PRO_DEVICE_ID, ControllerBinding::switch_pro());
        registry.register(SWITCH_PRO_EVDEV_DEVICE_ID, ControllerBinding::switch_pro_evdev());
        registry
    }

    /// Store or overwrite the binding for `device_id`.
    pub fn register(&mut self, device_id: impl Into<String>, binding: ControllerBinding) {
        let device_id = device_id.into();
        debug!(
            "Registered binding for '{}' ({} buttons, {} sticks)",
            device_id,
            binding.buttons.len(),
            binding.axes.len()
        );
        self.bindings.insert(device_id, Arc::new(binding));
    }

    /// Binding for exactly this device id.
    pub fn lookup(&self, device_id: &str) -> Option<Arc<ControllerBinding>> {
        self.bindings.get(device_id).cloned()
    }

    /// Whether a binding exists for exactly this device id.
    pub fn contains(&self, device_id: &str) -> bool {
        self.bindings.contains_key(device_id)
    }

    /// Registered device ids in sorted order.
    pub fn device_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.bindings.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
