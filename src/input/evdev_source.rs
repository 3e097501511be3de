//! # Evdev Controller Source
//!
//! Reads gamepads through the Linux evdev interface.
//!
//! ## Device Detection
//!
//! Every `/dev/input/event*` node that advertises `BTN_SOUTH` is treated as
//! a gamepad. Nodes are visited in sorted path order, which is the
//! enumeration order the sampler sees.
//!
//! ## Layout
//!
//! - Device id: `"<name> (Vendor: vvvv Product: pppp)"`
//! - Buttons: supported keys at or above `BTN_MISC`, in ascending code order
//! - Axes: supported absolute axes in ascending code order, scaled to [-1, 1]
//!
//! The snapshot timestamp only advances when the read-back state changes,
//! so an idle controller keeps repeating the same serial.

use evdev::{AbsoluteAxisType, Device, Key};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::snapshot::{ButtonValue, RawControllerSnapshot};
use super::source::ControllerSource;
use crate::error::{PadBridgeError, Result};

/// Default evdev device directory
pub const DEFAULT_INPUT_DIR: &str = "/dev/input";

/// First key code that is a button rather than a keyboard key
const BTN_MISC_CODE: u16 = 0x100;

/// Build the device id string for a name and USB ids.
pub fn device_id(name: &str, vendor: u16, product: u16) -> String {
    format!("{} (Vendor: {:04x} Product: {:04x})", name, vendor, product)
}

/// Scale a raw absolute axis reading into [-1, 1].
///
/// Degenerate ranges read as centred.
pub fn normalize_axis(value: i32, minimum: i32, maximum: i32) -> f64 {
    if maximum <= minimum {
        return 0.0;
    }
    // drivers may report the full i32 range
    let span = f64::from(maximum) - f64::from(minimum);
    let scaled = 2.0 * (f64::from(value) - f64::from(minimum)) / span - 1.0;
    scaled.clamp(-1.0, 1.0)
}

struct TrackedDevice {
    path: PathBuf,
    device: Device,
    id: String,
    keys: Vec<Key>,
    axes: Vec<AbsoluteAxisType>,
    connected: bool,
    buttons: Vec<ButtonValue>,
    values: Vec<f64>,
    timestamp: f64,
}

impl TrackedDevice {
    fn open(path: &Path) -> Option<Self> {
        let device = match Device::open(path) {
            Ok(device) => device,
            Err(e) => {
                // Permission denied or other errors - skip device
                debug!("Could not open {}: {}", path.display(), e);
                return None;
            }
        };

        let keys: Vec<Key> = device
            .supported_keys()
            .map(|set| set.iter().filter(|k| k.code() >= BTN_MISC_CODE).collect())
            .unwrap_or_default();
        if !keys.contains(&Key::BTN_SOUTH) {
            debug!("Skipping non-gamepad input device: {}", path.display());
            return None;
        }

        let axes: Vec<AbsoluteAxisType> = device
            .supported_absolute_axes()
            .map(|set| set.iter().collect())
            .unwrap_or_default();

        let input_id = device.input_id();
        let id = device_id(
            device.name().unwrap_or("Unknown Controller"),
            input_id.vendor(),
            input_id.product(),
        );
        info!("Found controller '{}' at {}", id, path.display());

        Some(Self {
            path: path.to_path_buf(),
            device,
            id,
            buttons: vec![ButtonValue::digital(false); keys.len()],
            values: vec![0.0; axes.len()],
            keys,
            axes,
            connected: true,
            timestamp: 0.0,
        })
    }

    fn read(&mut self, now_ms: f64) {
        if !self.connected {
            return;
        }

        let key_state = match self.device.get_key_state() {
            Ok(state) => state,
            Err(e) => {
                warn!("Controller '{}' stopped responding: {}", self.id, e);
                self.connected = false;
                return;
            }
        };
        let abs_state = match self.device.get_abs_state() {
            Ok(state) => state,
            Err(e) => {
                warn!("Controller '{}' stopped responding: {}", self.id, e);
                self.connected = false;
                return;
            }
        };

        let buttons: Vec<ButtonValue> = self
            .keys
            .iter()
            .map(|&key| ButtonValue::digital(key_state.contains(key)))
            .collect();
        let values: Vec<f64> = self
            .axes
            .iter()
            .map(|axis| {
                let info = &abs_state[axis.0 as usize];
                normalize_axis(info.value, info.minimum, info.maximum)
            })
            .collect();

        if buttons != self.buttons || values != self.values || self.timestamp == 0.0 {
            self.buttons = buttons;
            self.values = values;
            self.timestamp = now_ms;
        }
    }

    fn snapshot(&self) -> RawControllerSnapshot {
        RawControllerSnapshot {
            connected: self.connected,
            id: self.id.clone(),
            buttons: self.buttons.clone(),
            axes: self.values.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// Gamepads found under an evdev input directory.
pub struct EvdevSource {
    input_dir: PathBuf,
    devices: Vec<TrackedDevice>,
    started: Instant,
}

impl std::fmt::Debug for EvdevSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevSource")
            .field("input_dir", &self.input_dir)
            .field("devices", &self.devices.iter().map(|d| &d.id).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl EvdevSource {
    /// Scan `/dev/input` for gamepads.
    ///
    /// # Errors
    ///
    /// Returns `Controller` if the input directory cannot be read.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pad_bridge::input::{ControllerSource, EvdevSource};
    ///
    /// let mut source = EvdevSource::open()?;
    /// for pad in source.snapshots() {
    ///     println!("{} connected={}", pad.id, pad.connected);
    /// }
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open() -> Result<Self> {
        Self::open_dir(DEFAULT_INPUT_DIR)
    }

    /// Scan a custom input directory.
    pub fn open_dir<P: AsRef<Path>>(input_dir: P) -> Result<Self> {
        let mut source = Self {
            input_dir: input_dir.as_ref().to_path_buf(),
            devices: Vec::new(),
            started: Instant::now(),
        };
        source.rescan()?;
        Ok(source)
    }

    /// Number of gamepads currently tracked.
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    fn event_nodes(&self) -> Result<Vec<PathBuf>> {
        if !self.input_dir.exists() {
            return Err(PadBridgeError::Controller(format!(
                "{} directory not found",
                self.input_dir.display()
            )));
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.input_dir)
            .map_err(|e| {
                PadBridgeError::Controller(format!("Failed to read {}: {}", self.input_dir.display(), e))
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().starts_with("event"))
                    .unwrap_or(false)
            })
            .collect();

        // Sort for deterministic enumeration order
        paths.sort();
        Ok(paths)
    }
}

impl ControllerSource for EvdevSource {
    fn snapshots(&mut self) -> Vec<RawControllerSnapshot> {
        let now_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        self.devices
            .iter_mut()
            .map(|device| {
                device.read(now_ms);
                device.snapshot()
            })
            .collect()
    }

    fn rescan(&mut self) -> Result<bool> {
        let nodes = self.event_nodes()?;
        let before = self.devices.len();

        self.devices.retain(|device| {
            let keep = device.connected && nodes.contains(&device.path);
            if !keep {
                info!("Controller '{}' disconnected", device.id);
            }
            keep
        });
        let mut changed = self.devices.len() != before;

        for path in nodes {
            if self.devices.iter().any(|d| d.path == path) {
                continue;
            }
            if let Some(device) = TrackedDevice::open(&path) {
                self.devices.push(device);
                changed = true;
            }
        }

        self.devices.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(changed)
    }
}
