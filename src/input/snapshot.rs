//! # Raw Controller Snapshots
//!
//! Read-only per-frame view of one physical controller, as reported by the
//! platform input layer.

/// One physical button reading.
///
/// Platforms report buttons either as a bare number or as an analog value
/// with an explicit pressed flag. Both shapes are kept so analog data is not
/// lost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ButtonValue {
    /// Bare numeric reading. Pressed only at exactly 1.0.
    Scalar(f64),
    /// Analog reading with the platform's own pressed decision
    Analog { value: f64, pressed: bool },
}

impl ButtonValue {
    /// Digital button helper.
    pub fn digital(pressed: bool) -> Self {
        ButtonValue::Scalar(if pressed { 1.0 } else { 0.0 })
    }

    /// Normalised pressed state.
    ///
    /// # Examples
    ///
    /// ```
    /// use pad_bridge::input::ButtonValue;
    ///
    /// assert!(ButtonValue::Scalar(1.0).is_pressed());
    /// assert!(!ButtonValue::Scalar(0.99).is_pressed());
    /// assert!(ButtonValue::Analog { value: 0.3, pressed: true }.is_pressed());
    /// ```
    pub fn is_pressed(&self) -> bool {
        match *self {
            ButtonValue::Scalar(value) => value == 1.0,
            ButtonValue::Analog { pressed, .. } => pressed,
        }
    }

    /// Analog magnitude in [0, 1].
    pub fn value(&self) -> f64 {
        match *self {
            ButtonValue::Scalar(value) => value,
            ButtonValue::Analog { value, .. } => value,
        }
    }
}

/// State of one physical controller at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct RawControllerSnapshot {
    /// Whether the device is currently connected
    pub connected: bool,
    /// Stable device identity string
    pub id: String,
    /// Button readings in physical index order
    pub buttons: Vec<ButtonValue>,
    /// Axis readings in physical index order, each in [-1, 1]
    pub axes: Vec<f64>,
    /// Monotonically increasing timestamp in milliseconds
    pub timestamp: f64,
}

impl RawControllerSnapshot {
    /// Button reading at `index`, if the device has that many buttons.
    pub fn button(&self, index: usize) -> Option<ButtonValue> {
        self.buttons.get(index).copied()
    }

    /// Axis reading at `index`, if the device has that many axes.
    pub fn axis(&self, index: usize) -> Option<f64> {
        self.axes.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_pressed_only_at_one() {
        assert!(ButtonValue::Scalar(1.0).is_pressed());
        assert!(!ButtonValue::Scalar(0.0).is_pressed());
        assert!(!ButtonValue::Scalar(0.5).is_pressed());
    }

    #[test]
    fn test_analog_uses_pressed_flag() {
        // A fully pushed analog trigger the platform calls released stays released
        let value = ButtonValue::Analog { value: 1.0, pressed: false };
        assert!(!value.is_pressed());
        assert_eq!(value.value(), 1.0);
    }

    #[test]
    fn test_digital_helper() {
        assert_eq!(ButtonValue::digital(true), ButtonValue::Scalar(1.0));
        assert_eq!(ButtonValue::digital(false), ButtonValue::Scalar(0.0));
    }

    #[test]
    fn test_out_of_range_reads() {
        let snapshot = RawControllerSnapshot {
            connected: true,
            id: "pad".into(),
            buttons: vec![ButtonValue::digital(true)],
            axes: vec![0.25],
            timestamp: 1.0,
        };

        assert!(snapshot.button(0).is_some());
        assert!(snapshot.button(1).is_none());
        assert_eq!(snapshot.axis(0), Some(0.25));
        assert_eq!(snapshot.axis(3), None);
    }
}
