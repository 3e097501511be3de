//! # Control State
//!
//! The canonical, device-independent controller record sent with every
//! `input` message.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical controller state produced by one sample.
///
/// `serial` is the source device timestamp. The receiver uses it to discard
/// stale state; it is never used to reorder.
///
/// # Examples
///
/// ```
/// use pad_bridge::protocol::ControlState;
///
/// let mut state = ControlState::default();
/// state.buttons.insert("A".to_string(), true);
/// state.sticks.push([0.5, -0.25]);
/// state.serial = 42.0;
///
/// let json = serde_json::to_string(&state).unwrap();
/// assert_eq!(json, r#"{"buttons":{"A":true},"sticks":[[0.5,-0.25]],"serial":42.0}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlState {
    /// Canonical button name → pressed
    pub buttons: BTreeMap<String, bool>,
    /// One `[x, y]` pair per stick, each in [-1, 1]
    pub sticks: Vec<[f64; 2]>,
    /// Source timestamp
    pub serial: f64,
}

impl ControlState {
    /// Whether the named button is pressed. Unknown names read as released.
    pub fn is_pressed(&self, name: &str) -> bool {
        self.buttons.get(name).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_button_reads_released() {
        let state = ControlState::default();
        assert!(!state.is_pressed("Home"));
    }

    #[test]
    fn test_deserialize_wire_shape() {
        let json = r#"{"buttons":{"A":false,"B":true},"sticks":[[0.0,1.0],[-1.0,0.0]],"serial":7}"#;
        let state: ControlState = serde_json::from_str(json).unwrap();

        assert!(state.is_pressed("B"));
        assert!(!state.is_pressed("A"));
        assert_eq!(state.sticks, vec![[0.0, 1.0], [-1.0, 0.0]]);
        assert_eq!(state.serial, 7.0);
    }
}
