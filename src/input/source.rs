//! Platform input abstraction so the sampler can be driven without hardware

use super::snapshot::RawControllerSnapshot;
use crate::error::Result;

/// Something that can enumerate physical controllers and read their state.
pub trait ControllerSource {
    /// Current state of every known controller, in platform enumeration order.
    fn snapshots(&mut self) -> Vec<RawControllerSnapshot>;

    /// Re-enumerate devices.
    ///
    /// Returns `true` when a controller appeared or went away, which is the
    /// caller's cue to recompute sampler eligibility.
    fn rescan(&mut self) -> Result<bool>;
}

/// Source with no controllers. Used by the script console.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoControllers;

impl ControllerSource for NoControllers {
    fn snapshots(&mut self) -> Vec<RawControllerSnapshot> {
        Vec::new()
    }

    fn rescan(&mut self) -> Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Source returning whatever snapshots the test put in it
    #[derive(Clone, Default)]
    pub struct MockSource {
        pub devices: Arc<Mutex<Vec<RawControllerSnapshot>>>,
        pub changed: Arc<Mutex<bool>>,
        pub reads: Arc<Mutex<usize>>,
    }

    impl MockSource {
        pub fn new(devices: Vec<RawControllerSnapshot>) -> Self {
            Self {
                devices: Arc::new(Mutex::new(devices)),
                ..Self::default()
            }
        }

        pub fn set_devices(&self, devices: Vec<RawControllerSnapshot>) {
            *self.devices.lock().unwrap() = devices;
            *self.changed.lock().unwrap() = true;
        }

        pub fn read_count(&self) -> usize {
            *self.reads.lock().unwrap()
        }
    }

    impl ControllerSource for MockSource {
        fn snapshots(&mut self) -> Vec<RawControllerSnapshot> {
            *self.reads.lock().unwrap() += 1;
            self.devices.lock().unwrap().clone()
        }

        fn rescan(&mut self) -> Result<bool> {
            let mut changed = self.changed.lock().unwrap();
            Ok(std::mem::replace(&mut *changed, false))
        }
    }
}
