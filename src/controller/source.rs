//! Trait abstraction for input sources to enable testing

use async_trait::async_trait;

use super::event::{ControllerInfo, InputEvent};
use crate::error::Result;
use crate::lifecycle::Release;

/// A stream of controller events.
///
/// Events are delivered one at a time, in the order the device produced
/// them. Opening a controller queues a `DeviceChange::Added` event for it, so
/// the consumer sees every controller arrive the same way whether it was
/// present at start-up or plugged in later.
#[async_trait]
pub trait InputSource: Release + Send {
    /// Lists the controllers currently attached.
    fn list_controllers(&mut self) -> Result<Vec<ControllerInfo>>;

    /// Opens the controller at `index` in [`list_controllers`](Self::list_controllers) order.
    ///
    /// # Errors
    ///
    /// `NoControllerAvailable` if the index is out of range or nothing is attached.
    fn open(&mut self, index: usize) -> Result<ControllerInfo>;

    /// Waits for the next event.
    ///
    /// Returns `Ok(None)` once a stop has been requested.
    async fn next_event(&mut self) -> Result<Option<InputEvent>>;

    /// Makes a pending or future [`next_event`](Self::next_event) return `None`.
    fn request_stop(&self);
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use crate::controller::event::{ControllerId, DeviceChange};
    use crate::error::PadcarError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Input source replaying a fixed list of events.
    ///
    /// Once the script is exhausted it reports a stop, or `read_error` if set.
    pub struct ScriptedInput {
        pub controllers: Vec<ControllerInfo>,
        pub events: VecDeque<InputEvent>,
        pub read_error: Option<String>,
        pub opened: Option<usize>,
        pub releases: usize,
        pub stop_requested: AtomicBool,
    }

    impl ScriptedInput {
        pub fn new(controllers: Vec<ControllerInfo>, events: Vec<InputEvent>) -> Self {
            Self {
                controllers,
                events: events.into(),
                read_error: None,
                opened: None,
                releases: 0,
                stop_requested: AtomicBool::new(false),
            }
        }

        /// Id the scripted source gives the controller opened at `index`
        pub fn id_for(index: usize) -> ControllerId {
            ControllerId(index as u32 + 1)
        }
    }

    impl Release for ScriptedInput {
        fn resource_name(&self) -> &'static str {
            "scripted input"
        }

        fn release(&mut self) -> Result<()> {
            self.releases += 1;
            Ok(())
        }
    }

    #[async_trait]
    impl InputSource for ScriptedInput {
        fn list_controllers(&mut self) -> Result<Vec<ControllerInfo>> {
            Ok(self.controllers.clone())
        }

        fn open(&mut self, index: usize) -> Result<ControllerInfo> {
            let info = self
                .controllers
                .get(index)
                .cloned()
                .ok_or(PadcarError::NoControllerAvailable)?;
            self.opened = Some(index);
            self.events.push_front(InputEvent::Device {
                controller: Self::id_for(index),
                change: DeviceChange::Added(info.clone()),
            });
            Ok(info)
        }

        async fn next_event(&mut self) -> Result<Option<InputEvent>> {
            if self.stop_requested.load(Ordering::SeqCst) {
                return Ok(None);
            }
            match self.events.pop_front() {
                Some(event) => Ok(Some(event)),
                None => match &self.read_error {
                    Some(message) => Err(PadcarError::Controller(message.clone())),
                    None => Ok(None),
                },
            }
        }

        fn request_stop(&self) {
            self.stop_requested.store(true, Ordering::SeqCst);
        }
    }
}
