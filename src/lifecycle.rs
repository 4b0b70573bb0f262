//! # Resource Lifecycle
//!
//! The input source and the actuator set are acquired once and must be
//! released exactly once, whichever way the control loop exits: normal
//! stop, an error returned with `?`, or a panic unwinding through it.
//! [`Scoped`] ties that release to scope exit.

use std::ops::{Deref, DerefMut};
use tracing::{debug, warn};

use crate::error::Result;

/// A resource that must be released when no longer used.
///
/// Implementations must be idempotent: a second `release` is a no-op.
pub trait Release {
    /// Short name used in log messages
    fn resource_name(&self) -> &'static str;

    /// Releases the underlying hardware.
    fn release(&mut self) -> Result<()>;
}

/// Borrow of a [`Release`] resource that releases it on drop.
///
/// # Examples
///
/// ```
/// use padcar::error::Result;
/// use padcar::lifecycle::{Release, Scoped};
///
/// struct Lamp { released: bool }
///
/// impl Release for Lamp {
///     fn resource_name(&self) -> &'static str { "lamp" }
///     fn release(&mut self) -> Result<()> {
///         self.released = true;
///         Ok(())
///     }
/// }
///
/// let mut lamp = Lamp { released: false };
/// {
///     let _guard = Scoped::new(&mut lamp);
/// }
/// assert!(lamp.released);
/// ```
pub struct Scoped<'a, T: Release + ?Sized> {
    resource: &'a mut T,
}

impl<'a, T: Release + ?Sized> Scoped<'a, T> {
    /// Takes the resource under guard.
    pub fn new(resource: &'a mut T) -> Self {
        debug!("Acquired {}", resource.resource_name());
        Self { resource }
    }
}

impl<T: Release + ?Sized> Deref for Scoped<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.resource
    }
}

impl<T: Release + ?Sized> DerefMut for Scoped<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.resource
    }
}

impl<T: Release + ?Sized> Drop for Scoped<'_, T> {
    fn drop(&mut self) {
        let name = self.resource.resource_name();
        match self.resource.release() {
            Ok(()) => debug!("Released {}", name),
            Err(e) => warn!("Failed to release {}: {}", name, e),
        }
    }
}
