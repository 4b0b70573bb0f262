//! # Controller Module
//!
//! Game controller input.
//!
//! This module handles:
//! - Controller detection and hot-plug via evdev
//! - Reading analog stick and button inputs, normalized per axis
//! - Mapping raw codes to logical roles per controller layout

pub mod evdev_source;
pub mod event;
pub mod profile;
pub mod source;
