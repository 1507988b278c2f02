//! padgestr – touchpad gesture bridge for Linux.
//!
//! Turns raw multi-touch frames from a touchpad into relative pointer,
//! button, wheel, and synthetic touchscreen events.

pub mod config;
pub mod event;
pub mod frame;
pub mod manager;
pub mod motion;
pub mod output;
pub mod recognizer;
pub mod session;
pub mod tap;
pub mod uinput;
