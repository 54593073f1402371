//! Display surface controller.
//!
//! The surface is an external window the user may close, navigate or wipe at
//! any moment. [`SurfaceController`] tracks it as a small state machine that
//! is re-probed on every operation, and a keep-alive task re-injects the
//! document whenever the marker element disappears.

mod controller;
pub mod document;
mod errors;
mod headless;
mod panel;
mod window;

pub use controller::{SurfaceConfig, SurfaceController, SurfaceState};
pub use document::SurfaceDocument;
pub use errors::SurfaceError;
pub use headless::{ElementState, HeadlessWindow, HeadlessWindowHost};
pub use panel::SurfacePanel;
pub use window::{SurfaceWindow, WindowFeatures, WindowHost};
