use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::SurfaceError;

/// Geometry and chrome requested for the surface window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowFeatures {
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
    pub chrome: bool,
}

impl Default for WindowFeatures {
    fn default() -> Self {
        Self {
            width: 320,
            height: 220,
            resizable: true,
            chrome: false,
        }
    }
}

impl WindowFeatures {
    /// Feature string in the form accepted by browser `window.open`.
    pub fn to_feature_string(&self) -> String {
        let flag = |on: bool| if on { "yes" } else { "no" };
        let chrome = flag(self.chrome);
        format!(
            "width={},height={},menubar={chrome},toolbar={chrome},location={chrome},status={chrome},scrollbars=no,resizable={}",
            self.width,
            self.height,
            flag(self.resizable)
        )
    }
}

/// An externally controlled window. Every call may fail because the user can
/// close, navigate or wipe it at any time.
pub trait SurfaceWindow: Send + Sync {
    fn is_closed(&self) -> bool;
    fn has_element(&self, id: &str) -> Result<bool, SurfaceError>;
    /// Replaces the whole document.
    fn write_document(&self, html: &str) -> Result<(), SurfaceError>;
    fn set_text(&self, id: &str, text: &str) -> Result<(), SurfaceError>;
    fn set_font_size(&self, id: &str, px: u32) -> Result<(), SurfaceError>;
    fn set_value(&self, id: &str, value: &str) -> Result<(), SurfaceError>;
    fn set_checked(&self, id: &str, checked: bool) -> Result<(), SurfaceError>;
    fn focus(&self);
}

/// Windowing primitive. Opening a name that is already live returns that
/// window rather than a new one.
pub trait WindowHost: Send + Sync {
    fn open(
        &self,
        name: &str,
        features: &WindowFeatures,
    ) -> Result<Arc<dyn SurfaceWindow>, SurfaceError>;
}
