//! Login-item registration seam.
//!
//! Platform backends (login items, registry run keys, XDG autostart) live
//! outside this crate and plug in through [`Autostart`]. The in-process
//! implementation here records the registration without touching the OS.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// What gets registered to start at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutostartEntry {
    pub app_name: String,
    pub app_path: PathBuf,
}

impl AutostartEntry {
    pub fn new(app_name: impl Into<String>, app_path: impl Into<PathBuf>) -> Self {
        Self {
            app_name: app_name.into(),
            app_path: app_path.into(),
        }
    }
}

/// Register, check and remove a start-at-login entry.
pub trait Autostart: Send + Sync {
    fn register(&self, entry: &AutostartEntry) -> Result<(), AutostartError>;
    fn is_registered(&self, entry: &AutostartEntry) -> Result<bool, AutostartError>;
    fn remove(&self, entry: &AutostartEntry) -> Result<(), AutostartError>;
}

/// Autostart that only remembers whether it was asked to register.
#[derive(Debug, Default)]
pub struct NoopAutostart {
    registered: AtomicBool,
}

impl NoopAutostart {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Autostart for NoopAutostart {
    fn register(&self, entry: &AutostartEntry) -> Result<(), AutostartError> {
        tracing::debug!(app = %entry.app_name, "Autostart registration recorded in memory only");
        self.registered.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_registered(&self, _entry: &AutostartEntry) -> Result<bool, AutostartError> {
        Ok(self.registered.load(Ordering::SeqCst))
    }

    fn remove(&self, _entry: &AutostartEntry) -> Result<(), AutostartError> {
        self.registered.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Autostart errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutostartError {
    Unsupported,
    Backend(String),
}

impl std::fmt::Display for AutostartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AutostartError::Unsupported => write!(f, "Autostart is not supported on this platform"),
            AutostartError::Backend(e) => write!(f, "Autostart backend error: {e}"),
        }
    }
}

impl std::error::Error for AutostartError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_autostart_lifecycle() {
        let autostart = NoopAutostart::new();
        let entry = AutostartEntry::new("Sundial", "/Applications/Sundial.app");

        assert!(!autostart.is_registered(&entry).unwrap());
        autostart.register(&entry).unwrap();
        assert!(autostart.is_registered(&entry).unwrap());
        autostart.remove(&entry).unwrap();
        assert!(!autostart.is_registered(&entry).unwrap());
    }

    #[test]
    fn test_trait_object() {
        let autostart: Box<dyn Autostart> = Box::new(NoopAutostart::new());
        let entry = AutostartEntry::new("Sundial", "sundial");
        autostart.register(&entry).unwrap();
        assert!(autostart.is_registered(&entry).unwrap());
    }
}
