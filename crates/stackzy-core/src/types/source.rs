use serde::{Deserialize, Serialize};

/// A connected device, as reported by the device bridge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceHandle {
    /// Bridge serial (e.g. `emulator-5554`)
    pub serial: String,

    /// Device model, if the bridge reported one
    #[serde(default)]
    pub model: Option<String>,
}

impl DeviceHandle {
    #[must_use]
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            model: None,
        }
    }
}

impl std::fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.model {
            Some(model) => write!(f, "{} ({model})", self.serial),
            None => write!(f, "{}", self.serial),
        }
    }
}

/// Store account used to open a download session
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCredential {
    /// Account e-mail
    pub email: String,

    /// Session token
    pub token: String,
}

impl StoreCredential {
    #[must_use]
    pub fn new(email: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StoreCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCredential")
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Where the binary of a run comes from
///
/// Exactly one variant is bound per pipeline and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionSource {
    /// Pull the installed APK from a connected device
    Device(DeviceHandle),
    /// Download the APK from the store
    Store(StoreCredential),
}

impl AcquisitionSource {
    /// Short label used in logs and state messages
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Device(_) => "device",
            Self::Store(_) => "store",
        }
    }
}
