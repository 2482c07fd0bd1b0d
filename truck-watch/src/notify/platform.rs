//! Notification permission and platform capabilities

use serde::{Deserialize, Serialize};
use std::fmt;

/// Notification permission as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    /// Not asked yet
    #[default]
    Default,
    Granted,
    Denied,
}

impl PermissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionState::Default => "default",
            PermissionState::Granted => "granted",
            PermissionState::Denied => "denied",
        }
    }
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a notification reaches the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMethod {
    /// Shown by the page itself
    Direct,
    /// Shown through the background worker registration
    Worker,
}

/// What the current platform can do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformCapabilities {
    pub notifications_supported: bool,
    pub worker_available: bool,
    /// Running as an installed app rather than a browser tab
    pub installed_app: bool,
    /// Platform only shows notifications through a background worker (Android)
    pub requires_worker: bool,
}

impl PlatformCapabilities {
    /// Desktop browser running the installed app
    pub fn desktop() -> Self {
        Self {
            notifications_supported: true,
            worker_available: true,
            installed_app: true,
            requires_worker: false,
        }
    }

    /// Android running the installed app
    pub fn android() -> Self {
        Self {
            requires_worker: true,
            ..Self::desktop()
        }
    }

    pub fn unsupported() -> Self {
        Self::default()
    }

    pub fn delivery_method(&self) -> DeliveryMethod {
        if self.requires_worker && self.installed_app && self.worker_available {
            DeliveryMethod::Worker
        } else {
            DeliveryMethod::Direct
        }
    }

    /// Whether a permission prompt may be shown at all
    pub fn can_prompt(&self) -> bool {
        self.notifications_supported && self.installed_app
    }
}
