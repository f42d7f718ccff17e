//! Reminder notification delivery.
//!
//! [`Notifier`] tries a rich [`NotificationCapability`] first and degrades to
//! a plain [`AlertSink`] when the capability is missing, permission is denied
//! or declined, or the notification cannot be shown. Delivery never fails
//! outward: every error ends in the alert path.

use crate::config::NotificationConfig;
use std::io::Write;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// Permission state of a rich notification capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// The user allowed notifications.
    Granted,
    /// The user refused notifications.
    Denied,
    /// Not decided yet; asking is allowed.
    Undecided,
}

/// A platform notification facility with a permission model.
pub trait NotificationCapability: Send + Sync {
    /// Current permission state.
    fn permission(&self) -> Permission;

    /// Ask the user for permission and return the outcome.
    fn request_permission(&self) -> anyhow::Result<Permission>;

    /// Show a notification.
    fn show(&self, title: &str, body: &str) -> anyhow::Result<()>;
}

/// The universal fallback: a simple user-visible alert.
pub trait AlertSink: Send + Sync {
    /// Present `message` to the user.
    fn alert(&self, message: &str);
}

/// How a notification ended up being delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Shown through the rich capability.
    Rich,
    /// Shown through the fallback alert.
    Alert,
}

/// Best-effort notification dispatcher.
pub struct Notifier {
    capability: Option<Box<dyn NotificationCapability>>,
    alert: Box<dyn AlertSink>,
}

impl Notifier {
    /// Create a notifier from an optional rich capability and a fallback.
    #[must_use]
    pub fn new(
        capability: Option<Box<dyn NotificationCapability>>,
        alert: Box<dyn AlertSink>,
    ) -> Self {
        Self { capability, alert }
    }

    /// Alerts on stderr only.
    #[must_use]
    pub fn console_only() -> Self {
        Self::new(None, Box::new(ConsoleAlert::stderr()))
    }

    /// Build the platform notifier described by `config`.
    #[must_use]
    pub fn from_config(config: &NotificationConfig) -> Self {
        if config.desktop {
            if let Some(capability) = desktop_capability() {
                return Self::new(Some(capability), Box::new(ConsoleAlert::stderr()));
            }
            debug!("desktop notifications unavailable in this build, using console alerts");
        }
        Self::console_only()
    }

    /// Ask for permission when it has not been decided yet.
    ///
    /// Returns the resulting state, or `None` without a rich capability.
    /// Failures are logged and reported as [`Permission::Undecided`].
    pub fn ensure_permission(&self) -> Option<Permission> {
        let capability = self.capability.as_ref()?;
        match capability.permission() {
            Permission::Undecided => match capability.request_permission() {
                Ok(permission) => Some(permission),
                Err(e) => {
                    warn!("notification permission request failed: {e}");
                    Some(Permission::Undecided)
                }
            },
            decided => Some(decided),
        }
    }

    /// Deliver a notification, falling back to the alert on any failure.
    pub fn notify(&self, title: &str, body: &str) -> Delivery {
        if let Some(capability) = &self.capability {
            if try_rich(capability.as_ref(), title, body) {
                return Delivery::Rich;
            }
        }
        self.alert.alert(&format!("{title}: {body}"));
        Delivery::Alert
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("rich", &self.capability.is_some())
            .finish()
    }
}

fn try_rich(capability: &dyn NotificationCapability, title: &str, body: &str) -> bool {
    // A panicking backend must not take the timer task down with it.
    let attempt = catch_unwind(AssertUnwindSafe(|| -> anyhow::Result<bool> {
        let permission = match capability.permission() {
            Permission::Undecided => capability.request_permission()?,
            decided => decided,
        };
        if permission != Permission::Granted {
            debug!("notification permission {permission:?}, falling back to alert");
            return Ok(false);
        }
        capability.show(title, body)?;
        Ok(true)
    }));

    match attempt {
        Ok(Ok(shown)) => shown,
        Ok(Err(e)) => {
            warn!("rich notification failed, falling back to alert: {e}");
            false
        }
        Err(_) => {
            warn!("rich notification backend panicked, falling back to alert");
            false
        }
    }
}

/// Alert sink writing `title: body` lines to a writer.
pub struct ConsoleAlert {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleAlert {
    /// Write alerts to `out`.
    #[must_use]
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Write alerts to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }
}

impl AlertSink for ConsoleAlert {
    fn alert(&self, message: &str) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{message}").and_then(|()| out.flush()) {
            warn!("cannot write reminder alert: {e}");
        }
    }
}

#[cfg(feature = "desktop-notifications")]
fn desktop_capability() -> Option<Box<dyn NotificationCapability>> {
    Some(Box::new(DesktopCapability))
}

#[cfg(not(feature = "desktop-notifications"))]
fn desktop_capability() -> Option<Box<dyn NotificationCapability>> {
    None
}

/// Desktop notifications through the platform notification server.
///
/// Desktop platforms have no per-app prompt, so permission is always granted;
/// delivery problems surface from [`show`](NotificationCapability::show).
#[cfg(feature = "desktop-notifications")]
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopCapability;

#[cfg(feature = "desktop-notifications")]
impl NotificationCapability for DesktopCapability {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn request_permission(&self) -> anyhow::Result<Permission> {
        Ok(Permission::Granted)
    }

    fn show(&self, title: &str, body: &str) -> anyhow::Result<()> {
        notify_rust::Notification::new()
            .summary(title)
            .body(body)
            .appname("pillbox")
            .show()
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("desktop notification failed: {e}"))
    }
}
