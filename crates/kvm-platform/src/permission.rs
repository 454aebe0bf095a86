//! Accessibility/screen-capture permission probe (§6, §7, §9: "check once,
//! cache forever" becomes a probe invoked lazily at each state transition
//! that requires it).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Accessibility,
    ScreenCapture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

pub trait PermissionProbe: Send {
    /// Check current status without prompting.
    fn check(&mut self, permission: Permission) -> PermissionStatus;

    /// Check, and if denied, trigger the platform's permission prompt.
    /// Still returns the pre-prompt status — granting only takes effect
    /// on a subsequent `check`.
    fn check_and_prompt(&mut self, permission: Permission) -> PermissionStatus;
}

/// Test double with a fixed, settable status per permission.
#[derive(Debug, Default)]
pub struct StubPermissionProbe {
    accessibility: Option<PermissionStatus>,
    screen_capture: Option<PermissionStatus>,
    pub prompt_calls: Vec<Permission>,
}

impl StubPermissionProbe {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, permission: Permission, status: PermissionStatus) {
        match permission {
            Permission::Accessibility => self.accessibility = Some(status),
            Permission::ScreenCapture => self.screen_capture = Some(status),
        }
    }

    fn slot(&self, permission: Permission) -> PermissionStatus {
        match permission {
            Permission::Accessibility => self.accessibility.unwrap_or(PermissionStatus::Denied),
            Permission::ScreenCapture => self.screen_capture.unwrap_or(PermissionStatus::Denied),
        }
    }
}

impl PermissionProbe for StubPermissionProbe {
    fn check(&mut self, permission: Permission) -> PermissionStatus {
        self.slot(permission)
    }

    fn check_and_prompt(&mut self, permission: Permission) -> PermissionStatus {
        let status = self.slot(permission);
        if status == PermissionStatus::Denied {
            self.prompt_calls.push(permission);
        }
        status
    }
}
