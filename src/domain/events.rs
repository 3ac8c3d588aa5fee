//! Notification events emitted by the services.
//!
//! Events are queued on the mail outbox and rendered into plain-text messages
//! by the delivery worker, so the request that caused them never waits on mail.

use std::fmt;

/// A login passcode in transit to the mail worker. Redacted from debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    #[must_use]
    pub const fn new(code: String) -> Self {
        Self(code)
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(******)")
    }
}

/// A field touched by a member update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberChange {
    Username(String),
    Email(String),
    Password,
    Image,
}

#[derive(Debug, Clone)]
pub enum NotificationEvent {
    AdminRegistered {
        name: String,
        email: String,
        created_at: String,
    },
    AdminLoggedIn {
        name: String,
        email: String,
        logged_in_at: String,
    },
    OtpIssued {
        name: String,
        email: String,
        code: OtpCode,
        valid_minutes: u64,
    },
    MemberCreated {
        username: String,
        email: String,
    },
    MemberUpdated {
        username: String,
        email: String,
        changes: Vec<MemberChange>,
    },
    MemberDeleted {
        username: String,
        email: String,
    },
}

impl NotificationEvent {
    /// Address the resulting message is delivered to.
    #[must_use]
    pub fn recipient(&self) -> &str {
        match self {
            Self::AdminRegistered { email, .. }
            | Self::AdminLoggedIn { email, .. }
            | Self::OtpIssued { email, .. }
            | Self::MemberCreated { email, .. }
            | Self::MemberUpdated { email, .. }
            | Self::MemberDeleted { email, .. } => email,
        }
    }

    /// Short label used for log fields and metric labels.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AdminRegistered { .. } => "admin_registered",
            Self::AdminLoggedIn { .. } => "admin_logged_in",
            Self::OtpIssued { .. } => "otp_issued",
            Self::MemberCreated { .. } => "member_created",
            Self::MemberUpdated { .. } => "member_updated",
            Self::MemberDeleted { .. } => "member_deleted",
        }
    }
}
