//! Plain-text rendering of notification events.

use std::fmt::Write;

use crate::clients::mail::MailMessage;
use crate::domain::events::{MemberChange, NotificationEvent};

/// Render an event into a message signed by `team`.
#[must_use]
pub fn render(event: &NotificationEvent, team: &str) -> MailMessage {
    let (subject, body) = match event {
        NotificationEvent::AdminRegistered {
            name, created_at, ..
        } => (
            "Welcome to the admin console".to_string(),
            format!(
                "Hello {name},\n\nYour administrator account was created on {created_at}.\n\
                 You can now sign in and manage members."
            ),
        ),
        NotificationEvent::AdminLoggedIn {
            name, logged_in_at, ..
        } => (
            "New sign-in to your admin account".to_string(),
            format!(
                "Hello {name},\n\nYour account signed in at {logged_in_at}.\n\
                 If this was not you, change your password immediately."
            ),
        ),
        NotificationEvent::OtpIssued {
            name,
            code,
            valid_minutes,
            ..
        } => (
            "Your login code".to_string(),
            format!(
                "Hello {name},\n\nYour login code is:\n\n{}\n\n\
                 This code is valid for {valid_minutes} minutes.",
                code.expose()
            ),
        ),
        NotificationEvent::MemberCreated { username, email } => (
            "Your account has been created".to_string(),
            format!(
                "Hello {username},\n\nYour account has been created.\n\n\
                 Details:\n- Username: {username}\n- Email: {email}\n\n\
                 Please contact the administrator to obtain your password."
            ),
        ),
        NotificationEvent::MemberUpdated {
            username, changes, ..
        } => (
            "Your account has been updated".to_string(),
            format!(
                "Hello {username},\n\nYour account information has been updated.\n\n\
                 Changes:\n{}",
                describe_changes(changes)
            ),
        ),
        NotificationEvent::MemberDeleted { username, .. } => (
            "Your account has been deleted".to_string(),
            format!(
                "Hello {username},\n\nYour account has been removed from the system.\n\
                 If this is a mistake, contact the administrator right away."
            ),
        ),
    };

    MailMessage {
        to: event.recipient().to_string(),
        subject,
        body: format!("{body}\n\nRegards,\n{team}"),
    }
}

fn describe_changes(changes: &[MemberChange]) -> String {
    if changes.is_empty() {
        return "- No fields changed".to_string();
    }

    let mut out = String::new();
    for change in changes {
        let _ = match change {
            MemberChange::Username(value) => writeln!(out, "- Username: {value}"),
            MemberChange::Email(value) => writeln!(out, "- Email: {value}"),
            MemberChange::Password => writeln!(out, "- Password: changed"),
            MemberChange::Image => writeln!(out, "- Profile image: updated"),
        };
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::OtpCode;

    #[test]
    fn test_otp_mail_contains_code_and_validity() {
        let event = NotificationEvent::OtpIssued {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            code: OtpCode::new("012345".to_string()),
            valid_minutes: 5,
        };

        let message = render(&event, "Admin Team");
        assert_eq!(message.to, "ana@example.com");
        assert!(message.body.contains("012345"));
        assert!(message.body.contains("5 minutes"));
        assert!(message.body.ends_with("Admin Team"));
    }

    #[test]
    fn test_update_mail_lists_changes() {
        let event = NotificationEvent::MemberUpdated {
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            changes: vec![
                MemberChange::Email("bob@example.com".to_string()),
                MemberChange::Password,
            ],
        };

        let message = render(&event, "Admin Team");
        assert!(message.body.contains("- Email: bob@example.com"));
        assert!(message.body.contains("- Password: changed"));
        assert!(!message.body.contains("Username:"));
    }

    #[test]
    fn test_delete_mail_goes_to_former_address() {
        let event = NotificationEvent::MemberDeleted {
            username: "carol".to_string(),
            email: "carol@example.com".to_string(),
        };

        let message = render(&event, "Ops");
        assert_eq!(message.to, "carol@example.com");
        assert!(message.subject.contains("deleted"));
    }
}
