use std::time::Duration;
use tracing::warn;

use crate::config::Config;
use crate::services::{AuthError, Registration};
use crate::state::SharedState;

pub async fn cmd_create_admin(
    config: &Config,
    name: &str,
    email: &str,
    password: &str,
    two_factor: bool,
) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;

    let registration = Registration {
        name: name.to_string(),
        email: email.to_string(),
        password: password.to_string(),
        password_confirmation: password.to_string(),
    };

    let admin = match state.auth_service.register(registration).await {
        Ok(admin) => admin,
        Err(AuthError::Validation(errors)) => {
            for (field, messages) in errors.iter() {
                for message in messages {
                    eprintln!("  {field}: {message}");
                }
            }
            anyhow::bail!("Invalid admin details");
        }
        Err(e) => return Err(anyhow::anyhow!(e)),
    };

    let admin = if two_factor {
        state
            .auth_service
            .set_two_factor(&admin.id, true)
            .await
            .map_err(|e| anyhow::anyhow!(e))?
    } else {
        admin
    };

    // Drain the outbox before the runtime shuts down.
    let drain_timeout = Duration::from_secs(config.mail.request_timeout_seconds.saturating_add(5));
    if !state.notifier.flush(drain_timeout).await {
        warn!("Welcome mail was not delivered before exit");
    }

    println!("✓ Admin created");
    println!("  ID:    {}", admin.id);
    println!("  Name:  {}", admin.name);
    println!("  Email: {}", admin.email);
    println!(
        "  2FA:   {}",
        if admin.two_factor_enabled { "enabled" } else { "disabled" }
    );

    Ok(())
}
