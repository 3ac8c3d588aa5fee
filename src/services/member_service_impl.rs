//! `SeaORM` implementation of the `MemberService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::config::SecurityConfig;
use crate::db::{self, MemberPatch, NewMember, Store};
use crate::domain::events::{MemberChange, NotificationEvent};
use crate::domain::validation::{FieldErrors, PASSWORD_MIN, USERNAME_MAX};
use crate::domain::{Member, MemberId};
use crate::security;
use crate::services::Notifier;
use crate::services::export;
use crate::services::member_service::{CreateMember, MemberError, MemberService, UpdateMember};

pub struct SeaOrmMemberService {
    store: Store,
    notifier: Notifier,
    security: SecurityConfig,
}

impl SeaOrmMemberService {
    #[must_use]
    pub const fn new(store: Store, notifier: Notifier, security: SecurityConfig) -> Self {
        Self {
            store,
            notifier,
            security,
        }
    }

    async fn find(&self, id: &str) -> Result<(MemberId, Member), MemberError> {
        let member_id = MemberId::parse(id).ok_or(MemberError::NotFound)?;
        let member = self
            .store
            .get_member(&member_id)
            .await?
            .ok_or(MemberError::NotFound)?;
        Ok((member_id, member))
    }

    async fn ensure_email_free(&self, email: &str) -> Result<(), MemberError> {
        if self.store.get_member_by_email(email).await?.is_some() {
            return Err(MemberError::EmailTaken);
        }
        Ok(())
    }
}

fn check_username(errors: &mut FieldErrors, username: &str) {
    if errors.required("username", username) {
        errors.max_chars("username", username, USERNAME_MAX);
    }
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    if errors.required("email", email) {
        errors.email("email", email);
    }
}

fn check_password(errors: &mut FieldErrors, password: &str) {
    if errors.required("password", password) {
        errors.min_chars("password", password, PASSWORD_MIN);
    }
}

fn map_unique(err: anyhow::Error) -> MemberError {
    if db::is_unique_violation(&err) {
        MemberError::EmailTaken
    } else {
        err.into()
    }
}

#[async_trait]
impl MemberService for SeaOrmMemberService {
    async fn list(&self) -> Result<Vec<Member>, MemberError> {
        Ok(self.store.list_members().await?)
    }

    async fn get(&self, id: &str) -> Result<Member, MemberError> {
        let (_, member) = self.find(id).await?;
        Ok(member)
    }

    async fn create(&self, input: CreateMember) -> Result<Member, MemberError> {
        let username = input.username.trim().to_string();
        let email = input.email.trim().to_string();

        let mut errors = FieldErrors::new();
        check_username(&mut errors, &username);
        check_email(&mut errors, &email);
        check_password(&mut errors, &input.password);
        errors.into_result()?;

        self.ensure_email_free(&email).await?;

        let password_hash = security::hash_secret_blocking(&input.password, &self.security).await?;

        let member = self
            .store
            .create_member(NewMember {
                username,
                email,
                password_hash,
                image: input.image,
            })
            .await
            .map_err(map_unique)?;

        self.notifier.enqueue(NotificationEvent::MemberCreated {
            username: member.username.clone(),
            email: member.email.clone(),
        });

        metrics::counter!("member_mutations_total", "action" => "create").increment(1);
        info!(member_id = %member.id, "Member created");

        Ok(member)
    }

    async fn update(&self, id: &str, input: UpdateMember) -> Result<Member, MemberError> {
        let (member_id, existing) = self.find(id).await?;

        let username = input.username.map(|u| u.trim().to_string());
        let email = input.email.map(|e| e.trim().to_string());

        let mut errors = FieldErrors::new();
        if let Some(username) = &username {
            check_username(&mut errors, username);
        }
        if let Some(email) = &email {
            check_email(&mut errors, email);
        }
        if let Some(password) = &input.password {
            check_password(&mut errors, password);
        }
        errors.into_result()?;

        if let Some(email) = &email
            && *email != existing.email
        {
            self.ensure_email_free(email).await?;
        }

        let password_hash = match &input.password {
            Some(password) => Some(security::hash_secret_blocking(password, &self.security).await?),
            None => None,
        };

        let mut changes = Vec::new();
        if let Some(username) = &username {
            changes.push(MemberChange::Username(username.clone()));
        }
        if let Some(email) = &email {
            changes.push(MemberChange::Email(email.clone()));
        }
        if password_hash.is_some() {
            changes.push(MemberChange::Password);
        }
        if input.image.is_some() {
            changes.push(MemberChange::Image);
        }

        let patch = MemberPatch {
            username,
            email,
            password_hash,
            image: input.image,
        };

        let member = self
            .store
            .update_member(&member_id, patch)
            .await
            .map_err(map_unique)?
            .ok_or(MemberError::NotFound)?;

        self.notifier.enqueue(NotificationEvent::MemberUpdated {
            username: member.username.clone(),
            email: member.email.clone(),
            changes,
        });

        metrics::counter!("member_mutations_total", "action" => "update").increment(1);
        info!(member_id = %member.id, "Member updated");

        Ok(member)
    }

    async fn delete(&self, id: &str) -> Result<(), MemberError> {
        let (member_id, existing) = self.find(id).await?;

        if !self.store.delete_member(&member_id).await? {
            return Err(MemberError::NotFound);
        }

        self.notifier.enqueue(NotificationEvent::MemberDeleted {
            username: existing.username,
            email: existing.email,
        });

        metrics::counter!("member_mutations_total", "action" => "delete").increment(1);
        info!(member_id = %member_id, "Member deleted");

        Ok(())
    }

    async fn export_csv(&self) -> Result<String, MemberError> {
        let members = self.store.list_members().await?;
        Ok(export::members_to_csv(&members))
    }
}
