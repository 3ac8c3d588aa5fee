pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, LoginOutcome, Registration, SessionAdmin};
pub use auth_service_impl::SeaOrmAuthService;

pub mod member_service;
pub mod member_service_impl;
pub use member_service::{CreateMember, MemberError, MemberService, UpdateMember};
pub use member_service_impl::SeaOrmMemberService;

pub mod export;
pub mod mail_templates;

pub mod notifier;
pub use notifier::Notifier;
