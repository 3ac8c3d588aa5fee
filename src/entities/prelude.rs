pub use super::admin_sessions::Entity as AdminSessions;
pub use super::admins::Entity as Admins;
pub use super::members::Entity as Members;
