pub mod prelude;

pub mod admin_sessions;
pub mod admins;
pub mod members;
