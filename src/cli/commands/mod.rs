mod admin;
mod export;

pub use admin::cmd_create_admin;
pub use export::cmd_export_members;
