pub mod prelude;

pub mod account_roles;
pub mod accounts;
pub mod permissions;
pub mod role_permissions;
pub mod roles;
pub mod sessions;
