pub use super::account_roles::Entity as AccountRoles;
pub use super::accounts::Entity as Accounts;
pub use super::permissions::Entity as Permissions;
pub use super::role_permissions::Entity as RolePermissions;
pub use super::roles::Entity as Roles;
pub use super::sessions::Entity as Sessions;
