pub mod jwt;
pub mod middleware;
pub mod password;
pub mod permissions;
pub mod principal;

pub use jwt::{issue_token, validate_token, Claims, TokenError};
pub use password::{hash_password, verify_password};
pub use permissions::{roles_intersect, PathPattern, PermissionIndex, PermissionSource};
pub use principal::CurrentUser;
