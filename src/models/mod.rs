pub mod menu;
pub mod resource;
pub mod role;
pub mod role_menu;
pub mod role_resource;
pub mod user;
pub mod user_role;
