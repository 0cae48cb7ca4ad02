pub mod admin;
pub mod map;
pub mod member;
pub mod settings;
