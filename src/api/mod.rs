pub mod admin;
pub mod attendance;
pub mod correction;
