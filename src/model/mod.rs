pub mod attendance;
pub mod department;
pub mod edit_log;
pub mod office;
pub mod role;
pub mod setting;
pub mod user;
