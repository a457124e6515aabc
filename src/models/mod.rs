pub mod attendance;
pub mod ballot;
pub mod poll;
pub mod user;
