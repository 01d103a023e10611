pub mod attendance;
pub mod session;
pub mod subject;
pub mod token;
pub mod user;
