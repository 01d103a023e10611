pub mod attendance;
pub mod enrollment;
pub mod report;
pub mod session;
pub mod subject;
pub mod token;
pub mod user;
