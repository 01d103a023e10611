pub mod csv;
pub mod jwt;
pub mod password;
pub mod qr;
pub mod time;
