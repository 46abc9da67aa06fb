pub mod chat;
pub mod execute;
pub mod init;
pub mod session;
pub mod tools;
