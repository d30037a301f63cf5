//! Entity store setup commands.

pub mod import;
pub mod init;
