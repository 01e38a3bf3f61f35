/// `grove init` command.
pub mod init;

pub use init::init;
