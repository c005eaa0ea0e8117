pub mod get;
pub mod init;
pub mod ls;
pub mod mkdir;
pub mod put;
pub mod rm;
pub mod tenant;
pub mod version;

pub use get::Get;
pub use init::Init;
pub use ls::Ls;
pub use mkdir::Mkdir;
pub use put::Put;
pub use rm::Rm;
pub use tenant::Tenant;
pub use version::Version;
