pub mod check;
pub mod init;
pub mod key;
mod key_material;
pub mod secret;
pub mod version;

pub use check::Check;
pub use init::Init;
pub use key::Key;
pub use secret::Secret;
pub use version::Version;
