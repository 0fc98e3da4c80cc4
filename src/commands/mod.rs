//! CLI commands implementation

pub mod books;
pub mod export;
pub mod import;
pub mod init;
pub mod search;
pub mod status;

pub use books::*;
pub use export::*;
pub use import::*;
pub use init::*;
pub use search::*;
pub use status::*;
