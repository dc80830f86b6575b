//! Local payload removal.

mod fs;
mod types;

pub use fs::FsLocalContent;
pub use types::*;
