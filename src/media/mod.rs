pub mod file;
pub mod options;
pub mod picker;

pub use file::*;
pub use options::*;
pub use picker::*;
