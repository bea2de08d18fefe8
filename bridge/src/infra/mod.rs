//! Infrastructure layer

pub mod module_fs;
pub mod shell;
