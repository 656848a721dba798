pub mod crop;
pub mod loader;
pub mod operation;
pub mod sheet;
pub mod template;
