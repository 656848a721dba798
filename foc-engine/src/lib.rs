pub mod allocation;
pub mod filters;
pub mod tracker;
