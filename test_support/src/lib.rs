pub mod alloc_tracking;
pub mod utils;
