pub mod context;
pub mod export;
pub mod patch;
pub mod project;
pub mod task;
pub mod user;
