pub mod avoid;
pub mod event;
pub mod level;
pub mod loader;
pub mod paint;
