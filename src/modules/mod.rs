pub mod encryption;
pub mod progress;
