pub mod executor;
pub mod input;
pub mod intent;
