pub mod engine;
pub mod events;
pub mod history;
pub mod journal;
pub mod signals;
