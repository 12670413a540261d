pub mod capture;
pub mod stability;
pub mod window_context;
