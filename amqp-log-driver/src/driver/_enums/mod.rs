pub mod log_source;
