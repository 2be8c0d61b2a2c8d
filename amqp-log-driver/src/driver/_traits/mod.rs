pub mod log_driver;
