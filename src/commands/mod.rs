pub mod config;
pub mod invoke;

pub use config::{ConfigArgs, handle_config_command, load_config};
pub use invoke::{InvokeArgs, handle_invoke_command};
