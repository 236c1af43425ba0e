pub mod local;

pub use local::{LocalCommands, handle_local_command};
