pub mod env_file;
pub mod settings;

pub use env_file::{load_env_file, load_env_file_if_present};
pub use settings::{EnvSource, EnvState, ProcessEnv, Settings};
