// Configuration management module
// TOML settings for the embedder, pipeline service, chat webhook, search and file paths

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    API_KEY_ENV, ChatConfig, Config, ConfigError, EmbedderConfig, PathsConfig, PipelineApiConfig,
    SearchConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
