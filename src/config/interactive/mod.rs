#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Password, Select};

use super::{ChatConfig, Config, ConfigError, EmbedderConfig, PipelineApiConfig};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 Docs Companion Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Embedder Configuration").bold().yellow());
    eprintln!("Configure the Ollama instance used for semantic search embeddings.");
    eprintln!();

    configure_embedder(&mut config.embedder)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.embedder) {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before embedding docs.");
    }

    eprintln!();
    eprintln!("{}", style("Pipeline Service").bold().yellow());
    configure_pipeline(&mut config.pipeline)?;

    eprintln!();
    eprintln!("{}", style("Chat Webhook").bold().yellow());
    configure_chat(&mut config.chat)?;

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedder Settings:").bold().yellow());
    eprintln!("  Host: {}", style(&config.embedder.host).cyan());
    eprintln!("  Port: {}", style(config.embedder.port).cyan());
    eprintln!("  Model: {}", style(&config.embedder.model).cyan());
    eprintln!(
        "  Dimension: {}",
        style(config.embedder.embedding_dimension).cyan()
    );
    eprintln!("  Batch Size: {}", style(config.embedder.batch_size).cyan());
    match config.embedder.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!("{}", style("Pipeline Settings:").bold().yellow());
    eprintln!("  Base URL: {}", style(&config.pipeline.base_url).cyan());
    eprintln!(
        "  API Key: {}",
        style(mask_secret(config.pipeline.api_key())).cyan()
    );
    eprintln!("  Task Name: {}", style(&config.pipeline.task_name).cyan());
    eprintln!(
        "  Poll Interval: {}s",
        style(config.pipeline.poll_interval_seconds).cyan()
    );
    eprintln!(
        "  Max Poll Attempts: {}",
        style(config.pipeline.max_poll_attempts).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Chat Settings:").bold().yellow());
    eprintln!("  Webhook URL: {}", style(&config.chat.webhook_url).cyan());
    eprintln!(
        "  Webhook Token: {}",
        style(mask_secret(config.chat.webhook_token.as_deref())).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Search Settings:").bold().yellow());
    eprintln!("  Top K: {}", style(config.search.top_k).cyan());
    eprintln!(
        "  Keyword Limit: {}",
        style(config.search.keyword_limit).cyan()
    );
    eprintln!("  Debounce: {}ms", style(config.search.debounce_ms).cyan());

    eprintln!();
    eprintln!("Config file: {}", style(config.config_file_path().display()).dim());

    Ok(())
}

/// Show only the last four characters of a secret
fn mask_secret(secret: Option<&str>) -> String {
    match secret {
        None => "(not set)".to_string(),
        Some(value) => {
            let chars: Vec<char> = value.chars().collect();
            if chars.len() <= 4 {
                "****".to_string()
            } else {
                let tail: String = chars[chars.len() - 4..].iter().collect();
                format!("****{}", tail)
            }
        }
    }
}

fn load_existing_config() -> Result<Config> {
    Config::load_default().or_else(|_| {
        eprintln!(
            "{}",
            style("No existing configuration found. Using defaults.").yellow()
        );
        let base_dir = Config::config_dir().context("Failed to locate configuration directory")?;
        Ok(Config {
            base_dir,
            ..Config::default()
        })
    })
}

fn configure_embedder(embedder: &mut EmbedderConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == embedder.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(embedder.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = EmbedderConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..EmbedderConfig::default()
            };
            temp_config.validate()
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(embedder.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(embedder.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let dimension: u32 = Input::new()
        .with_prompt("Embedding dimension (must match the model)")
        .default(embedder.embedding_dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 64 and 4096")
            }
        })
        .interact_text()?;

    embedder.set_protocol(protocol)?;
    embedder.set_host(host)?;
    embedder.set_port(port)?;
    embedder.set_model(model)?;
    embedder.set_embedding_dimension(dimension)?;

    Ok(())
}

fn configure_pipeline(pipeline: &mut PipelineApiConfig) -> Result<()> {
    let base_url: String = Input::new()
        .with_prompt("Pipeline API base URL")
        .default(pipeline.base_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            PipelineApiConfig {
                base_url: input.clone(),
                ..PipelineApiConfig::default()
            }
            .validate()
        })
        .interact_text()?;

    let api_key: String = Password::new()
        .with_prompt("Pipeline API key (leave empty to keep current)")
        .allow_empty_password(true)
        .interact()?;

    let interval: u64 = Input::new()
        .with_prompt("Poll interval in seconds")
        .default(pipeline.poll_interval_seconds)
        .interact_text()?;

    pipeline.set_base_url(base_url)?;
    pipeline.set_poll_interval_seconds(interval)?;
    if !api_key.trim().is_empty() {
        pipeline.api_key = Some(api_key);
    }

    Ok(())
}

fn configure_chat(chat: &mut ChatConfig) -> Result<()> {
    let webhook_url: String = Input::new()
        .with_prompt("Chat webhook URL")
        .default(chat.webhook_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            ChatConfig {
                webhook_url: input.clone(),
                ..ChatConfig::default()
            }
            .validate()
        })
        .interact_text()?;

    let token: String = Password::new()
        .with_prompt("Webhook token (leave empty to keep current)")
        .allow_empty_password(true)
        .interact()?;

    let authorization: String = Password::new()
        .with_prompt("Webhook authorization key (leave empty to keep current)")
        .allow_empty_password(true)
        .interact()?;

    chat.webhook_url = webhook_url;
    if !token.trim().is_empty() {
        chat.webhook_token = Some(token);
    }
    if !authorization.trim().is_empty() {
        chat.authorization = Some(authorization);
    }

    Ok(())
}

fn test_ollama_connection(embedder: &EmbedderConfig) -> bool {
    let url = format!(
        "{}://{}:{}/api/version",
        embedder.protocol, embedder.host, embedder.port
    );

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}
