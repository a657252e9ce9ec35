use super::*;
use serial_test::serial;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.embedder.protocol, "http");
    assert_eq!(config.embedder.host, "localhost");
    assert_eq!(config.embedder.port, 11434);
    assert_eq!(config.embedder.model, "all-minilm:latest");
    assert_eq!(config.embedder.embedding_dimension, 384);
    assert_eq!(config.pipeline.poll_interval_seconds, 5);
    assert_eq!(config.pipeline.max_poll_attempts, 200);
    assert_eq!(config.search.top_k, 4);
    assert_eq!(config.search.keyword_limit, 10);
    assert_eq!(config.search.debounce_ms, 150);
    assert!(config.validate().is_ok());
}

#[test]
fn embedder_validation() {
    let config = Config::default();

    let mut invalid_config = config.clone();
    invalid_config.embedder.protocol = "ftp".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedder.port = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedder.model = String::new();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedder.batch_size = 1001;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.embedder.embedding_dimension = 32;
    assert!(invalid_config.validate().is_err());
}

#[test]
fn pipeline_validation() {
    let config = Config::default();

    let mut invalid_config = config.clone();
    invalid_config.pipeline.base_url = "not a url".to_string();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidUrl(_))
    ));

    let mut invalid_config = config.clone();
    invalid_config.pipeline.base_url = "ftp://example.com".to_string();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidProtocol(_))
    ));

    let mut invalid_config = config.clone();
    invalid_config.pipeline.poll_interval_seconds = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.pipeline.max_poll_attempts = 0;
    assert!(invalid_config.validate().is_err());
}

#[test]
fn search_validation() {
    let mut config = Config::default();
    config.search.top_k = 0;
    assert!(matches!(config.validate(), Err(ConfigError::InvalidTopK(0))));

    let mut config = Config::default();
    config.search.debounce_ms = 10_000;
    assert!(config.validate().is_err());
}

#[test]
fn ollama_url_generation() {
    let config = Config::default();
    let url = config
        .embedder
        .ollama_url()
        .expect("should generate ollama_url successfully");
    assert_eq!(url.as_str(), "http://localhost:11434/");
}

#[test]
fn empty_api_key_is_absent() {
    let mut pipeline = PipelineApiConfig::default();
    assert_eq!(pipeline.api_key(), None);

    pipeline.api_key = Some("   ".to_string());
    assert_eq!(pipeline.api_key(), None);

    pipeline.api_key = Some("secret".to_string());
    assert_eq!(pipeline.api_key(), Some("secret"));
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn partial_toml_uses_defaults() {
    let partial = r#"
        [embedder]
        host = "gpu-box"

        [search]
        top_k = 8
    "#;

    let config: Config = toml::from_str(partial).expect("should parse partial toml");
    assert_eq!(config.embedder.host, "gpu-box");
    assert_eq!(config.embedder.port, 11434);
    assert_eq!(config.search.top_k, 8);
    assert_eq!(config.search.keyword_limit, 10);
    assert_eq!(config.pipeline, PipelineApiConfig::default());
}

#[test]
fn setter_validation() {
    let mut embedder = EmbedderConfig::default();

    assert!(embedder.set_protocol("https".to_string()).is_ok());
    assert!(embedder.set_host("example.com".to_string()).is_ok());
    assert!(embedder.set_port(8080).is_ok());
    assert!(embedder.set_model("nomic-embed-text".to_string()).is_ok());
    assert!(embedder.set_batch_size(128).is_ok());
    assert!(embedder.set_embedding_dimension(768).is_ok());

    assert!(embedder.set_protocol("ftp".to_string()).is_err());
    assert!(embedder.set_port(0).is_err());
    assert!(embedder.set_model(String::new()).is_err());
    assert!(embedder.set_batch_size(0).is_err());
    assert!(embedder.set_embedding_dimension(5000).is_err());

    let mut pipeline = PipelineApiConfig::default();
    assert!(pipeline.set_base_url("https://api.example.com/".to_string()).is_ok());
    assert!(pipeline.set_poll_interval_seconds(1).is_ok());
    assert!(pipeline.set_max_poll_attempts(10).is_ok());
    assert!(pipeline.set_base_url("example.com".to_string()).is_err());
    assert!(pipeline.set_poll_interval_seconds(301).is_err());
    assert!(pipeline.set_max_poll_attempts(0).is_err());
}

#[test]
#[serial]
fn load_missing_config_uses_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    // SAFETY: serialized with every other test that touches the environment
    unsafe { std::env::remove_var(API_KEY_ENV) };

    let config = Config::load(temp_dir.path()).expect("missing config should load");
    assert_eq!(config.embedder, EmbedderConfig::default());
    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert_eq!(config.pipeline.api_key(), None);
}

#[test]
#[serial]
fn save_and_reload() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    // SAFETY: serialized with every other test that touches the environment
    unsafe { std::env::remove_var(API_KEY_ENV) };

    let mut config = Config {
        base_dir: temp_dir.path().join("nested"),
        ..Config::default()
    };
    config.pipeline.api_key = Some("from-file".to_string());
    config.search.top_k = 6;
    config.save().expect("config should save");

    assert!(config.config_file_path().exists());

    let loaded = Config::load(temp_dir.path().join("nested")).expect("config should reload");
    assert_eq!(loaded, config);
}

#[test]
#[serial]
fn env_overrides_api_key() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    // SAFETY: serialized with every other test that touches the environment
    unsafe { std::env::set_var(API_KEY_ENV, "from-env") };

    let config = Config::load(temp_dir.path()).expect("config should load");

    // SAFETY: see above
    unsafe { std::env::remove_var(API_KEY_ENV) };

    assert_eq!(config.pipeline.api_key(), Some("from-env"));
}

#[test]
#[serial]
fn invalid_file_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[search]\ntop_k = 0\n",
    )
    .expect("should write config");

    let result = Config::load(temp_dir.path());
    assert!(result.is_err());
}
