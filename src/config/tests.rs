use super::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[test]
fn config_dir_override_wins() {
    let dir = get_config_dir(Some(Path::new("/tmp/firstaid"))).expect("override is accepted");
    assert_eq!(dir, Path::new("/tmp/firstaid"));
}

#[test]
fn config_file_persistence() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config_path = temp_dir.path().join("config.toml");

    let saved_config = Config {
        embedding: EmbeddingConfig {
            provider: EmbeddingProvider::Ollama,
            protocol: "https".to_string(),
            host: "test-host".to_string(),
            port: 8080,
            model: "test-model".to_string(),
            batch_size: 32,
            embedding_dimension: 384,
        },
        ..Config::default()
    };

    let toml_content = toml::to_string_pretty(&saved_config)
        .expect("config should convert to toml string successfully");
    fs::write(&config_path, toml_content).expect("should write to config_path successfully");

    let loaded_config = Config::load(temp_dir.path()).expect("should load config successfully");

    assert_eq!(saved_config.embedding, loaded_config.embedding);
    assert_eq!(loaded_config.base_dir, temp_dir.path());
}

#[test]
fn invalid_toml_handling() {
    let invalid_toml = r#"
        [embedding
        host = "localhost"
        port = "invalid_port"
    "#;

    let result: Result<Config, toml::de::Error> = toml::from_str(invalid_toml);
    assert!(result.is_err());
}
