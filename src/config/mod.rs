// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a file (YAML or JSON)
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config = parse_config(&contents, is_yaml(path))?;
    config.validate()?;
    Ok(config)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn parse_config(contents: &str, yaml: bool) -> Result<Config> {
    let config: Config = if yaml {
        serde_yaml::from_str(contents).context("Failed to parse YAML config")?
    } else {
        serde_json::from_str(contents).context("Failed to parse JSON config")?
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let yaml = r#"
backends:
  - { protocol: tcp, host: localhost, port: 8000 }
  - { protocol: tcp, host: localhost, port: 8001, healthy: false }
"#;
        let config = parse_config(yaml, true).unwrap();
        config.validate().unwrap();

        assert_eq!(config.listen.port, 8080);
        assert_eq!(config.algorithm, LoadBalancerAlgorithm::RoundRobin);
        assert_eq!(config.health_check.interval(), Duration::from_secs(15));
        assert_eq!(config.backends.len(), 2);
        assert!(config.backends[0].healthy);
        assert!(!config.backends[1].healthy);
        assert_eq!(config.backends[1].address(), "localhost:8001");
        assert!(!config.mock_backends);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_json_config() {
        let json = r#"{
            "algorithm": "ip_hash",
            "listen": { "host": "127.0.0.1", "port": 9000 },
            "backends": [{ "protocol": "tcp", "host": "10.0.0.1", "port": 7000 }],
            "health_check": { "interval_ms": 500, "timeout_ms": 100 }
        }"#;
        let config = parse_config(json, false).unwrap();
        config.validate().unwrap();

        assert_eq!(config.algorithm, LoadBalancerAlgorithm::IpHash);
        assert_eq!(config.listen.address(), "127.0.0.1:9000");
        assert_eq!(config.health_check.timeout(), Duration::from_millis(100));
    }

    #[test]
    fn test_unknown_protocol_is_rejected() {
        let yaml = r#"
backends:
  - { protocol: udp, host: localhost, port: 8000 }
"#;
        assert!(parse_config(yaml, true).is_err());
    }

    #[test]
    fn test_empty_backend_list_fails_validation() {
        let config = parse_config("backends: []", true).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("at least one backend"));
    }

    #[test]
    fn test_zero_interval_fails_validation() {
        let yaml = r#"
backends:
  - { protocol: tcp, host: localhost, port: 8000 }
health_check: { interval_ms: 0 }
"#;
        let config = parse_config(yaml, true).unwrap();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_missing_file_reports_path() {
        let err = load_config("/nonexistent/lb.yaml").await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/lb.yaml"));
    }
}
