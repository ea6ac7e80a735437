use std::path::Path;

use config::{Config, File, FileFormat};
use eyre::{Context, Result};
use serde::de::DeserializeOwned;

/// Load configuration from a file using the config crate.
/// Supports multiple formats: TOML, YAML, JSON, etc.
pub async fn load_config<C: DeserializeOwned>(config_path: &str) -> Result<C> {
    load_config_sync(config_path)
}

/// Load configuration synchronously.
pub fn load_config_sync<C: DeserializeOwned>(config_path: &str) -> Result<C> {
    let config_path = Path::new(config_path);

    // Determine file format based on extension
    let format = match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("ini") => FileFormat::Ini,
        _ => FileFormat::Toml,
    };

    let settings = Config::builder()
        .add_source(File::new(
            config_path
                .to_str()
                .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", config_path.display()))?,
            format,
        ))
        .build()
        .with_context(|| format!("Failed to build config from {}", config_path.display()))?;

    settings.try_deserialize().with_context(|| {
        format!(
            "Failed to deserialize config from {}",
            config_path.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::config::models::{AppConfig, GatewayConfig};

    #[tokio::test]
    async fn test_load_toml_gateway_config() {
        let toml_content = r#"
listen_addr = "127.0.0.1:3000"

[[routes."/svc".downstream]]
target = "http://app:80"
upstream_headers = [{ key = "Host", replace = "app.internal" }]
"#;

        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(temp_file, "{}", toml_content).unwrap();

        let config: GatewayConfig = load_config(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:3000");
        assert_eq!(config.routes.len(), 1);

        let route = &config.routes["/svc"];
        assert_eq!(route.downstream.len(), 1);
        let rules = route.downstream[0].upstream_headers.as_ref().unwrap();
        assert_eq!(rules[0].key, "Host");
        assert_eq!(rules[0].replace, "app.internal");
    }

    #[tokio::test]
    async fn test_load_yaml_gateway_config() {
        let yaml_content = r#"
listen_addr: "127.0.0.1:3000"
routes:
  "/svc":
    downstream:
      - target: "http://app:80"
"#;

        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        write!(temp_file, "{}", yaml_content).unwrap();

        let config: GatewayConfig = load_config(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:3000");
        assert!(config.routes["/svc"].downstream[0]
            .upstream_headers
            .is_none());
    }

    #[tokio::test]
    async fn test_load_json_app_config() {
        let json_content = r#"
{
  "listen_addr": "0.0.0.0:80",
  "registry": {
    "address": "http://consul01:8500",
    "service_name": "app",
    "service_port": 80
  }
}
"#;

        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        write!(temp_file, "{}", json_content).unwrap();

        let config: AppConfig = load_config(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:80");
        assert_eq!(config.registry.unwrap().service_name, "app");
    }
}
