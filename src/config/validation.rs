use std::net::SocketAddr;

use eyre::Result;
use url::Url;

use crate::config::models::{GatewayConfig, RegistryConfig, RouteConfig};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Gateway configuration validator
pub struct GatewayConfigValidator;

impl GatewayConfigValidator {
    /// Validate the entire gateway configuration
    pub fn validate(config: &GatewayConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        if config.routes.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "routes".to_string(),
            });
        } else {
            for (prefix, route) in &config.routes {
                if let Err(mut route_errors) = Self::validate_single_route(prefix, route) {
                    errors.append(&mut route_errors);
                }
            }
        }

        if let Some(registry) = &config.registry {
            if let Err(mut registry_errors) = validate_registry(registry) {
                errors.append(&mut registry_errors);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: format_multiple_errors(errors),
            })
        }
    }

    /// Validate a single route configuration.
    ///
    /// A descriptor carrying several `host` find/replace rules is accepted:
    /// the rewriter resolves that to "no rewrite" at request time, and
    /// rejecting the config here would change observable behavior.
    fn validate_single_route(prefix: &str, route: &RouteConfig) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if !prefix.starts_with('/') {
            errors.push(ValidationError::InvalidField {
                field: format!("route prefix: {prefix}"),
                message: "Route prefixes must start with '/'".to_string(),
            });
        }

        if route.downstream.is_empty() {
            errors.push(ValidationError::InvalidField {
                field: format!("route '{prefix}' downstream"),
                message: "Routes must have at least one downstream descriptor".to_string(),
            });
        }

        for (i, downstream) in route.downstream.iter().enumerate() {
            if let Err(e) = validate_url(
                &downstream.target,
                &format!("route '{prefix}' downstream {}", i + 1),
            ) {
                errors.push(e);
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Validate service registry settings (shared by the gateway and app configs).
pub fn validate_registry(registry: &RegistryConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = validate_url(&registry.address, "registry address") {
        errors.push(e);
    }

    if registry.service_name.is_empty() {
        errors.push(ValidationError::MissingField {
            field: "registry.service_name".to_string(),
        });
    }

    for (field, value) in [
        ("registry.check_interval", &registry.check_interval),
        ("registry.check_timeout", &registry.check_timeout),
    ] {
        if humantime::parse_duration(value).is_err() {
            errors.push(ValidationError::InvalidField {
                field: field.to_string(),
                message: format!("'{value}' is not a valid duration (e.g. '1s', '100ms')"),
            });
        }
    }

    for path in &registry.check_paths {
        if !path.starts_with('/') {
            errors.push(ValidationError::InvalidField {
                field: "registry.check_paths".to_string(),
                message: format!("check path '{path}' must start with '/'"),
            });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn validate_listen_address(address: &str) -> ValidationResult<()> {
    if address.parse::<SocketAddr>().is_err() {
        return Err(ValidationError::InvalidListenAddress {
            address: address.to_string(),
            reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:3000' or '0.0.0.0:8080')"
                .to_string(),
        });
    }
    Ok(())
}

fn validate_url(value: &str, field: &str) -> ValidationResult<()> {
    match Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(()),
        Ok(url) => Err(ValidationError::InvalidField {
            field: field.to_string(),
            message: format!("unsupported scheme '{}', expected http or https", url.scheme()),
        }),
        Err(e) => Err(ValidationError::InvalidField {
            field: field.to_string(),
            message: format!("'{value}' is not a valid URL: {e}"),
        }),
    }
}

fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::models::{DownstreamRoute, HeaderFindReplace};

    fn valid_config() -> GatewayConfig {
        GatewayConfig::builder()
            .listen_addr("127.0.0.1:8080")
            .route(
                "/svc",
                vec![DownstreamRoute {
                    target: "http://app:80".to_string(),
                    upstream_headers: None,
                }],
            )
            .build()
            .unwrap()
    }

    #[test]
    fn accepts_valid_config() {
        assert!(GatewayConfigValidator::validate(&valid_config()).is_ok());
    }

    #[test]
    fn rejects_bad_listen_addr() {
        let mut config = valid_config();
        config.listen_addr = "not-an-addr".to_string();
        assert!(GatewayConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn rejects_non_http_target() {
        let mut config = valid_config();
        config.routes.get_mut("/svc").unwrap().downstream[0].target =
            "ftp://app:21".to_string();
        assert!(GatewayConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn rejects_empty_downstream_list() {
        let mut config = valid_config();
        config.routes.get_mut("/svc").unwrap().downstream.clear();
        assert!(GatewayConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn duplicate_host_rules_are_not_a_config_error() {
        let mut config = valid_config();
        config.routes.get_mut("/svc").unwrap().downstream[0].upstream_headers = Some(vec![
            HeaderFindReplace {
                key: "host".to_string(),
                replace: "a.internal".to_string(),
            },
            HeaderFindReplace {
                key: "HOST".to_string(),
                replace: "b.internal".to_string(),
            },
        ]);
        assert!(GatewayConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn rejects_bad_registry_duration() {
        let registry = RegistryConfig {
            address: "http://consul01:8500".to_string(),
            service_name: "app".to_string(),
            service_address: None,
            service_port: 80,
            check_host: None,
            check_interval: "soon".to_string(),
            check_timeout: "100ms".to_string(),
            check_paths: vec!["/info/health".to_string()],
        };
        assert!(validate_registry(&registry).is_err());
    }
}
