//! Configuration loading and validation for srvmon-server

use serde::{Deserialize, Serialize};
use srvmon::{AggregationPolicy, Checker, MonitorConfig};
use srvmon_checkers::{
    HttpChecker, PeerHealthChecker, ProbeBuildError, RedisChecker, TcpChecker,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV: &str = "SRVMON_CONFIG";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] ValidationErrors),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceSettings,

    #[serde(default)]
    pub dependencies: Vec<DependencySettings>,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationErrors> {
        self.service.validate()?;
        for dependency in &self.dependencies {
            dependency.validate()?;
        }

        let mut seen = HashSet::new();
        for dependency in &self.dependencies {
            if !seen.insert(dependency.name.as_str()) {
                let mut errors = ValidationErrors::new();
                let mut error = ValidationError::new("duplicate_dependency_name");
                error.add_param("name".into(), &dependency.name);
                errors.add("dependencies", error);
                return Err(errors);
            }
        }
        Ok(())
    }
}

/// Service identity and listeners
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServiceSettings {
    #[validate(length(min = 1))]
    pub version: String,

    #[validate(custom = "validate_listen_address")]
    pub grpc_address: String,

    #[validate(custom = "validate_listen_address")]
    pub http_address: String,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_timeout")]
    pub request_timeout: Duration,

    pub policy: AggregationPolicy,

    /// Delay between the listeners coming up and the service being marked ready
    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_ready_delay")]
    pub ready_delay: Duration,
}

/// One dependency probe
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_target"))]
pub struct DependencySettings {
    #[validate(length(min = 1))]
    pub name: String,

    #[serde(default)]
    pub critical: bool,

    #[serde(default = "default_probe_timeout", with = "humantime_serde")]
    #[validate(custom = "validate_timeout")]
    pub timeout: Duration,

    #[serde(flatten)]
    pub target: Target,
}

/// What a dependency probe talks to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Target {
    Tcp {
        address: String,
    },
    Http {
        url: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        expected_codes: Vec<u16>,
    },
    Redis {
        address: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
    Grpc {
        endpoint: String,
        #[serde(default)]
        service: String,
    },
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
}

/// OpenTelemetry export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub enabled: bool,
    pub service_name: String,
    pub otlp_endpoint: String,
}

// Default implementations

fn default_probe_timeout() -> Duration {
    srvmon_checkers::DEFAULT_TIMEOUT
}

impl Default for ServiceSettings {
    fn default() -> Self {
        let monitor = MonitorConfig::default();
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            grpc_address: monitor.grpc_address,
            http_address: monitor.http_address,
            request_timeout: monitor.request_timeout,
            policy: monitor.policy,
            ready_delay: Duration::ZERO,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: "srvmon-server".to_string(),
            otlp_endpoint: "http://localhost:4317".to_string(),
        }
    }
}

// Custom validators

fn validate_listen_address(address: &str) -> Result<(), ValidationError> {
    let Some((host, port)) = address.rsplit_once(':') else {
        return Err(ValidationError::new("listen_address_missing_port"));
    };
    if port.parse::<u16>().is_err() {
        return Err(ValidationError::new("listen_address_invalid_port"));
    }
    if host.chars().any(char::is_whitespace) {
        return Err(ValidationError::new("listen_address_invalid_host"));
    }
    Ok(())
}

fn validate_timeout(timeout: &Duration) -> Result<(), ValidationError> {
    if *timeout < Duration::from_millis(1) || *timeout > Duration::from_secs(60) {
        return Err(ValidationError::new("timeout_out_of_range"));
    }
    Ok(())
}

fn validate_ready_delay(delay: &Duration) -> Result<(), ValidationError> {
    if *delay > Duration::from_secs(600) {
        return Err(ValidationError::new("ready_delay_out_of_range"));
    }
    Ok(())
}

fn validate_target(dependency: &DependencySettings) -> Result<(), ValidationError> {
    let valid = match &dependency.target {
        Target::Tcp { address } | Target::Redis { address, .. } => {
            validate_listen_address(address).is_ok() && !address.starts_with(':')
        }
        Target::Http { url, .. } => url.starts_with("http://") || url.starts_with("https://"),
        Target::Grpc { endpoint, .. } => {
            endpoint.starts_with("http://") || endpoint.starts_with("https://")
        }
    };

    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("dependency_target_invalid"))
    }
}

// Configuration loading implementation

impl Config {
    /// Load configuration from `$SRVMON_CONFIG` or the default search paths
    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if !path.is_file() {
                return Err(ConfigError::FileNotFound(path));
            }
            return Self::load_from_file(&path);
        }

        match Self::find_config_file() {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/srvmon/srvmon.yaml")];

        if let Some(home_path) = Self::home_config_path() {
            paths.push(home_path);
        }

        paths.push(PathBuf::from("./srvmon.yaml"));

        paths.into_iter().find(|p| p.is_file())
    }

    /// Get home directory config path
    fn home_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/srvmon/srvmon.yaml"))
    }

    /// Monitor settings for the core library
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            version: self.service.version.clone(),
            grpc_address: self.service.grpc_address.clone(),
            http_address: self.service.http_address.clone(),
            request_timeout: self.service.request_timeout,
            policy: self.service.policy,
        }
    }

    /// Build the configured probes, in file order
    pub fn build_checkers(&self) -> Result<Vec<Arc<dyn Checker>>, ProbeBuildError> {
        self.dependencies.iter().map(DependencySettings::build).collect()
    }
}

impl DependencySettings {
    /// Build the probe this entry describes
    pub fn build(&self) -> Result<Arc<dyn Checker>, ProbeBuildError> {
        let name = self.name.as_str();
        let checker: Arc<dyn Checker> = match &self.target {
            Target::Tcp { address } => Arc::new(
                TcpChecker::new(name, address.as_str())
                    .critical(self.critical)
                    .timeout(self.timeout),
            ),
            Target::Http {
                url,
                expected_codes,
            } => Arc::new(
                HttpChecker::new(name, url)?
                    .expected_codes(expected_codes.iter().copied())
                    .critical(self.critical)
                    .timeout(self.timeout),
            ),
            Target::Redis { address, password } => {
                let mut checker = RedisChecker::new(name, address.as_str())
                    .critical(self.critical)
                    .timeout(self.timeout);
                if let Some(password) = password {
                    checker = checker.password(password.as_str());
                }
                Arc::new(checker)
            }
            Target::Grpc { endpoint, service } => Arc::new(
                PeerHealthChecker::new(name, endpoint)?
                    .service(service.as_str())
                    .critical(self.critical)
                    .timeout(self.timeout),
            ),
        };
        Ok(checker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.service.grpc_address, ":50051");
        assert_eq!(config.service.http_address, ":8080");
        assert_eq!(config.service.ready_delay, Duration::ZERO);
        assert_eq!(config.logging.level, "info");
        assert!(!config.telemetry.enabled);
    }

    #[test]
    fn test_valid_yaml_parsing() {
        let yaml = r#"
service:
  version: "2.3.1"
  grpc_address: "127.0.0.1:50051"
  http_address: ":8081"
  request_timeout: 2s
  policy: classify
  ready_delay: 500ms

dependencies:
  - name: redis
    type: redis
    address: "redis:6379"
    password: secret
    critical: true
    timeout: 250ms
  - name: billing
    type: http
    url: "http://billing:8080/healthz"
    expected_codes: [200, 204]
  - name: orders
    type: grpc
    endpoint: "http://orders:50051"
    service: orders.v1.Orders
  - name: search
    type: tcp
    address: "search:9200"

logging:
  level: debug
  format: json

telemetry:
  enabled: true
  otlp_endpoint: "http://collector:4317"
"#;

        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.service.version, "2.3.1");
        assert_eq!(config.service.request_timeout, Duration::from_secs(2));
        assert_eq!(config.service.policy, AggregationPolicy::Classify);
        assert_eq!(config.service.ready_delay, Duration::from_millis(500));

        assert_eq!(config.dependencies.len(), 4);
        let redis = &config.dependencies[0];
        assert!(redis.critical);
        assert_eq!(redis.timeout, Duration::from_millis(250));
        assert_eq!(
            redis.target,
            Target::Redis {
                address: "redis:6379".to_string(),
                password: Some("secret".to_string()),
            }
        );
        assert_eq!(
            config.dependencies[1].target,
            Target::Http {
                url: "http://billing:8080/healthz".to_string(),
                expected_codes: vec![200, 204],
            }
        );
        assert!(!config.dependencies[1].critical);
        assert_eq!(config.dependencies[1].timeout, srvmon_checkers::DEFAULT_TIMEOUT);

        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.telemetry.enabled);
        assert_eq!(config.telemetry.service_name, "srvmon-server");
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let yaml = r#"
service:
  version: "1.0.0"
"#;

        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.service.request_timeout, Duration::from_secs(5));
        assert_eq!(config.service.policy, AggregationPolicy::FirstDown);
        assert!(config.dependencies.is_empty());
    }

    #[test]
    fn test_duplicate_dependency_names() {
        let yaml = r#"
dependencies:
  - name: redis
    type: tcp
    address: "redis:6379"
  - name: redis
    type: tcp
    address: "redis-replica:6379"
"#;

        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_empty_dependency_name() {
        let yaml = r#"
dependencies:
  - name: ""
    type: tcp
    address: "redis:6379"
"#;

        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_invalid_timeouts() {
        let yaml = r#"
dependencies:
  - name: redis
    type: tcp
    address: "redis:6379"
    timeout: 2m  # Invalid: > 60s
"#;
        assert!(Config::from_yaml(yaml).is_err());

        let yaml = r#"
service:
  request_timeout: 0s  # Invalid: < 1ms
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_unknown_dependency_type() {
        let yaml = r#"
dependencies:
  - name: mongo
    type: mongodb
    address: "mongo:27017"
"#;

        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_listen_address_validation() {
        // Valid addresses
        assert!(validate_listen_address(":8080").is_ok());
        assert!(validate_listen_address("0.0.0.0:50051").is_ok());
        assert!(validate_listen_address("localhost:8080").is_ok());
        assert!(validate_listen_address("[::1]:8080").is_ok());

        // Invalid addresses
        assert!(validate_listen_address("8080").is_err());
        assert!(validate_listen_address(":http").is_err());
        assert!(validate_listen_address("local host:80").is_err());
        assert!(validate_listen_address(":70000").is_err());
    }

    #[test]
    fn test_invalid_targets() {
        let yaml = r#"
dependencies:
  - name: billing
    type: http
    url: "billing:8080/healthz"
"#;
        assert!(Config::from_yaml(yaml).is_err());

        let yaml = r#"
dependencies:
  - name: redis
    type: redis
    address: ":6379"
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_monitor_config_conversion() {
        let config = Config::default();
        let monitor = config.monitor_config();

        assert_eq!(monitor.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(monitor.grpc_address, ":50051");
        assert_eq!(monitor.http_address, ":8080");
        assert_eq!(monitor.request_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_build_checkers_keeps_order() {
        let yaml = r#"
dependencies:
  - name: redis
    type: redis
    address: "127.0.0.1:6379"
    critical: true
  - name: billing
    type: http
    url: "http://127.0.0.1:8080/healthz"
  - name: orders
    type: grpc
    endpoint: "http://127.0.0.1:50051"
"#;

        let config = Config::from_yaml(yaml).unwrap();
        let checkers = config.build_checkers().unwrap();
        assert_eq!(checkers.len(), 3);

        let ctx = srvmon::CheckContext::new();
        assert!(checkers[0].is_critical(&ctx));
        assert!(!checkers[1].is_critical(&ctx));
        assert!(!checkers[2].is_critical(&ctx));
    }
}
