use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    pub docker: DockerConfig,
    pub database: DatabaseConfig,
    pub network_admin: NetworkAdminConfig,
    pub provisioning: ProvisioningConfig,
    pub shop: ShopConfig,
    pub translations: TranslationsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Applies to every route except `/create_shop`.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    /// Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DockerConfig {
    #[serde(default = "default_docker_binary")]
    pub binary: String,

    #[serde(default = "default_network")]
    pub network: String,

    #[serde(default = "default_db_container")]
    pub db_container: String,

    #[serde(default = "default_app_container")]
    pub app_container: String,

    #[serde(default = "default_db_image")]
    pub db_image: String,

    #[serde(default = "default_app_image")]
    pub app_image: String,

    #[serde(default = "default_host_port")]
    pub host_port: u16,

    /// Base URL tenant sites are served under.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub root_password: String,

    #[serde(default = "default_db_name")]
    pub name: String,

    #[serde(default = "default_db_user")]
    pub user: String,

    #[serde(default)]
    pub password: String,
}

/// Super-admin account of the multisite network.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkAdminConfig {
    #[serde(default = "default_admin_user")]
    pub user: String,

    /// Empty means a password is generated at startup.
    #[serde(default)]
    pub password: String,

    #[serde(default = "default_admin_email")]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvisioningConfig {
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,

    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    #[serde(default = "default_wp_cli_url")]
    pub wp_cli_url: String,

    #[serde(default = "default_php_memory_limit")]
    pub php_memory_limit: String,

    #[serde(default)]
    pub slug_collision: SlugCollisionPolicy,
}

/// What to do when a derived slug already names a site of the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlugCollisionPolicy {
    /// Refuse with 409.
    #[default]
    Reject,
    /// Skip creation and reconfigure the existing site.
    Reuse,
    /// Issue the create command regardless.
    Ignore,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopConfig {
    #[serde(default = "default_theme")]
    pub default_theme: String,

    #[serde(default = "default_woocommerce_zip_url")]
    pub woocommerce_zip_url: String,

    #[serde(default = "default_demo_url")]
    pub demo_url: String,

    #[serde(default = "default_demo_path")]
    pub demo_path: String,

    #[serde(default = "default_shipping_zone_name")]
    pub shipping_zone_name: String,

    #[serde(default = "default_flat_rate_cost")]
    pub flat_rate_cost: String,

    #[serde(default = "default_placeholder_email")]
    pub placeholder_email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslationsConfig {
    #[serde(default = "default_plugin_dir")]
    pub plugin_dir: String,

    #[serde(default = "default_text_domain")]
    pub text_domain: String,

    #[serde(default = "default_remote_template_url")]
    pub remote_template_url: String,

    #[serde(default = "default_fallback_template_path")]
    pub fallback_template_path: String,

    #[serde(default = "default_languages_dir")]
    pub languages_dir: String,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_request_timeout() -> u64 {
    60
}
fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_docker_binary() -> String {
    "docker".to_string()
}
fn default_network() -> String {
    "shared_net_shop".to_string()
}
fn default_db_container() -> String {
    "shared_db_shop".to_string()
}
fn default_app_container() -> String {
    "shared_wp_shop".to_string()
}
fn default_db_image() -> String {
    "mysql:5.7".to_string()
}
fn default_app_image() -> String {
    "wordpress:6.7-php8.2-apache".to_string()
}
fn default_host_port() -> u16 {
    8080
}
fn default_public_base_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_db_name() -> String {
    "wordpress".to_string()
}
fn default_db_user() -> String {
    "wpuser".to_string()
}
fn default_admin_user() -> String {
    "admin".to_string()
}
fn default_admin_email() -> String {
    "admin@example.com".to_string()
}
fn default_probe_interval() -> u64 {
    3
}
fn default_probe_timeout() -> u64 {
    120
}
fn default_wp_cli_url() -> String {
    runtime::bootstrap::DEFAULT_WP_CLI_URL.to_string()
}
fn default_php_memory_limit() -> String {
    runtime::bootstrap::DEFAULT_MEMORY_LIMIT.to_string()
}
fn default_theme() -> String {
    "woostify".to_string()
}
fn default_woocommerce_zip_url() -> String {
    "https://downloads.wordpress.org/plugin/woocommerce.8.6.1.zip".to_string()
}
fn default_demo_url() -> String {
    "https://raw.githubusercontent.com/woocommerce/woocommerce/trunk/plugins/woocommerce/sample-data/sample_products.xml".to_string()
}
fn default_demo_path() -> String {
    "/var/www/html/demo.xml".to_string()
}
fn default_shipping_zone_name() -> String {
    "Default Zone".to_string()
}
fn default_flat_rate_cost() -> String {
    "60".to_string()
}
fn default_placeholder_email() -> String {
    "payments@example.com".to_string()
}
fn default_plugin_dir() -> String {
    "wp-content/plugins/woocommerce".to_string()
}
fn default_text_domain() -> String {
    "woocommerce".to_string()
}
fn default_remote_template_url() -> String {
    "https://raw.githubusercontent.com/woocommerce/woocommerce/trunk/plugins/woocommerce/i18n/languages/woocommerce.pot".to_string()
}
fn default_fallback_template_path() -> String {
    "assets/woocommerce.pot".to_string()
}
fn default_languages_dir() -> String {
    "/var/www/html/wp-content/languages/plugins".to_string()
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with SHOP__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("SHOP").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Embeds the defaults so tests do not depend on config files.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "127.0.0.1"
            port = 8000

            [logging]
            level = "info"
            format = "json"

            [security]
            cors_origins = []

            [docker]
            public_base_url = "http://localhost:8080"

            [database]
            root_password = "test-root-password"
            password = "test-db-password"

            [network_admin]
            password = "test-admin-password"

            [provisioning]
            probe_interval_secs = 1
            probe_timeout_secs = 1

            [shop]

            [translations]
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.root_password.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "SHOP__DATABASE__ROOT_PASSWORD environment variable must be set".to_string(),
            ));
        }

        if self.database.password.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "SHOP__DATABASE__PASSWORD environment variable must be set".to_string(),
            ));
        }

        if self.provisioning.probe_interval_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "probe_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.provisioning.probe_interval_secs > self.provisioning.probe_timeout_secs {
            return Err(ConfigValidationError::InvalidValue(
                "probe_interval_secs cannot exceed probe_timeout_secs".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.provisioning.probe_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.provisioning.probe_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_load_with_defaults() {
        let config = Config::load_for_test(&[]).expect("Failed to load config");

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.request_timeout_secs, 60);
        assert_eq!(config.docker.network, "shared_net_shop");
        assert_eq!(config.docker.db_container, "shared_db_shop");
        assert_eq!(config.docker.app_container, "shared_wp_shop");
        assert_eq!(config.docker.db_image, "mysql:5.7");
        assert_eq!(config.network_admin.user, "admin");
        assert_eq!(config.shop.default_theme, "woostify");
        assert_eq!(config.translations.text_domain, "woocommerce");
        assert_eq!(config.provisioning.slug_collision, SlugCollisionPolicy::Reject);
        assert_eq!(config.provisioning.php_memory_limit, "512M");
    }

    #[test]
    fn test_config_env_override() {
        let config = Config::load_for_test(&[
            ("server.port", "9000"),
            ("logging.level", "debug"),
            ("provisioning.slug_collision", "reuse"),
        ])
        .expect("Failed to load config");

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.provisioning.slug_collision, SlugCollisionPolicy::Reuse);
    }

    #[test]
    fn test_unknown_slug_policy_is_rejected() {
        let result = Config::load_for_test(&[("provisioning.slug_collision", "suffix")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_validation_missing_db_password() {
        let config =
            Config::load_for_test(&[("database.password", "")]).expect("Failed to load config");
        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("SHOP__DATABASE__PASSWORD"));
    }

    #[test]
    fn test_config_validation_probe_interval() {
        let config = Config::load_for_test(&[
            ("provisioning.probe_interval_secs", "10"),
            ("provisioning.probe_timeout_secs", "5"),
        ])
        .expect("Failed to load config");

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("probe_interval_secs"));
    }

    #[test]
    fn test_valid_test_config_passes_validation() {
        let config = Config::load_for_test(&[]).expect("Failed to load config");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let config = Config::load_for_test(&[("server.host", "127.0.0.1"), ("server.port", "3000")])
            .expect("Failed to load config");

        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:3000");
    }
}
