//! Common test utilities for integration tests.
//!
//! The router runs against the in-memory container runtime, so no Docker
//! daemon or network access is needed.

// Not every helper is used by every test binary.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use runtime::{CommandRunner, MockContainerRuntime};
use shop_provisioner_api::app::{create_app, create_app_with_translations};
use shop_provisioner_api::config::{
    Config, DatabaseConfig, DockerConfig, LoggingConfig, NetworkAdminConfig, ProvisioningConfig,
    SecurityConfig, ServerConfig, ShopConfig, SlugCollisionPolicy, TranslationsConfig,
};
use shop_provisioner_api::services::{ExportTarget, TemplateSource, TranslationExchange};

pub const BOUNDARY: &str = "X-SHOP-TEST-BOUNDARY";

/// A small template with two entries.
pub const TEST_POT: &str = r#"msgid ""
msgstr ""
"Content-Type: text/plain; charset=UTF-8\n"

msgid "Add to cart"
msgstr ""

msgctxt "Page title"
msgid "Shop"
msgstr ""
"#;

/// Test configuration. Probing gives up after a single attempt.
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
            request_timeout_secs: 30,
            max_upload_bytes: 1024 * 1024,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            cors_origins: vec![],
        },
        docker: DockerConfig {
            binary: "docker".to_string(),
            network: "shared_net_shop".to_string(),
            db_container: "shared_db_shop".to_string(),
            app_container: "shared_wp_shop".to_string(),
            db_image: "mysql:5.7".to_string(),
            app_image: "wordpress:6.7-php8.2-apache".to_string(),
            host_port: 8080,
            public_base_url: "http://localhost:8080".to_string(),
        },
        database: DatabaseConfig {
            root_password: "test-root-password".to_string(),
            name: "wordpress".to_string(),
            user: "wpuser".to_string(),
            password: "test-db-password".to_string(),
        },
        network_admin: NetworkAdminConfig {
            user: "admin".to_string(),
            password: "test-admin-password".to_string(),
            email: "admin@example.com".to_string(),
        },
        provisioning: ProvisioningConfig {
            probe_interval_secs: 1,
            probe_timeout_secs: 1,
            wp_cli_url: "https://example.invalid/wp-cli.phar".to_string(),
            php_memory_limit: "512M".to_string(),
            slug_collision: SlugCollisionPolicy::Reject,
        },
        shop: ShopConfig {
            default_theme: "woostify".to_string(),
            woocommerce_zip_url: "https://example.invalid/woocommerce.zip".to_string(),
            demo_url: "https://example.invalid/sample_products.xml".to_string(),
            demo_path: "/var/www/html/demo.xml".to_string(),
            shipping_zone_name: "Default Zone".to_string(),
            flat_rate_cost: "60".to_string(),
            placeholder_email: "payments@example.com".to_string(),
        },
        translations: TranslationsConfig {
            plugin_dir: "wp-content/plugins/woocommerce".to_string(),
            text_domain: "woocommerce".to_string(),
            remote_template_url: "https://example.invalid/woocommerce.pot".to_string(),
            fallback_template_path: "/nonexistent/woocommerce.pot".to_string(),
            languages_dir: "/var/www/html/wp-content/languages/plugins".to_string(),
        },
    }
}

/// App with the standard translation source chain.
pub fn create_test_app(config: Config, mock: &MockContainerRuntime) -> Router {
    create_app(config, Arc::new(mock.clone()))
}

/// Template source returning fixed text and recording that it was asked.
pub struct StubSource {
    pub name: &'static str,
    pub text: Option<String>,
    pub calls: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl TemplateSource for StubSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self, _target: &ExportTarget) -> Option<String> {
        self.calls.lock().unwrap().push(self.name);
        self.text.clone()
    }
}

/// App whose export chain is made of stub sources, in order. Returns the
/// log of sources consulted.
pub fn create_test_app_with_sources(
    config: Config,
    mock: &MockContainerRuntime,
    chain: &[(&'static str, Option<&str>)],
) -> (Router, Arc<Mutex<Vec<&'static str>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sources = chain
        .iter()
        .map(|&(name, text)| {
            Box::new(StubSource {
                name,
                text: text.map(str::to_string),
                calls: calls.clone(),
            }) as Box<dyn TemplateSource>
        })
        .collect();
    let runtime = Arc::new(mock.clone());
    let runner = CommandRunner::new(runtime.clone(), config.docker.app_container.clone());
    let exchange = TranslationExchange::with_sources(runner, &config.translations, sources);
    (create_app_with_translations(config, runtime, exchange), calls)
}

/// Build a JSON request.
pub fn json_request(
    method: axum::http::Method,
    uri: &str,
    body: serde_json::Value,
) -> axum::http::Request<axum::body::Body> {
    use axum::{body::Body, http::{header, Request}};

    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Build a GET request.
pub fn get_request(uri: &str) -> axum::http::Request<axum::body::Body> {
    use axum::{body::Body, http::{Method, Request}};

    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Build a multipart upload with an optional `file` part and `lang` field.
pub fn multipart_request(
    uri: &str,
    file: Option<(&str, &str)>,
    lang: Option<&str>,
) -> axum::http::Request<axum::body::Body> {
    use axum::{body::Body, http::{header, Method, Request}};

    let mut body = String::new();
    if let Some(lang) = lang {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"lang\"\r\n\r\n{}\r\n",
            BOUNDARY, lang
        ));
    }
    if let Some((filename, contents)) = file {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n{}\r\n",
            BOUNDARY, filename, contents
        ));
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Helper to parse JSON response body.
pub async fn parse_response_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
}

/// Helper to read a response body as text.
pub async fn response_text(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

/// Find a step report by name in a response array.
pub fn find_step<'a>(steps: &'a serde_json::Value, name: &str) -> &'a serde_json::Value {
    steps
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["step"] == name)
        .unwrap_or_else(|| panic!("step {} missing", name))
}
