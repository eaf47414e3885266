//! Infrastructure provisioning.
//!
//! Brings the shared network, database and application containers into
//! existence, prepares the application for multisite, and creates tenant
//! sites on it. Every transition is get-or-create, so calling it again for
//! the same deployment reuses what is already there.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use domain::models::{
    CreateShopRequest, CreateShopResponse, NetworkAdminCredentials, StepOutcome, StepReport, Tenant,
};
use runtime::container::RestartPolicy;
use runtime::probe::ProbeTarget;
use runtime::{
    CommandRunner, ContainerRuntime, ContainerSpec, EnvironmentBootstrapper, ReadinessProber,
    RuntimeError, WpCommand,
};
use shared::credentials::generate_password;

use crate::config::{Config, SlugCollisionPolicy};
use crate::services::shop_setup::ShopConfigurator;

/// Multisite subdirectory rewrite rules.
pub const MULTISITE_HTACCESS: &str = r#"# BEGIN WordPress Multisite
<IfModule mod_rewrite.c>
RewriteEngine On
RewriteBase /
RewriteRule ^index\.php$ - [L]

# add a trailing slash to /wp-admin
RewriteRule ^([_0-9a-zA-Z-]+/)?wp-admin$ $1wp-admin/ [R=301,L]

RewriteCond %{REQUEST_FILENAME} -f [OR]
RewriteCond %{REQUEST_FILENAME} -d
RewriteRule ^ - [L]
RewriteRule ^([_0-9a-zA-Z-]+/)?(wp-(content|admin|includes).*) $2 [L]
RewriteRule ^([_0-9a-zA-Z-]+/)?(.*\.php)$ $2 [L]
RewriteRule . index.php [L]
</IfModule>
# END WordPress Multisite
"#;

const DOCROOT: &str = "/var/www/html";

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Database container '{container}' was not ready within {timeout_secs}s")]
    DatabaseNotReady { container: String, timeout_secs: u64 },

    #[error("A site with slug '{0}' already exists")]
    SlugTaken(String),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Async mutexes keyed by tenant slug.
#[derive(Default)]
struct TenantLocks {
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TenantLocks {
    async fn acquire(&self, slug: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = match self.locks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            // Drop entries nobody is holding or waiting on.
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            locks.entry(slug.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Network admin password and whether this process generated it.
struct AdminPassword {
    value: String,
    generated: bool,
}

/// Returns the configured network admin password, or generates one.
///
/// A generated password is never logged. It is returned once, in the
/// response of the request that installs the network.
fn resolve_admin_password(config: &Config) -> AdminPassword {
    if !config.network_admin.password.is_empty() {
        return AdminPassword {
            value: config.network_admin.password.clone(),
            generated: false,
        };
    }
    warn!(
        user = %config.network_admin.user,
        "No network admin password configured; generated one for this process. \
         It is returned by the request that installs the network. \
         Set SHOP__NETWORK_ADMIN__PASSWORD to pin it"
    );
    AdminPassword {
        value: generate_password(),
        generated: true,
    }
}

/// Shared steps of a provisioning run.
pub struct Infrastructure {
    pub steps: Vec<StepReport>,
    /// The multisite network was installed by this run.
    pub network_installed: bool,
}

pub struct Provisioner {
    runtime: Arc<dyn ContainerRuntime>,
    config: Arc<Config>,
    admin_password: AdminPassword,
    prober: ReadinessProber,
    bootstrapper: EnvironmentBootstrapper,
    configurator: ShopConfigurator,
    shared: Mutex<()>,
    tenants: TenantLocks,
}

impl Provisioner {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: Arc<Config>) -> Self {
        let admin_password = resolve_admin_password(&config);
        let prober = ReadinessProber::new(config.probe_interval(), config.probe_timeout());
        let bootstrapper = EnvironmentBootstrapper::new(
            config.provisioning.wp_cli_url.clone(),
            config.provisioning.php_memory_limit.clone(),
        );
        let runner = CommandRunner::new(runtime.clone(), config.docker.app_container.clone());
        let configurator = ShopConfigurator::new(
            runner,
            config.shop.clone(),
            config.network_admin.user.clone(),
        );

        Self {
            runtime,
            config,
            admin_password,
            prober,
            bootstrapper,
            configurator,
            shared: Mutex::new(()),
            tenants: TenantLocks::default(),
        }
    }

    fn app_runner(&self) -> CommandRunner {
        CommandRunner::new(self.runtime.clone(), self.config.docker.app_container.clone())
    }

    /// Provisions one shop end to end: shared infrastructure, tenant site
    /// and storefront configuration.
    pub async fn provision_shop(
        &self,
        request: &CreateShopRequest,
    ) -> Result<CreateShopResponse, ProvisionError> {
        let theme = request
            .theme
            .clone()
            .unwrap_or_else(|| self.config.shop.default_theme.clone());
        let tenant = Tenant::new(
            &request.site_name,
            request.email_or(&self.config.network_admin.email),
            &request.locale,
            &theme,
            &self.config.docker.public_base_url,
        );
        info!(slug = %tenant.slug, title = %tenant.title, "Provisioning shop");

        let Infrastructure {
            steps: mut infrastructure,
            network_installed,
        } = self.ensure_infrastructure(request).await?;

        let _tenant_guard = self.tenants.acquire(&tenant.slug).await;
        infrastructure.push(self.create_tenant(&tenant).await?);
        let setup = self.configurator.configure(&tenant, request).await?;

        let network_admin = (network_installed && self.admin_password.generated).then(|| {
            NetworkAdminCredentials {
                user: self.config.network_admin.user.clone(),
                password: self.admin_password.value.clone(),
            }
        });

        Ok(CreateShopResponse {
            site: tenant.descriptor(),
            infrastructure,
            setup,
            provisioned_at: Utc::now(),
            network_admin,
        })
    }

    /// Runs the shared steps under the process-wide lock: network,
    /// database, readiness gate, application container, bootstrap,
    /// multisite install and rewrite rules.
    pub async fn ensure_infrastructure(
        &self,
        request: &CreateShopRequest,
    ) -> Result<Infrastructure, ProvisionError> {
        let _shared = self.shared.lock().await;
        let docker = &self.config.docker;
        let mut steps = Vec::new();

        steps.push(self.ensure_network().await?);
        steps.push(self.ensure_database(request.mysql_image.as_deref()).await?);

        let target = ProbeTarget {
            container: docker.db_container.clone(),
            user: self.config.database.user.clone(),
            password: self.config.database.password.clone(),
            database: self.config.database.name.clone(),
        };
        if !self.prober.wait_until_ready(self.runtime.as_ref(), &target).await {
            return Err(ProvisionError::DatabaseNotReady {
                container: docker.db_container.clone(),
                timeout_secs: self.config.provisioning.probe_timeout_secs,
            });
        }
        steps.push(StepReport::new("database_ready", StepOutcome::ok("accepting connections")));

        steps.push(self.ensure_application(request.wp_image.as_deref()).await?);

        let runner = self.app_runner();
        let notes = self.bootstrapper.bootstrap(&runner).await?;
        let bootstrap = if notes.iter().any(|n| n.ends_with("failed")) {
            StepOutcome::soft(notes.join("; "))
        } else {
            StepOutcome::ok(notes.join("; "))
        };
        steps.push(StepReport::new("bootstrap", bootstrap));

        let (multisite, network_installed) = self.ensure_network_core(&runner, request).await?;
        steps.push(multisite);

        runner
            .copy_files(DOCROOT, &[(".htaccess".to_string(), MULTISITE_HTACCESS.as_bytes().to_vec())])
            .await?;
        steps.push(StepReport::new("rewrite", StepOutcome::ok("subsite rewrites enabled")));

        Ok(Infrastructure {
            steps,
            network_installed,
        })
    }

    async fn ensure_network(&self) -> Result<StepReport, ProvisionError> {
        let name = &self.config.docker.network;
        if self.runtime.network_exists(name).await? {
            return Ok(StepReport::new("network", StepOutcome::ok(format!("{} reused", name))));
        }
        info!(network = %name, "Creating shared network");
        self.runtime.create_network(name).await?;
        Ok(StepReport::new("network", StepOutcome::ok(format!("{} created", name))))
    }

    async fn ensure_database(&self, image: Option<&str>) -> Result<StepReport, ProvisionError> {
        let docker = &self.config.docker;
        let db = &self.config.database;
        if self.runtime.container_exists(&docker.db_container).await? {
            return Ok(StepReport::new(
                "database",
                StepOutcome::ok(format!("{} reused", docker.db_container)),
            ));
        }

        let image = image.unwrap_or(docker.db_image.as_str());
        info!(container = %docker.db_container, image = %image, "Creating database container");
        let spec = ContainerSpec::new(docker.db_container.as_str(), image, docker.network.as_str())
            .env("MYSQL_ROOT_PASSWORD", db.root_password.as_str())
            .env("MYSQL_DATABASE", db.name.as_str())
            .env("MYSQL_USER", db.user.as_str())
            .env("MYSQL_PASSWORD", db.password.as_str())
            .restart(RestartPolicy::Always);
        self.runtime.run_container(&spec).await?;

        Ok(StepReport::new(
            "database",
            StepOutcome::ok(format!("{} created from {}", docker.db_container, image)),
        ))
    }

    async fn ensure_application(&self, image: Option<&str>) -> Result<StepReport, ProvisionError> {
        let docker = &self.config.docker;
        let db = &self.config.database;
        if self.runtime.container_exists(&docker.app_container).await? {
            return Ok(StepReport::new(
                "application",
                StepOutcome::ok(format!("{} reused", docker.app_container)),
            ));
        }

        let image = image.unwrap_or(docker.app_image.as_str());
        info!(container = %docker.app_container, image = %image, "Creating application container");
        let spec = ContainerSpec::new(docker.app_container.as_str(), image, docker.network.as_str())
            .env("WORDPRESS_DB_HOST", format!("{}:3306", docker.db_container))
            .env("WORDPRESS_DB_NAME", db.name.as_str())
            .env("WORDPRESS_DB_USER", db.user.as_str())
            .env("WORDPRESS_DB_PASSWORD", db.password.as_str())
            .port("80/tcp", docker.host_port)
            .restart(RestartPolicy::Always);
        self.runtime.run_container(&spec).await?;

        Ok(StepReport::new(
            "application",
            StepOutcome::ok(format!("{} created from {}", docker.app_container, image)),
        ))
    }

    /// Installs the multisite network unless it already is. The flag is
    /// true when this call installed it.
    async fn ensure_network_core(
        &self,
        runner: &CommandRunner,
        request: &CreateShopRequest,
    ) -> Result<(StepReport, bool), ProvisionError> {
        let installed = runner.wp(&WpCommand::new("core is-installed")).await?;
        if installed.success() {
            return Ok((
                StepReport::new("multisite", StepOutcome::ok("network already installed")),
                false,
            ));
        }

        info!(url = %self.config.docker.public_base_url, "Installing multisite network");
        let install = runner
            .wp(&WpCommand::new("core multisite-install")
                .url(&self.config.docker.public_base_url)
                .opt("title", &request.site_name)
                .opt("admin_user", &self.config.network_admin.user)
                .opt_secret("admin_password", &self.admin_password.value)
                .opt("admin_email", request.email_or(&self.config.network_admin.email))
                .flag("skip-email"))
            .await?;

        if install.success() {
            Ok((StepReport::new("multisite", StepOutcome::ok("network installed")), true))
        } else {
            let outcome = StepOutcome::soft(format!("multisite install exited {}", install.exit_code));
            Ok((StepReport::new("multisite", outcome), false))
        }
    }

    /// Creates the tenant site, applying the configured slug-collision
    /// policy first.
    async fn create_tenant(&self, tenant: &Tenant) -> Result<StepReport, ProvisionError> {
        let runner = self.app_runner();
        let policy = self.config.provisioning.slug_collision;

        if policy != SlugCollisionPolicy::Ignore && self.slug_exists(&runner, &tenant.slug).await? {
            match policy {
                SlugCollisionPolicy::Reject => {
                    return Err(ProvisionError::SlugTaken(tenant.slug.clone()));
                }
                _ => {
                    info!(slug = %tenant.slug, "Reusing existing site");
                    return Ok(StepReport::new(
                        "site",
                        StepOutcome::ok(format!("{} reused", tenant.url)),
                    ));
                }
            }
        }

        let out = runner
            .wp(&WpCommand::new("site create")
                .opt("slug", &tenant.slug)
                .opt("title", &tenant.title)
                .opt("email", &tenant.email))
            .await?;
        let outcome = if out.success() {
            StepOutcome::ok(format!("{} created", tenant.url))
        } else {
            StepOutcome::soft(format!("site create exited {}: {}", out.exit_code, out.trimmed()))
        };
        Ok(StepReport::new("site", outcome))
    }

    async fn slug_exists(&self, runner: &CommandRunner, slug: &str) -> Result<bool, ProvisionError> {
        let out = runner
            .wp(&WpCommand::new("site list").opt("field", "path"))
            .await?;
        if !out.success() {
            warn!(slug = %slug, exit_code = out.exit_code, "Could not list sites; assuming slug is free");
            return Ok(false);
        }
        Ok(out.output.lines().any(|path| path.trim().trim_matches('/') == slug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtime::MockContainerRuntime;

    fn provisioner(mock: &MockContainerRuntime, overrides: &[(&str, &str)]) -> Provisioner {
        let config = Config::load_for_test(overrides).unwrap();
        Provisioner::new(Arc::new(mock.clone()), Arc::new(config))
    }

    fn request() -> CreateShopRequest {
        serde_json::from_value(serde_json::json!({"site_name": "Tea House"})).unwrap()
    }

    #[test]
    fn test_generated_admin_password() {
        let config = Config::load_for_test(&[("network_admin.password", "")]).unwrap();
        let password = resolve_admin_password(&config);
        assert!(password.generated);
        assert_eq!(password.value.len(), shared::credentials::GENERATED_PASSWORD_LENGTH);
    }

    #[test]
    fn test_configured_admin_password_is_kept() {
        let config = Config::load_for_test(&[]).unwrap();
        let password = resolve_admin_password(&config);
        assert!(!password.generated);
        assert_eq!(password.value, "test-admin-password");
    }

    #[tokio::test]
    async fn test_infrastructure_created_once() {
        let mock = MockContainerRuntime::new();
        mock.respond("core is-installed", 1, "");
        let provisioner = provisioner(&mock, &[]);

        provisioner.ensure_infrastructure(&request()).await.unwrap();
        provisioner.ensure_infrastructure(&request()).await.unwrap();

        assert_eq!(mock.network_creates(), 1);
        assert_eq!(mock.container_runs(), vec!["shared_db_shop", "shared_wp_shop"]);
    }

    #[tokio::test]
    async fn test_containers_wired_to_database() {
        let mock = MockContainerRuntime::new();
        provisioner(&mock, &[]).ensure_infrastructure(&request()).await.unwrap();

        let app = mock.container("shared_wp_shop").unwrap();
        assert!(app
            .env
            .contains(&("WORDPRESS_DB_HOST".to_string(), "shared_db_shop:3306".to_string())));
        assert_eq!(app.ports, vec![("80/tcp".to_string(), 8080)]);
        assert_eq!(app.restart, RestartPolicy::Always);

        let db = mock.container("shared_db_shop").unwrap();
        assert_eq!(db.image, "mysql:5.7");
    }

    #[tokio::test]
    async fn test_image_overrides() {
        let mock = MockContainerRuntime::new();
        let request: CreateShopRequest = serde_json::from_value(serde_json::json!({
            "site_name": "Tea House",
            "mysql_image": "mysql:8.0",
            "wp_image": "wordpress:6.5-apache"
        }))
        .unwrap();
        provisioner(&mock, &[]).ensure_infrastructure(&request).await.unwrap();
        assert_eq!(mock.container("shared_db_shop").unwrap().image, "mysql:8.0");
        assert_eq!(mock.container("shared_wp_shop").unwrap().image, "wordpress:6.5-apache");
    }

    #[tokio::test]
    async fn test_database_never_ready_stops_before_app() {
        let mock = MockContainerRuntime::new();
        mock.respond_in("shared_db_shop", "mysql", 1, "ERROR 2002");
        let result = provisioner(&mock, &[]).ensure_infrastructure(&request()).await;

        assert!(matches!(result, Err(ProvisionError::DatabaseNotReady { .. })));
        assert_eq!(mock.container_runs(), vec!["shared_db_shop"]);
        assert!(mock.commands_in("shared_wp_shop").is_empty());
    }

    #[tokio::test]
    async fn test_multisite_install_uses_configured_admin() {
        let mock = MockContainerRuntime::new();
        mock.respond("core is-installed", 1, "");
        provisioner(&mock, &[]).ensure_infrastructure(&request()).await.unwrap();

        let install = mock.commands_matching("core multisite-install");
        assert_eq!(install.len(), 1);
        assert!(install[0].contains("--admin_user=admin"));
        assert!(install[0].contains("--admin_password=test-admin-password"));
        assert!(install[0].contains("--skip-email"));
        assert!(!install[0].contains("admin123"));
        assert!(install[0].contains("--admin_email=admin@example.com"));
    }

    #[tokio::test]
    async fn test_request_email_used_for_network_and_site() {
        let mock = MockContainerRuntime::new();
        mock.respond("core is-installed", 1, "");
        let request: CreateShopRequest = serde_json::from_value(serde_json::json!({
            "site_name": "Tea House",
            "email": "owner@tea.test"
        }))
        .unwrap();
        provisioner(&mock, &[]).provision_shop(&request).await.unwrap();

        let install = mock.commands_matching("core multisite-install");
        assert!(install[0].contains("--admin_email=owner@tea.test"));
        assert_eq!(mock.commands_matching("--email=owner@tea.test").len(), 1);
    }

    #[tokio::test]
    async fn test_generated_password_returned_once() {
        let mock = MockContainerRuntime::new();
        mock.respond("core is-installed", 1, "");
        let provisioner = provisioner(&mock, &[("network_admin.password", "")]);

        let first = provisioner.provision_shop(&request()).await.unwrap();
        let credentials = first.network_admin.expect("credentials on install");
        assert_eq!(credentials.user, "admin");
        let install = mock.commands_matching("core multisite-install");
        assert!(install[0].contains(&format!("--admin_password={}", credentials.password)));

        // Installed from now on.
        mock.respond("core is-installed", 0, "");
        let other: CreateShopRequest =
            serde_json::from_value(serde_json::json!({"site_name": "Coffee Bar"})).unwrap();
        let second = provisioner.provision_shop(&other).await.unwrap();
        assert!(second.network_admin.is_none());
    }

    #[tokio::test]
    async fn test_configured_password_not_returned() {
        let mock = MockContainerRuntime::new();
        mock.respond("core is-installed", 1, "");
        let response = provisioner(&mock, &[]).provision_shop(&request()).await.unwrap();
        assert!(response.network_admin.is_none());
    }

    #[tokio::test]
    async fn test_multisite_install_skipped_when_installed() {
        let mock = MockContainerRuntime::new();
        provisioner(&mock, &[]).ensure_infrastructure(&request()).await.unwrap();
        assert!(mock.commands_matching("core multisite-install").is_empty());
    }

    #[tokio::test]
    async fn test_htaccess_injected() {
        let mock = MockContainerRuntime::new();
        provisioner(&mock, &[]).ensure_infrastructure(&request()).await.unwrap();
        let copies = mock.copies();
        assert_eq!(copies.len(), 1);
        assert_eq!(copies[0].dest_dir, "/var/www/html");
        let files = copies[0].files();
        assert_eq!(files[0].0, ".htaccess");
        assert!(String::from_utf8_lossy(&files[0].1).contains("RewriteEngine On"));
    }

    #[tokio::test]
    async fn test_slug_collision_reject() {
        let mock = MockContainerRuntime::new();
        mock.respond("site list", 0, "/\n/tea-house/\n");
        let result = provisioner(&mock, &[]).provision_shop(&request()).await;
        assert!(matches!(result, Err(ProvisionError::SlugTaken(slug)) if slug == "tea-house"));
        assert!(mock.commands_matching("site create").is_empty());
    }

    #[tokio::test]
    async fn test_slug_collision_reuse() {
        let mock = MockContainerRuntime::new();
        mock.respond("site list", 0, "/\n/tea-house/\n");
        let response = provisioner(&mock, &[("provisioning.slug_collision", "reuse")])
            .provision_shop(&request())
            .await
            .unwrap();
        assert!(mock.commands_matching("site create").is_empty());
        assert!(!response.setup.is_empty());
    }

    #[tokio::test]
    async fn test_slug_collision_ignore() {
        let mock = MockContainerRuntime::new();
        mock.respond("site list", 0, "/\n/tea-house/\n");
        provisioner(&mock, &[("provisioning.slug_collision", "ignore")])
            .provision_shop(&request())
            .await
            .unwrap();
        assert!(mock.commands_matching("site list").is_empty());
        assert_eq!(mock.commands_matching("site create --slug=tea-house").len(), 1);
    }

    #[tokio::test]
    async fn test_provision_shop_response() {
        let mock = MockContainerRuntime::new();
        let response = provisioner(&mock, &[]).provision_shop(&request()).await.unwrap();
        assert_eq!(response.site.slug, "tea-house");
        assert_eq!(response.site.url, "http://localhost:8080/tea-house");
        assert!(response.infrastructure.iter().any(|s| s.step == "site"));
        assert!(response.setup.iter().any(|s| s.step == "theme"));
        assert_eq!(mock.commands_matching("theme install woostify").len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_shops_share_infrastructure() {
        let mock = MockContainerRuntime::new();
        mock.track_sites();
        let provisioner = provisioner(&mock, &[]);
        let coffee: CreateShopRequest =
            serde_json::from_value(serde_json::json!({"site_name": "Coffee Bar"})).unwrap();
        let tea = request();

        let (a, b) = tokio::join!(provisioner.provision_shop(&tea), provisioner.provision_shop(&coffee));

        assert_eq!(a.unwrap().site.slug, "tea-house");
        assert_eq!(b.unwrap().site.slug, "coffee-bar");
        assert_eq!(mock.network_creates(), 1);
        assert_eq!(mock.container_runs(), vec!["shared_db_shop", "shared_wp_shop"]);
        assert_eq!(mock.commands_matching("wp site create").len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_same_slug_rejects_one() {
        let mock = MockContainerRuntime::new();
        mock.track_sites();
        let provisioner = provisioner(&mock, &[]);
        let first = request();
        let second: CreateShopRequest =
            serde_json::from_value(serde_json::json!({"site_name": "Tea  House!"})).unwrap();

        let (a, b) = tokio::join!(provisioner.provision_shop(&first), provisioner.provision_shop(&second));

        let (ok, taken): (Vec<_>, Vec<_>) = [a, b].into_iter().partition(|r| r.is_ok());
        assert_eq!(ok.len(), 1);
        assert!(matches!(
            taken.as_slice(),
            [Err(ProvisionError::SlugTaken(slug))] if slug == "tea-house"
        ));
        assert_eq!(mock.commands_matching("wp site create").len(), 1);
        assert_eq!(mock.container_runs(), vec!["shared_db_shop", "shared_wp_shop"]);
    }

    #[tokio::test]
    async fn test_tenant_locks_are_per_slug() {
        let locks = TenantLocks::default();
        let a = locks.acquire("a").await;
        // A different slug is not blocked.
        let b = locks.acquire("b").await;
        drop(a);
        drop(b);
        let _again = locks.acquire("a").await;
    }
}
