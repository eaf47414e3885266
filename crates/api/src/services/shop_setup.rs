//! Per-tenant storefront configuration.
//!
//! Every step issues control-plane commands through the [`CommandRunner`]
//! and turns their exit codes into a [`StepReport`]. Nothing here is fatal:
//! a failing command downgrades its step to `soft_failed` and the pipeline
//! moves on. Only runtime transport failures are returned as errors.

use domain::models::{CreateShopRequest, StepOutcome, StepReport, Tenant};
use domain::services::{currency_for_locale, gateway_labels, ExtraGateway, BUILTIN_GATEWAYS};
use runtime::{CommandRunner, ExecOutput, RuntimeError, WpCommand};
use tracing::{info, warn};

use crate::config::ShopConfig;

/// A storefront page the e-commerce plugin needs bound to an option.
struct ShopPage {
    slug: &'static str,
    title: &'static str,
    content: &'static str,
    option: &'static str,
}

const SHOP_PAGES: [ShopPage; 4] = [
    ShopPage {
        slug: "shop",
        title: "Shop",
        content: "",
        option: "woocommerce_shop_page_id",
    },
    ShopPage {
        slug: "cart",
        title: "Cart",
        content: "[woocommerce_cart]",
        option: "woocommerce_cart_page_id",
    },
    ShopPage {
        slug: "checkout",
        title: "Checkout",
        content: "[woocommerce_checkout]",
        option: "woocommerce_checkout_page_id",
    },
    ShopPage {
        slug: "my-account",
        title: "My Account",
        content: "[woocommerce_my_account]",
        option: "woocommerce_myaccount_page_id",
    },
];

/// Parses the last non-empty line of command output as a positive id.
///
/// `--porcelain` prints the id alone, but PHP notices can precede it.
fn parse_id(output: &str) -> Option<u64> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .and_then(|l| l.parse::<u64>().ok())
        .filter(|id| *id > 0)
}

fn outcome_of(output: &ExecOutput, ok: impl Into<String>) -> StepOutcome {
    if output.success() {
        StepOutcome::ok(ok)
    } else {
        StepOutcome::soft(format!("exit {}: {}", output.exit_code, output.trimmed()))
    }
}

/// Drives theme, plugin, page, catalog, locale, payment and shipping setup
/// for one tenant site.
#[derive(Clone)]
pub struct ShopConfigurator {
    runner: CommandRunner,
    shop: ShopConfig,
    admin_user: String,
}

impl ShopConfigurator {
    pub fn new(runner: CommandRunner, shop: ShopConfig, admin_user: impl Into<String>) -> Self {
        Self {
            runner,
            shop,
            admin_user: admin_user.into(),
        }
    }

    /// Runs the full pipeline and returns one report per step, in order.
    pub async fn configure(
        &self,
        tenant: &Tenant,
        request: &CreateShopRequest,
    ) -> Result<Vec<StepReport>, RuntimeError> {
        info!(slug = %tenant.slug, theme = %tenant.theme, locale = %tenant.locale, "Configuring shop");
        let mut steps = Vec::new();

        steps.push(self.install_theme(tenant).await?);
        steps.push(self.install_commerce_plugin(tenant).await?);
        steps.push(self.install_importer(tenant).await?);

        let (pages, shop_page) = self.ensure_pages(tenant).await?;
        steps.push(pages);
        steps.push(self.import_demo(tenant).await?);
        steps.push(self.set_front_page(tenant, shop_page).await?);
        steps.push(self.apply_locale(tenant).await?);
        steps.push(self.apply_currency(tenant).await?);
        steps.push(self.enable_builtin_gateways(tenant, request).await?);
        for id in &request.extra_gateways {
            steps.push(self.install_extra_gateway(tenant, request, id).await?);
        }
        steps.push(self.create_shipping(tenant).await?);

        let soft = steps.iter().filter(|s| !s.outcome.is_ok()).count();
        info!(slug = %tenant.slug, steps = steps.len(), soft_failed = soft, "Shop configured");
        Ok(steps)
    }

    async fn install_theme(&self, tenant: &Tenant) -> Result<StepReport, RuntimeError> {
        let out = self
            .runner
            .wp(&WpCommand::new("theme install")
                .arg(&tenant.theme)
                .flag("activate")
                .url(&tenant.url))
            .await?;
        Ok(StepReport::new(
            "theme",
            outcome_of(&out, format!("{} active", tenant.theme)),
        ))
    }

    async fn install_commerce_plugin(&self, tenant: &Tenant) -> Result<StepReport, RuntimeError> {
        let out = self
            .runner
            .wp(&WpCommand::new("plugin install")
                .arg(&self.shop.woocommerce_zip_url)
                .flag("force")
                .flag("activate")
                .url(&tenant.url))
            .await?;
        Ok(StepReport::new(
            "woocommerce",
            outcome_of(&out, "woocommerce active"),
        ))
    }

    async fn install_importer(&self, tenant: &Tenant) -> Result<StepReport, RuntimeError> {
        let out = self
            .runner
            .wp(&WpCommand::new("plugin install")
                .arg("wordpress-importer")
                .flag("activate")
                .url(&tenant.url))
            .await?;
        Ok(StepReport::new(
            "importer",
            outcome_of(&out, "wordpress-importer active"),
        ))
    }

    /// Lets the plugin install its own pages, then fixes up any binding it
    /// left empty by looking the page up by slug or creating it.
    ///
    /// Returns the shop page id alongside the report.
    async fn ensure_pages(&self, tenant: &Tenant) -> Result<(StepReport, Option<u64>), RuntimeError> {
        self.runner
            .wp(&WpCommand::new("wc tool run")
                .arg("install_pages")
                .user(&self.admin_user)
                .url(&tenant.url))
            .await?;

        let mut shop_page = None;
        let mut missing = Vec::new();
        for page in &SHOP_PAGES {
            let bound = self
                .runner
                .wp(&WpCommand::new("option get").arg(page.option).url(&tenant.url))
                .await?;
            let id = match parse_id(&bound.output).filter(|_| bound.success()) {
                Some(id) => Some(id),
                None => self.bind_page(tenant, page).await?,
            };
            match id {
                Some(id) if page.slug == "shop" => shop_page = Some(id),
                Some(_) => {}
                None => missing.push(page.slug),
            }
        }

        let outcome = if missing.is_empty() {
            StepOutcome::ok("shop, cart, checkout and my-account pages bound")
        } else {
            StepOutcome::soft(format!("pages not bound: {}", missing.join(", ")))
        };
        Ok((StepReport::new("pages", outcome), shop_page))
    }

    async fn bind_page(&self, tenant: &Tenant, page: &ShopPage) -> Result<Option<u64>, RuntimeError> {
        let existing = self
            .runner
            .wp(&WpCommand::new("post list")
                .opt("post_type", "page")
                .opt("name", page.slug)
                .opt("field", "ID")
                .url(&tenant.url))
            .await?;

        let id = match parse_id(&existing.output).filter(|_| existing.success()) {
            Some(id) => Some(id),
            None => {
                let created = self
                    .runner
                    .wp(&WpCommand::new("post create")
                        .opt("post_type", "page")
                        .opt("post_title", page.title)
                        .opt("post_name", page.slug)
                        .opt("post_status", "publish")
                        .opt("post_content", page.content)
                        .flag("porcelain")
                        .url(&tenant.url))
                    .await?;
                parse_id(&created.output).filter(|_| created.success())
            }
        };

        if let Some(id) = id {
            self.runner
                .wp(&WpCommand::new("option update")
                    .arg(page.option)
                    .arg(&id.to_string())
                    .url(&tenant.url))
                .await?;
        } else {
            warn!(slug = %tenant.slug, page = page.slug, "Could not bind shop page");
        }
        Ok(id)
    }

    async fn import_demo(&self, tenant: &Tenant) -> Result<StepReport, RuntimeError> {
        let download = self
            .runner
            .run(&format!(
                "curl -sSL -o {} {}",
                shared::shell::quote(&self.shop.demo_path),
                shared::shell::quote(&self.shop.demo_url)
            ))
            .await?;
        if !download.success() {
            return Ok(StepReport::new("demo", StepOutcome::soft("dummy created")));
        }

        let out = self
            .runner
            .wp(&WpCommand::new("import")
                .arg(&self.shop.demo_path)
                .opt("authors", "create")
                .user(&self.admin_user)
                .url(&tenant.url))
            .await?;

        let outcome = if out.success() && !out.output.to_lowercase().contains("error") {
            StepOutcome::ok("products imported")
        } else {
            StepOutcome::soft("dummy created")
        };
        Ok(StepReport::new("demo", outcome))
    }

    async fn set_front_page(&self, tenant: &Tenant, shop_page: Option<u64>) -> Result<StepReport, RuntimeError> {
        let Some(id) = shop_page else {
            return Ok(StepReport::new("front_page", StepOutcome::soft("shop page missing")));
        };

        let show = self
            .runner
            .wp(&WpCommand::new("option update").arg("show_on_front").arg("page").url(&tenant.url))
            .await?;
        let front = self
            .runner
            .wp(&WpCommand::new("option update")
                .arg("page_on_front")
                .arg(&id.to_string())
                .url(&tenant.url))
            .await?;

        let outcome = if show.success() && front.success() {
            StepOutcome::ok(format!("front page is page {}", id))
        } else {
            StepOutcome::soft("front page options not updated")
        };
        Ok(StepReport::new("front_page", outcome))
    }

    async fn apply_locale(&self, tenant: &Tenant) -> Result<StepReport, RuntimeError> {
        let locale = tenant.locale.as_str();
        let commands = [
            (
                "core language",
                WpCommand::new("language core install").arg(locale).url(&tenant.url),
            ),
            (
                "switch language",
                WpCommand::new("site switch-language").arg(locale).url(&tenant.url),
            ),
            (
                "WPLANG",
                WpCommand::new("option update").arg("WPLANG").arg(locale).url(&tenant.url),
            ),
            (
                "plugin language",
                WpCommand::new("language plugin install")
                    .arg("woocommerce")
                    .arg(locale)
                    .url(&tenant.url),
            ),
            (
                "theme language",
                WpCommand::new("language theme install")
                    .arg(&tenant.theme)
                    .arg(locale)
                    .url(&tenant.url),
            ),
        ];

        let mut failed = Vec::new();
        for (name, command) in &commands {
            if !self.runner.wp(command).await?.success() {
                failed.push(*name);
            }
        }

        let outcome = if failed.is_empty() {
            StepOutcome::ok(format!("Site language set to {}", locale))
        } else {
            StepOutcome::soft(format!("{}: failed {}", locale, failed.join(", ")))
        };
        Ok(StepReport::new("language", outcome))
    }

    async fn apply_currency(&self, tenant: &Tenant) -> Result<StepReport, RuntimeError> {
        let Some(currency) = currency_for_locale(&tenant.locale) else {
            return Ok(StepReport::new(
                "currency",
                StepOutcome::ok(format!("no currency mapped for {}; left unchanged", tenant.locale)),
            ));
        };

        let out = self
            .runner
            .wp(&WpCommand::new("option update")
                .arg("woocommerce_currency")
                .arg(currency)
                .url(&tenant.url))
            .await?;
        Ok(StepReport::new(
            "currency",
            outcome_of(&out, format!("WooCommerce currency set to {}", currency)),
        ))
    }

    async fn enable_builtin_gateways(
        &self,
        tenant: &Tenant,
        request: &CreateShopRequest,
    ) -> Result<StepReport, RuntimeError> {
        let labels = gateway_labels(&tenant.locale);
        let paypal_email = request
            .billing_email()
            .unwrap_or(self.shop.placeholder_email.as_str())
            .to_string();
        let paypal_settings = serde_json::json!({ "email": paypal_email }).to_string();

        let mut failed = Vec::new();
        for id in BUILTIN_GATEWAYS {
            let mut command = WpCommand::new("wc payment_gateway update")
                .arg(id)
                .opt("enabled", "true")
                .opt("title", labels.title(id).unwrap_or(id));
            if id == "paypal" {
                command = command.opt("settings", &paypal_settings);
            }
            let out = self
                .runner
                .wp(&command.user(&self.admin_user).url(&tenant.url))
                .await?;
            if !out.success() {
                failed.push(id);
            }
        }

        let outcome = if failed.is_empty() {
            StepOutcome::ok(format!("{} enabled", BUILTIN_GATEWAYS.join(", ")))
        } else {
            StepOutcome::soft(format!("gateways not enabled: {}", failed.join(", ")))
        };
        Ok(StepReport::new("payment_gateways", outcome))
    }

    async fn install_extra_gateway(
        &self,
        tenant: &Tenant,
        request: &CreateShopRequest,
        id: &str,
    ) -> Result<StepReport, RuntimeError> {
        let step = format!("gateway:{}", id);
        let Some(gateway) = ExtraGateway::lookup(id) else {
            warn!(gateway = %id, "Unknown extra gateway requested");
            return Ok(StepReport::new(step, StepOutcome::soft("unknown gateway")));
        };

        let install = self
            .runner
            .wp(&WpCommand::new("plugin install")
                .arg(gateway.plugin)
                .flag("activate")
                .url(&tenant.url))
            .await?;
        if !install.success() {
            return Ok(StepReport::new(step, outcome_of(&install, "")));
        }

        let settings = gateway
            .settings_option
            .zip(request.gateway_settings.get(gateway.id));
        let Some((option, values)) = settings else {
            return Ok(StepReport::new(
                step,
                StepOutcome::ok(format!("{} active", gateway.plugin)),
            ));
        };

        let json = serde_json::Value::Object(values.clone()).to_string();
        let out = self
            .runner
            .wp(&WpCommand::new("option update")
                .arg(option)
                .arg(&json)
                .opt("format", "json")
                .url(&tenant.url))
            .await?;
        Ok(StepReport::new(
            step,
            outcome_of(&out, format!("{} active and configured", gateway.plugin)),
        ))
    }

    /// Creates the shipping zone and attaches a flat rate to the id the
    /// create call returned.
    async fn create_shipping(&self, tenant: &Tenant) -> Result<StepReport, RuntimeError> {
        let zone = self
            .runner
            .wp(&WpCommand::new("wc shipping_zone create")
                .opt("name", &self.shop.shipping_zone_name)
                .flag("porcelain")
                .user(&self.admin_user)
                .url(&tenant.url))
            .await?;

        let Some(zone_id) = parse_id(&zone.output).filter(|_| zone.success()) else {
            return Ok(StepReport::new(
                "shipping",
                StepOutcome::soft(format!("zone id not returned: {}", zone.trimmed())),
            ));
        };

        let settings = serde_json::json!({ "cost": self.shop.flat_rate_cost }).to_string();
        let method = self
            .runner
            .wp(&WpCommand::new("wc shipping_zone_method create")
                .arg(&zone_id.to_string())
                .opt("method_id", "flat_rate")
                .opt("settings", &settings)
                .user(&self.admin_user)
                .url(&tenant.url))
            .await?;
        Ok(StepReport::new(
            "shipping",
            outcome_of(
                &method,
                format!("zone {} with flat rate {}", zone_id, self.shop.flat_rate_cost),
            ),
        ))
    }
}
