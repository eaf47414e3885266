//! Shop provisioning request and response models.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::step::StepReport;
use super::tenant::SiteDescriptor;
use shared::validation::{validate_image_reference, validate_locale, validate_package_slug};

/// Per-gateway credential objects keyed by gateway id.
pub type GatewaySettings = BTreeMap<String, serde_json::Map<String, serde_json::Value>>;

/// Tenancy model requested by the caller. Only `multi` is provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantMode {
    Multi,
}

impl std::str::FromStr for TenantMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multi" => Ok(TenantMode::Multi),
            other => Err(format!("Unsupported tenant mode '{}'", other)),
        }
    }
}

/// Company details used for gateway contact information.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct CompanyInfo {
    #[validate(length(max = 200, message = "Company name must be at most 200 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid company email format"))]
    pub email: Option<String>,

    pub phone: Option<String>,

    pub address: Option<String>,
}

/// Contact person for the storefront.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct ContactInfo {
    pub name: Option<String>,

    #[validate(email(message = "Invalid contact email format"))]
    pub email: Option<String>,

    pub phone: Option<String>,
}

/// Request payload for `POST /create_shop`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateShopRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Site name must be between 1 and 100 characters"
    ))]
    pub site_name: String,

    /// Network admin and tenant contact address; the configured network
    /// admin email applies when absent.
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[serde(default = "default_tenant_mode")]
    pub tenant_mode: String,

    /// Theme slug; the configured default applies when absent.
    #[validate(custom(function = "validate_package_slug"))]
    pub theme: Option<String>,

    #[serde(default = "default_locale")]
    #[validate(custom(function = "validate_locale"))]
    pub locale: String,

    #[validate(nested)]
    pub company: Option<CompanyInfo>,

    #[validate(nested)]
    pub contact: Option<ContactInfo>,

    #[serde(default)]
    pub extra_gateways: Vec<String>,

    #[serde(default)]
    pub gateway_settings: GatewaySettings,

    #[validate(custom(function = "validate_image_reference"))]
    pub mysql_image: Option<String>,

    #[validate(custom(function = "validate_image_reference"))]
    pub wp_image: Option<String>,
}

impl CreateShopRequest {
    pub fn tenant_mode(&self) -> Result<TenantMode, String> {
        self.tenant_mode.parse()
    }

    /// The request email, or `fallback` when none was given.
    pub fn email_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.email.as_deref().unwrap_or(fallback)
    }

    /// Email shown to payment processors: company first, then contact.
    pub fn billing_email(&self) -> Option<&str> {
        self.company
            .as_ref()
            .and_then(|c| c.email.as_deref())
            .or_else(|| self.contact.as_ref().and_then(|c| c.email.as_deref()))
    }
}

fn default_tenant_mode() -> String {
    "multi".to_string()
}

fn default_locale() -> String {
    "en_US".to_string()
}

/// Network admin login generated by this process.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkAdminCredentials {
    pub user: String,
    pub password: String,
}

/// Response payload for `POST /create_shop`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateShopResponse {
    pub site: SiteDescriptor,
    pub infrastructure: Vec<StepReport>,
    pub setup: Vec<StepReport>,
    pub provisioned_at: DateTime<Utc>,
    /// Present only on the call that installed the network with a
    /// generated password. It is not logged or returned again.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_admin: Option<NetworkAdminCredentials>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> CreateShopRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let req = parse(json!({ "site_name": "Tea House" }));
        assert!(req.email.is_none());
        assert_eq!(req.email_or("ops@example.com"), "ops@example.com");
        assert_eq!(req.tenant_mode, "multi");
        assert_eq!(req.locale, "en_US");
        assert!(req.theme.is_none());
        assert!(req.extra_gateways.is_empty());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_explicit_email_wins_and_is_validated() {
        let req = parse(json!({ "site_name": "x", "email": "owner@tea.test" }));
        assert_eq!(req.email_or("ops@example.com"), "owner@tea.test");

        let req = parse(json!({ "site_name": "x", "email": "nope" }));
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_tenant_mode_only_multi() {
        let req = parse(json!({ "site_name": "x", "tenant_mode": "single" }));
        assert!(req.tenant_mode().is_err());
        let req = parse(json!({ "site_name": "x" }));
        assert_eq!(req.tenant_mode(), Ok(TenantMode::Multi));
    }

    #[test]
    fn test_invalid_locale_rejected() {
        let req = parse(json!({ "site_name": "x", "locale": "zh-TW" }));
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_invalid_theme_rejected() {
        let req = parse(json!({ "site_name": "x", "theme": "evil; rm -rf /" }));
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_nested_company_email_validated() {
        let req = parse(json!({ "site_name": "x", "company": { "email": "not-an-email" } }));
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_billing_email_prefers_company() {
        let req = parse(json!({
            "site_name": "x",
            "company": { "email": "billing@acme.test" },
            "contact": { "email": "jane@acme.test" }
        }));
        assert_eq!(req.billing_email(), Some("billing@acme.test"));

        let req = parse(json!({ "site_name": "x", "contact": { "email": "jane@acme.test" } }));
        assert_eq!(req.billing_email(), Some("jane@acme.test"));

        let req = parse(json!({ "site_name": "x" }));
        assert_eq!(req.billing_email(), None);
    }

    #[test]
    fn test_gateway_settings_parsed() {
        let req = parse(json!({
            "site_name": "x",
            "extra_gateways": ["stripe"],
            "gateway_settings": { "stripe": { "publishable_key": "pk_test" } }
        }));
        assert_eq!(req.gateway_settings["stripe"]["publishable_key"], "pk_test");
    }
}
