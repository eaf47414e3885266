//! Tenant site model.

use serde::Serialize;
use shared::slug::sanitize_slug;

/// One storefront hosted as a sub-site of the shared multisite network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant {
    pub slug: String,
    pub title: String,
    pub email: String,
    pub locale: String,
    pub theme: String,
    pub url: String,
}

impl Tenant {
    /// Builds a tenant whose slug is derived from the display name and whose
    /// URL is the slug appended to the network base URL.
    pub fn new(
        title: &str,
        email: &str,
        locale: &str,
        theme: &str,
        base_url: &str,
    ) -> Self {
        let slug = sanitize_slug(title);
        let url = site_url(base_url, &slug);
        Self {
            slug,
            title: title.to_string(),
            email: email.to_string(),
            locale: locale.to_string(),
            theme: theme.to_string(),
            url,
        }
    }

    pub fn descriptor(&self) -> SiteDescriptor {
        SiteDescriptor {
            slug: self.slug.clone(),
            title: self.title.clone(),
            url: self.url.clone(),
        }
    }
}

/// Joins the network base URL and a tenant slug.
pub fn site_url(base_url: &str, slug: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), slug)
}

/// Provisioned site as returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct SiteDescriptor {
    pub slug: String,
    pub title: String,
    pub url: String,
}
