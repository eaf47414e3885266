//! Payment gateway catalog.

/// Gateways shipped with the e-commerce plugin, enabled on every shop.
pub const BUILTIN_GATEWAYS: [&str; 3] = ["bacs", "cod", "paypal"];

/// Optional gateway installed from the plugin directory on request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtraGateway {
    /// Identifier callers use in `extra_gateways` and `gateway_settings`.
    pub id: &'static str,
    /// Plugin directory slug.
    pub plugin: &'static str,
    /// Option that stores the gateway settings, when credentials are accepted.
    pub settings_option: Option<&'static str>,
}

const EXTRA_GATEWAYS: &[ExtraGateway] = &[
    ExtraGateway {
        id: "stripe",
        plugin: "woocommerce-gateway-stripe",
        settings_option: Some("woocommerce_stripe_settings"),
    },
    ExtraGateway {
        id: "ecpay",
        plugin: "ecpay-ecommerce-for-woocommerce",
        settings_option: Some("woocommerce_ecpay_settings"),
    },
    ExtraGateway {
        id: "paypal-payments",
        plugin: "woocommerce-paypal-payments",
        settings_option: None,
    },
    ExtraGateway {
        id: "linepay",
        plugin: "woo-linepay",
        settings_option: None,
    },
];

impl ExtraGateway {
    pub fn lookup(id: &str) -> Option<&'static ExtraGateway> {
        EXTRA_GATEWAYS.iter().find(|g| g.id == id)
    }

    pub fn all() -> &'static [ExtraGateway] {
        EXTRA_GATEWAYS
    }
}
