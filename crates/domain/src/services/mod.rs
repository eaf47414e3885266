//! Domain services: locale tables and translation catalog codecs.

pub mod gateways;
pub mod locale;
pub mod mo;
pub mod po;
pub mod tabular;

pub use gateways::{ExtraGateway, BUILTIN_GATEWAYS};
pub use locale::{currency_for_locale, gateway_labels, GatewayLabels};
