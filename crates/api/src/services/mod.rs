//! Provisioning and translation services.

pub mod provisioner;
pub mod shop_setup;
pub mod translations;

pub use provisioner::{ProvisionError, Provisioner};
pub use shop_setup::ShopConfigurator;
pub use translations::{ExportTarget, TemplateSource, TranslationError, TranslationExchange};
