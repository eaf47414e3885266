//! Domain models for the shop provisioner.

pub mod shop;
pub mod step;
pub mod tenant;
pub mod translation;

pub use shop::{
    CompanyInfo, ContactInfo, CreateShopRequest, CreateShopResponse, GatewaySettings,
    NetworkAdminCredentials, TenantMode,
};
pub use step::{StepOutcome, StepReport};
pub use tenant::{SiteDescriptor, Tenant};
pub use translation::{
    ExportFormat, TranslationCatalog, TranslationEntry, UploadFormat, UploadResponse,
};
