//! Translation export and import for tenant sites.
//!
//! Export walks a chain of [`TemplateSource`]s and takes the first one
//! that yields a usable catalog. Import converts an uploaded CSV or JSON
//! document into a PO/MO pair and deploys it into the plugin language
//! directory of the application container.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use domain::models::{ExportFormat, TranslationCatalog, UploadFormat, UploadResponse};
use domain::services::{mo, po, tabular};
use domain::CatalogError;
use runtime::{CommandRunner, RuntimeError, WpCommand};
use shared::shell::quote;

use crate::config::TranslationsConfig;

const REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("No translation template could be obtained from any source")]
    NoTemplate,

    #[error("Unsupported file '{0}': upload a .csv or .json document")]
    UnsupportedExtension(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Which tenant and locale an export is for.
#[derive(Debug, Clone)]
pub struct ExportTarget {
    pub url: String,
    pub lang: Option<String>,
}

/// One link of the export fallback chain.
///
/// `None` means "nothing usable here, try the next source".
#[async_trait]
pub trait TemplateSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, target: &ExportTarget) -> Option<String>;
}

/// The catalog already deployed for the requested locale.
pub struct DeployedCatalog {
    runner: CommandRunner,
    languages_dir: String,
    text_domain: String,
}

#[async_trait]
impl TemplateSource for DeployedCatalog {
    fn name(&self) -> &'static str {
        "deployed"
    }

    async fn fetch(&self, target: &ExportTarget) -> Option<String> {
        let lang = target.lang.as_deref()?;
        let path = catalog_path(&self.languages_dir, &self.text_domain, lang, "po");
        let out = self.runner.run(&format!("cat {}", quote(&path))).await.ok()?;
        out.success().then_some(out.output)
    }
}

/// A fresh template extracted from the plugin sources.
pub struct GeneratedTemplate {
    runner: CommandRunner,
    plugin_dir: String,
    text_domain: String,
}

#[async_trait]
impl TemplateSource for GeneratedTemplate {
    fn name(&self) -> &'static str {
        "generated"
    }

    async fn fetch(&self, target: &ExportTarget) -> Option<String> {
        let pot = format!("/tmp/{}.pot", self.text_domain);
        let generate = self
            .runner
            .wp(&WpCommand::new("i18n make-pot")
                .arg(&self.plugin_dir)
                .arg(&pot)
                .opt("domain", &self.text_domain)
                .url(&target.url))
            .await
            .ok()?;
        if !generate.success() {
            return None;
        }
        let out = self.runner.run(&format!("cat {}", quote(&pot))).await.ok()?;
        out.success().then_some(out.output)
    }
}

/// A known-good template published upstream.
pub struct RemoteTemplate {
    client: reqwest::Client,
    url: String,
}

impl RemoteTemplate {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl TemplateSource for RemoteTemplate {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn fetch(&self, _target: &ExportTarget) -> Option<String> {
        let response = self
            .client
            .get(&self.url)
            .timeout(REMOTE_TIMEOUT)
            .send()
            .await
            .and_then(|r| r.error_for_status());
        match response {
            Ok(r) => r.text().await.ok(),
            Err(e) => {
                warn!(url = %self.url, error = %e, "Remote template fetch failed");
                None
            }
        }
    }
}

/// The template bundled with the service.
pub struct LocalTemplate {
    path: String,
}

impl LocalTemplate {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TemplateSource for LocalTemplate {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn fetch(&self, _target: &ExportTarget) -> Option<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(path = %self.path, error = %e, "Local template unreadable");
                None
            }
        }
    }
}

fn catalog_path(dir: &str, domain: &str, lang: &str, ext: &str) -> String {
    format!("{}/{}-{}.{}", dir.trim_end_matches('/'), domain, lang, ext)
}

/// Exported catalog and the source that produced it.
#[derive(Debug)]
pub struct Export {
    pub catalog: TranslationCatalog,
    pub source: &'static str,
}

impl Export {
    pub fn render(&self, format: ExportFormat) -> Result<String, CatalogError> {
        match format {
            ExportFormat::Csv => Ok(tabular::to_csv(self.catalog.entries())),
            ExportFormat::Json => tabular::to_json(self.catalog.entries()),
        }
    }
}

pub struct TranslationExchange {
    runner: CommandRunner,
    sources: Vec<Box<dyn TemplateSource>>,
    text_domain: String,
    languages_dir: String,
}

impl TranslationExchange {
    /// Builds the standard chain: deployed catalog, generated template,
    /// remote template, bundled file.
    pub fn new(runner: CommandRunner, config: &TranslationsConfig) -> Self {
        let sources: Vec<Box<dyn TemplateSource>> = vec![
            Box::new(DeployedCatalog {
                runner: runner.clone(),
                languages_dir: config.languages_dir.clone(),
                text_domain: config.text_domain.clone(),
            }),
            Box::new(GeneratedTemplate {
                runner: runner.clone(),
                plugin_dir: config.plugin_dir.clone(),
                text_domain: config.text_domain.clone(),
            }),
            Box::new(RemoteTemplate::new(config.remote_template_url.clone())),
            Box::new(LocalTemplate::new(config.fallback_template_path.clone())),
        ];
        Self::with_sources(runner, config, sources)
    }

    pub fn with_sources(
        runner: CommandRunner,
        config: &TranslationsConfig,
        sources: Vec<Box<dyn TemplateSource>>,
    ) -> Self {
        Self {
            runner,
            sources,
            text_domain: config.text_domain.clone(),
            languages_dir: config.languages_dir.clone(),
        }
    }

    /// Returns the first template in the chain that has at least one entry.
    pub async fn export(&self, target: &ExportTarget) -> Result<Export, TranslationError> {
        for source in &self.sources {
            let Some(text) = source.fetch(target).await else {
                debug!(source = source.name(), "Template source yielded nothing");
                continue;
            };
            if !po::is_template(&text) {
                debug!(source = source.name(), "Template source yielded no entries");
                continue;
            }
            match po::parse(&text) {
                Ok(catalog) => {
                    info!(source = source.name(), entries = catalog.len(), "Exporting translations");
                    return Ok(Export {
                        catalog,
                        source: source.name(),
                    });
                }
                Err(e) => warn!(source = source.name(), error = %e, "Template unparseable"),
            }
        }
        Err(TranslationError::NoTemplate)
    }

    /// Replaces the deployed catalog for `lang` with the uploaded document.
    pub async fn import(
        &self,
        url: &str,
        lang: &str,
        filename: &str,
        contents: &[u8],
    ) -> Result<UploadResponse, TranslationError> {
        let format = UploadFormat::from_filename(filename)
            .ok_or_else(|| TranslationError::UnsupportedExtension(filename.to_string()))?;
        let text = std::str::from_utf8(contents).map_err(|_| CatalogError::Encoding)?;
        let catalog = match format {
            UploadFormat::Csv => tabular::from_csv(text)?,
            UploadFormat::Json => tabular::from_json(text)?,
        };

        let po_text = po::render(&catalog, &self.text_domain, lang);
        let mo_bytes = mo::encode(&catalog, &self.text_domain, lang)?;
        let po_name = format!("{}-{}.po", self.text_domain, lang);
        let mo_name = format!("{}-{}.mo", self.text_domain, lang);

        self.runner
            .run(&format!("mkdir -p {}", quote(&self.languages_dir)))
            .await?;
        self.runner
            .copy_files(
                &self.languages_dir,
                &[
                    (po_name.clone(), po_text.into_bytes()),
                    (mo_name.clone(), mo_bytes),
                ],
            )
            .await?;

        let flush = self.runner.wp(&WpCommand::new("cache flush").url(url)).await?;
        if !flush.success() {
            warn!(url = %url, exit_code = flush.exit_code, "Cache flush failed after import");
        }

        info!(url = %url, lang = %lang, entries = catalog.len(), "Translations deployed");
        Ok(UploadResponse {
            status: "success".to_string(),
            entries: catalog.len(),
            lang: lang.to_string(),
            files: vec![po_name, mo_name],
        })
    }
}
