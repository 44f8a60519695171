//! Catalogue page generation.
//!
//! Renders `index.html` listing every module in the manifest, with a link
//! that adds the repository to the reader app when a base URL is known.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;
use sourcepack_core::{BuildManifest, RepositoryConfig};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    report::Reporter,
    template::{
        ADD_BUTTON_TEMPLATE, PAGE_TEMPLATE, SOURCE_TEMPLATE, Template, TemplateError, escape_html,
    },
};

/// File name of the catalogue inside the output root.
pub const CATALOGUE_FILE: &str = "index.html";

/// Environment variable holding `owner/repo` on CI.
pub const GITHUB_REPOSITORY_ENV: &str = "GITHUB_REPOSITORY";

/// Base URL recorded when none can be determined.
pub const UNKNOWN_BASE_URL: &str = "undefined";

/// Catalogue generation errors.
#[derive(Debug, Error)]
pub enum CatalogueError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Template error.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
}

/// Result type for catalogue operations.
pub type Result<T> = std::result::Result<T, CatalogueError>;

/// Where the repository base URL came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseUrl {
    /// Set in the repository configuration.
    Configured(String),

    /// Built from the CI `owner/repo` value.
    Inferred(String),

    /// Neither source was available.
    Unknown,
}

impl BaseUrl {
    /// Derive the base URL.
    ///
    /// `owner/Repo` becomes `https://owner.github.io/Repo`, with `/<folder>`
    /// appended when a subfolder is used. Segments after the repository are
    /// ignored. Only the owner is lowercased; page paths are case sensitive.
    #[must_use]
    pub fn derive(configured: Option<&str>, env_repository: Option<&str>, folder: &str) -> Self {
        if let Some(url) = configured {
            return Self::Configured(url.to_string());
        }

        let mut segments = env_repository.unwrap_or_default().split('/');
        let (Some(owner), Some(repo)) = (segments.next(), segments.next()) else {
            return Self::Unknown;
        };
        if owner.is_empty() || repo.is_empty() {
            return Self::Unknown;
        }

        let mut url = format!("https://{}.github.io/{repo}", owner.to_lowercase());
        if !folder.is_empty() {
            url.push('/');
            url.push_str(folder);
        }
        Self::Inferred(url)
    }

    /// URL to publish.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Configured(url) | Self::Inferred(url) => url,
            Self::Unknown => UNKNOWN_BASE_URL,
        }
    }

    /// Whether the add-repository link must be hidden by default.
    #[must_use]
    pub fn hides_add_button(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

/// One listed module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogueSource {
    pub name: String,
    pub tags: Vec<String>,
}

/// Data the catalogue page is rendered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalogue {
    pub repository_name: String,
    pub repository_description: String,
    pub sources: Vec<CatalogueSource>,
    #[serde(rename = "baseURL")]
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_logo: Option<String>,
    #[serde(rename = "noAddToPaperbackButton", skip_serializing_if = "Option::is_none")]
    pub no_add_button: Option<bool>,
}

impl Catalogue {
    /// Build the listing model from repository settings and the manifest.
    #[must_use]
    pub fn build(
        config: &RepositoryConfig,
        manifest: &BuildManifest,
        env_repository: Option<&str>,
        folder: &str,
        reporter: &Reporter,
    ) -> Self {
        let base_url = BaseUrl::derive(config.base_url.as_deref(), env_repository, folder);
        match &base_url {
            BaseUrl::Configured(url) => {
                info!(scope = reporter.scope(), url, "using custom baseURL");
            }
            BaseUrl::Inferred(url) => info!(
                scope = reporter.scope(),
                url,
                "using base URL deduced from {GITHUB_REPOSITORY_ENV}"
            ),
            BaseUrl::Unknown => warn!(
                scope = reporter.scope(),
                "neither {GITHUB_REPOSITORY_ENV} nor baseURL is defined, hiding the add button"
            ),
        }

        let mut no_add_button = base_url.hides_add_button().then_some(true);
        if let Some(explicit) = config.no_add_button {
            info!(scope = reporter.scope(), value = explicit, "using noAddToPaperbackButton");
            no_add_button = Some(explicit);
        }

        if config.repository_logo.is_some() {
            info!(scope = reporter.scope(), "using repositoryLogo");
        }

        Self {
            repository_name: config.repository_name.clone(),
            repository_description: config.description.clone(),
            sources: manifest
                .sources
                .iter()
                .map(|source| CatalogueSource {
                    name: source.name.clone(),
                    tags: source.tags.clone(),
                })
                .collect(),
            base_url: base_url.as_str().to_string(),
            repository_logo: config.repository_logo.clone(),
            no_add_button,
        }
    }

    /// Whether the add-repository link is shown.
    #[must_use]
    pub fn shows_add_button(&self) -> bool {
        !self.no_add_button.unwrap_or(false)
    }
}

/// Renders a [`Catalogue`] to HTML.
#[derive(Debug, Clone)]
pub struct CatalogueRenderer {
    page: Template,
    source: Template,
    add_button: Template,
}

impl CatalogueRenderer {
    /// Parse the built-in page templates.
    pub fn new() -> Result<Self> {
        Ok(Self {
            page: Template::parse("page", PAGE_TEMPLATE)?,
            source: Template::parse("source", SOURCE_TEMPLATE)?,
            add_button: Template::parse("add_button", ADD_BUTTON_TEMPLATE)?,
        })
    }

    /// Render the catalogue page.
    pub fn render(&self, catalogue: &Catalogue) -> Result<String> {
        let mut sources_html = String::new();
        for source in &catalogue.sources {
            let tags_html: String = source
                .tags
                .iter()
                .map(|tag| format!(r#"<span class="tag">{}</span>"#, escape_html(tag)))
                .collect();
            let name = escape_html(&source.name);
            sources_html.push_str(
                &self
                    .source
                    .render(&[("name", name.as_str()), ("tags_html", tags_html.as_str())])?,
            );
            sources_html.push('\n');
        }

        let logo_html = catalogue
            .repository_logo
            .as_deref()
            .map(|logo| format!(r#"<img src="{}" alt="logo">"#, escape_html(logo)));

        let add_button_html = if catalogue.shows_add_button() {
            let display_name = escape_html(&urlencoding::encode(&catalogue.repository_name));
            let url = escape_html(&urlencoding::encode(&catalogue.base_url));
            Some(self.add_button.render(&[
                ("display_name", display_name.as_str()),
                ("url", url.as_str()),
            ])?)
        } else {
            None
        };

        let repository_name = escape_html(&catalogue.repository_name);
        let repository_description = escape_html(&catalogue.repository_description);
        let mut values = vec![
            ("repository_name", repository_name.as_str()),
            ("repository_description", repository_description.as_str()),
            ("sources_html", sources_html.as_str()),
        ];
        if let Some(logo_html) = &logo_html {
            values.push(("logo_html", logo_html.as_str()));
        }
        if let Some(add_button_html) = &add_button_html {
            values.push(("add_button_html", add_button_html.as_str()));
        }

        Ok(self.page.render(&values)?)
    }

    /// Render the catalogue and write it into `output_root`.
    pub fn write(&self, catalogue: &Catalogue, output_root: &Path) -> Result<PathBuf> {
        let html = self.render(catalogue)?;
        let path = output_root.join(CATALOGUE_FILE);
        fs::write(&path, html)?;
        info!(path = %path.display(), sources = catalogue.sources.len(), "wrote catalogue");
        Ok(path)
    }
}
