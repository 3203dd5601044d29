//! Inspect a store's theme layout.
//!
//! Resolves a domain through the commerce backend and lists each section of
//! the layout with whether this build can render it.
//!
//! # Usage
//!
//! ```bash
//! sf-cli sections shop.example.com
//! ```

use std::fmt::Write as _;

use thiserror::Error;

use shopfront_core::section::{PageSections, Section, SectionRegistry};
use shopfront_core::store::normalize_domain;
use shopfront_storefront::backend::{BackendClient, BackendError};
use shopfront_storefront::config::{BackendConfig, ConfigError};
use shopfront_storefront::sections;

/// Section listing failures.
#[derive(Debug, Error)]
pub enum SectionsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Print the layout of the store behind `domain`.
///
/// # Errors
///
/// Returns an error if the backend is not configured or a lookup fails.
pub async fn run(domain: &str) -> Result<(), SectionsError> {
    let _ = dotenvy::dotenv();

    let config = BackendConfig::from_env()?;
    let backend = BackendClient::new(&config)?;
    let registry = sections::registry(&config.asset_url);

    let domain = normalize_domain(domain);
    let store_id = backend.domain_info(&domain).await?;
    let layout = backend.theme_sections(&store_id).await?;

    #[allow(clippy::print_stdout)]
    {
        print!("{}", report(&domain, store_id.as_str(), &layout, &registry));
    }
    Ok(())
}

fn report(domain: &str, store_id: &str, layout: &PageSections, registry: &SectionRegistry) -> String {
    let mut out = format!("{domain} -> store {store_id}\n");
    for (area, sections) in [
        ("header", &layout.header),
        ("body", &layout.body),
        ("footer", &layout.footer),
    ] {
        let _ = writeln!(out, "\n[{area}] {} section(s)", sections.len());
        for section in sections {
            let _ = writeln!(out, "  {}", line(section, registry));
        }
    }
    out
}

fn line(section: &Section, registry: &SectionRegistry) -> String {
    let status = if !section.visible {
        "hidden"
    } else if registry.contains(&section.template_id) {
        "ok"
    } else {
        "no renderer"
    };
    format!("{:<24} {:<28} {status}", section.template_id, section.display_name())
}
