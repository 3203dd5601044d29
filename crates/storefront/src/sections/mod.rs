//! Askama renderers for the section templates a store theme can use.
//!
//! Each renderer sees only its section's `content`. Sections that need store
//! data (product grid, footer store details, nav cart badge and account menu)
//! render an HTMX placeholder that loads the data from a fragment endpoint.

use askama::Template;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use url::form_urlencoded;

use shopfront_core::section::{RenderError, SectionRegistry};

use crate::filters;

/// Template keys with a registered renderer.
pub mod keys {
    pub const ANNOUNCE_BAR: &str = "announce-bar-default";
    pub const NAV_SIMPLE: &str = "nav-simple";
    pub const HERO: &str = "hero-default";
    pub const PRODUCT_GRID: &str = "product-grid";
    pub const FOOTER: &str = "footer-default";
}

/// Products shown by a grid whose content does not say.
pub const DEFAULT_PRODUCTS_TO_SHOW: u32 = 8;

/// Build the registry. `asset_url` prefixes relative image paths.
#[must_use]
pub fn registry(asset_url: &str) -> SectionRegistry {
    let asset_url = asset_url.trim_end_matches('/').to_owned();

    SectionRegistry::new()
        .with(keys::ANNOUNCE_BAR, announce_bar)
        .with(keys::NAV_SIMPLE, nav_simple)
        .with(keys::HERO, move |content: &Value| hero(content, &asset_url))
        .with(keys::PRODUCT_GRID, product_grid)
        .with(keys::FOOTER, footer)
}

fn render<T: Template>(template: &T) -> Result<String, RenderError> {
    template
        .render()
        .map_err(|e| RenderError::Template(e.to_string()))
}

/// Accept numbers and numeric strings.
fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Join a possibly relative image path onto the asset host.
#[must_use]
pub fn asset_path(asset_url: &str, path: &str) -> String {
    if path.is_empty() || path.starts_with("http://") || path.starts_with("https://") {
        return path.to_owned();
    }
    let base = asset_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

// =============================================================================
// Announcement bar
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnnounceContent {
    message: String,
}

#[derive(Template)]
#[template(path = "sections/announce_bar.html")]
struct AnnounceBarTemplate {
    message: String,
}

fn announce_bar(content: &Value) -> Result<String, RenderError> {
    let content = AnnounceContent::deserialize(content)?;
    render(&AnnounceBarTemplate {
        message: content.message,
    })
}

// =============================================================================
// Navigation
// =============================================================================

/// A link in the navigation bar.
pub struct NavLink {
    pub name: &'static str,
    pub href: &'static str,
}

const NAV_LINKS: [NavLink; 5] = [
    NavLink { name: "Home", href: "/" },
    NavLink { name: "Shop", href: "/shop" },
    NavLink { name: "Blog", href: "/blog" },
    NavLink { name: "Contact", href: "/contact" },
    NavLink { name: "Orders", href: "/orders" },
];

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct NavContent {
    logo_text: String,
}

#[derive(Template)]
#[template(path = "sections/nav_simple.html")]
struct NavSimpleTemplate {
    logo_text: String,
    links: &'static [NavLink],
}

fn nav_simple(content: &Value) -> Result<String, RenderError> {
    let content = NavContent::deserialize(content)?;
    render(&NavSimpleTemplate {
        logo_text: content.logo_text,
        links: &NAV_LINKS,
    })
}

// =============================================================================
// Hero
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct HeroContent {
    background_image: String,
    title: String,
    sub_title: String,
    cta: String,
}

#[derive(Template)]
#[template(path = "sections/hero.html")]
struct HeroTemplate {
    background_image: String,
    title: String,
    sub_title: String,
    cta: String,
}

fn hero(content: &Value, asset_url: &str) -> Result<String, RenderError> {
    let content = HeroContent::deserialize(content)?;
    render(&HeroTemplate {
        background_image: asset_path(asset_url, &content.background_image),
        title: content.title,
        sub_title: content.sub_title,
        cta: content.cta,
    })
}

// =============================================================================
// Product grid
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProductSource {
    #[serde(rename = "type")]
    kind: String,
    value: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProductGridContent {
    title: String,
    show_title: bool,
    #[serde(deserialize_with = "lenient_u32")]
    products_to_show: Option<u32>,
    #[serde(deserialize_with = "lenient_u32")]
    columns: Option<u32>,
    product_source: Option<ProductSource>,
}

/// Query string the grid placeholder sends to the product-grid fragment.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GridQuery {
    /// Comma-separated product ids for a manual grid.
    pub ids: Option<String>,
    pub limit: Option<u32>,
    pub columns: Option<u32>,
}

impl GridQuery {
    /// Manually chosen product ids, if any.
    #[must_use]
    pub fn manual_ids(&self) -> Vec<String> {
        self.ids
            .as_deref()
            .map(|ids| {
                ids.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// How many products to show.
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_PRODUCTS_TO_SHOW)
    }

    /// CSS class for the column count (2, 4 or 6).
    #[must_use]
    pub fn grid_class(&self) -> &'static str {
        match self.columns {
            Some(2) => "grid-cols-2",
            Some(6) => "grid-cols-6",
            _ => "grid-cols-4",
        }
    }
}

#[derive(Template)]
#[template(path = "sections/product_grid.html")]
struct ProductGridTemplate {
    title: String,
    show_title: bool,
    fragment_url: String,
}

fn product_grid(content: &Value) -> Result<String, RenderError> {
    let content = ProductGridContent::deserialize(content)?;

    let mut query = form_urlencoded::Serializer::new(String::new());
    if let Some(source) = content.product_source.as_ref().filter(|s| s.kind == "manual") {
        query.append_pair("ids", &source.value.join(","));
    }
    query.append_pair(
        "limit",
        &content
            .products_to_show
            .unwrap_or(DEFAULT_PRODUCTS_TO_SHOW)
            .to_string(),
    );
    if let Some(columns) = content.columns {
        query.append_pair("columns", &columns.to_string());
    }

    render(&ProductGridTemplate {
        title: content.title,
        show_title: content.show_title,
        fragment_url: format!("/fragments/product-grid?{}", query.finish()),
    })
}

// =============================================================================
// Footer
// =============================================================================

/// A footer link.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FooterLink {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FooterLinks {
    company: Vec<FooterLink>,
    shop: Vec<FooterLink>,
    support: Vec<FooterLink>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SocialLinks {
    facebook: String,
    twitter: String,
    instagram: String,
    youtube: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FooterContent {
    description: String,
    show_contact_info: bool,
    show_social_links: bool,
    footer_links: FooterLinks,
    social_links: SocialLinks,
}

/// A titled column of footer links.
pub struct LinkColumn {
    pub title: &'static str,
    pub links: Vec<FooterLink>,
}

/// A social profile link.
pub struct SocialLink {
    pub name: &'static str,
    pub url: String,
}

#[derive(Template)]
#[template(path = "sections/footer.html")]
struct FooterTemplate {
    description: String,
    show_contact_info: bool,
    columns: Vec<LinkColumn>,
    socials: Vec<SocialLink>,
}

fn footer(content: &Value) -> Result<String, RenderError> {
    let content = FooterContent::deserialize(content)?;

    let columns = [
        ("Company", content.footer_links.company),
        ("Shop", content.footer_links.shop),
        ("Support", content.footer_links.support),
    ]
    .into_iter()
    .filter(|(_, links)| !links.is_empty())
    .map(|(title, links)| LinkColumn { title, links })
    .collect();

    let socials = if content.show_social_links {
        let s = content.social_links;
        [
            ("Facebook", s.facebook),
            ("Twitter", s.twitter),
            ("Instagram", s.instagram),
            ("YouTube", s.youtube),
        ]
        .into_iter()
        .filter(|(_, url)| !url.trim().is_empty())
        .map(|(name, url)| SocialLink { name, url })
        .collect()
    } else {
        Vec::new()
    };

    render(&FooterTemplate {
        description: content.description,
        show_contact_info: content.show_contact_info,
        columns,
        socials,
    })
}
