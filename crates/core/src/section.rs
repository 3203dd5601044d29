//! Server-described page layout and the renderer registry.
//!
//! A store's theme is a list of sections per page region. Each section names
//! a template key and carries an opaque JSON `content` payload. Rendering
//! walks the list in order, skips hidden sections, and looks the key up in a
//! fixed registry. Unknown keys and renderer failures become placeholders so
//! one bad section never takes the page down.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// One block of a page layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub template_id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Missing means hidden.
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub content: Value,
}

impl Section {
    /// Human label: the section name, else its template key.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.template_id)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Section>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Section>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Sections grouped by page region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSections {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub header: Vec<Section>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub body: Vec<Section>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub footer: Vec<Section>,
}

/// Envelope of `/store/theme/data/{storeId}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThemeData {
    #[serde(default)]
    pub data: Option<ThemeDataInner>,
}

/// Inner `data` object of [`ThemeData`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThemeDataInner {
    #[serde(default)]
    pub sections: Option<PageSections>,
}

impl ThemeData {
    /// The layout, if the response carried one.
    #[must_use]
    pub fn into_sections(self) -> Option<PageSections> {
        self.data.and_then(|d| d.sections)
    }
}

/// Failure inside a renderer.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The content payload did not match what the template expects.
    #[error("invalid section content: {0}")]
    InvalidContent(#[from] serde_json::Error),

    /// The template engine failed.
    #[error("template error: {0}")]
    Template(String),
}

/// Turns one section's content into markup.
pub trait SectionRenderer: Send + Sync {
    /// Render `content`. Nothing but the section's own payload is available.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the content is malformed or rendering fails.
    fn render(&self, content: &Value) -> Result<String, RenderError>;
}

impl<F> SectionRenderer for F
where
    F: Fn(&Value) -> Result<String, RenderError> + Send + Sync,
{
    fn render(&self, content: &Value) -> Result<String, RenderError> {
        self(content)
    }
}

/// Output for one visible section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedSection {
    /// Rendered markup.
    Rendered {
        /// Stable key for the element (section id or position).
        key: String,
        template_id: String,
        html: String,
    },
    /// Stand-in for a section that could not be rendered.
    Placeholder {
        key: String,
        /// Section name shown to the merchant.
        name: String,
    },
}

impl RenderedSection {
    /// Placeholder text for unrenderable sections.
    #[must_use]
    pub fn placeholder_text(name: &str) -> String {
        format!("Preview not available for: {name}")
    }

    /// Element key.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Rendered { key, .. } | Self::Placeholder { key, .. } => key,
        }
    }
}

/// Fixed mapping from template key to renderer.
#[derive(Default)]
pub struct SectionRegistry {
    renderers: HashMap<&'static str, Box<dyn SectionRenderer>>,
}

impl core::fmt::Debug for SectionRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut keys: Vec<_> = self.renderers.keys().collect();
        keys.sort();
        f.debug_struct("SectionRegistry").field("templates", &keys).finish()
    }
}

impl SectionRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a renderer for `template_id`, replacing any previous one.
    #[must_use]
    pub fn with(mut self, template_id: &'static str, renderer: impl SectionRenderer + 'static) -> Self {
        self.renderers.insert(template_id, Box::new(renderer));
        self
    }

    /// Whether a renderer exists for `template_id`.
    #[must_use]
    pub fn contains(&self, template_id: &str) -> bool {
        self.renderers.contains_key(template_id)
    }

    /// Registered template keys, sorted.
    #[must_use]
    pub fn template_ids(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.renderers.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Render every visible section in order.
    #[must_use]
    pub fn render_all(&self, sections: &[Section]) -> Vec<RenderedSection> {
        sections
            .iter()
            .enumerate()
            .filter(|(_, section)| section.visible)
            .map(|(index, section)| self.render_one(index, section))
            .collect()
    }

    fn render_one(&self, index: usize, section: &Section) -> RenderedSection {
        let key = section
            .id
            .clone()
            .unwrap_or_else(|| format!("section-{index}"));

        let Some(renderer) = self.renderers.get(section.template_id.as_str()) else {
            warn!(template_id = %section.template_id, "no renderer registered for section template");
            return RenderedSection::Placeholder {
                key,
                name: section.display_name().to_owned(),
            };
        };

        match renderer.render(&section.content) {
            Ok(html) => RenderedSection::Rendered {
                key,
                template_id: section.template_id.clone(),
                html,
            },
            Err(e) => {
                warn!(template_id = %section.template_id, error = %e, "section failed to render");
                RenderedSection::Placeholder {
                    key,
                    name: section.display_name().to_owned(),
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;

    fn hero(content: &Value) -> Result<String, RenderError> {
        let title = content["title"].as_str().unwrap_or_default();
        Ok(format!("<h1>{title}</h1>"))
    }

    fn strict(content: &Value) -> Result<String, RenderError> {
        #[derive(Deserialize)]
        struct Needs {
            #[allow(dead_code)]
            message: String,
        }
        let _: Needs = serde_json::from_value(content.clone())?;
        Ok(String::new())
    }

    fn registry() -> SectionRegistry {
        SectionRegistry::new()
            .with("hero-default", hero)
            .with("announce-bar-default", strict)
    }

    fn section(id: &str, template: &str, visible: bool, content: Value) -> Section {
        Section {
            id: Some(id.into()),
            template_id: template.into(),
            name: Some(format!("{template} section")),
            visible,
            content,
        }
    }

    #[test]
    fn test_render_example_layout() {
        let sections = vec![
            section("s1", "hero-default", true, json!({"title": "Hi"})),
            section("s2", "unknown-x", true, json!({})),
            section("s3", "hero-default", false, json!({"title": "Hidden"})),
        ];

        let out = registry().render_all(&sections);

        assert_eq!(out.len(), 2);
        assert_eq!(
            out[0],
            RenderedSection::Rendered {
                key: "s1".into(),
                template_id: "hero-default".into(),
                html: "<h1>Hi</h1>".into()
            }
        );
        assert_eq!(
            out[1],
            RenderedSection::Placeholder {
                key: "s2".into(),
                name: "unknown-x section".into()
            }
        );
    }

    #[test]
    fn test_order_preserved_without_dedup() {
        let sections = vec![
            section("a", "hero-default", true, json!({"title": "1"})),
            section("b", "hero-default", true, json!({"title": "1"})),
        ];
        let keys: Vec<String> = registry()
            .render_all(&sections)
            .iter()
            .map(|s| s.key().to_owned())
            .collect();
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn test_failing_renderer_degrades_to_placeholder() {
        let sections = vec![
            section("a", "announce-bar-default", true, json!({"wrong": 1})),
            section("b", "hero-default", true, json!({"title": "after"})),
        ];
        let out = registry().render_all(&sections);
        assert!(matches!(out[0], RenderedSection::Placeholder { .. }));
        assert!(matches!(out[1], RenderedSection::Rendered { .. }));
    }

    #[test]
    fn test_empty_and_missing_keys() {
        assert!(registry().render_all(&[]).is_empty());

        let mut s = section("", "nope", true, Value::Null);
        s.id = None;
        s.name = None;
        let out = registry().render_all(&[s]);
        assert_eq!(
            out[0],
            RenderedSection::Placeholder {
                key: "section-0".into(),
                name: "nope".into()
            }
        );
    }

    #[test]
    fn test_theme_envelope_decoding() {
        let theme: ThemeData = serde_json::from_value(json!({
            "data": {"sections": {
                "header": [{"id": "h", "templateId": "nav-simple", "visible": true, "content": {}}],
                "body": null
            }}
        }))
        .unwrap();
        let sections = theme.into_sections().unwrap();
        assert_eq!(sections.header.len(), 1);
        assert!(sections.body.is_empty());
        assert!(sections.footer.is_empty());

        let missing: ThemeData = serde_json::from_value(json!({"data": null})).unwrap();
        assert!(missing.into_sections().is_none());
    }

    #[test]
    fn test_missing_visible_flag_means_hidden() {
        let s: Section = serde_json::from_value(json!({"templateId": "hero-default"})).unwrap();
        assert!(!s.visible);
        assert!(registry().render_all(&[s]).is_empty());
    }

    #[test]
    fn test_placeholder_text() {
        assert_eq!(RenderedSection::placeholder_text("Promo"), "Preview not available for: Promo");
    }
}
