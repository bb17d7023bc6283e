//! The fixed HTML around the mount element.
//!
//! Both render strategies wrap their markup in the same [`DocumentShell`],
//! which is what makes a streamed document byte-identical to the buffered
//! one for the same inputs. The shell comes from two askama templates,
//! `document_prefix.html` and `document_suffix.html`, so every value that
//! reaches the head is escaped and the hydration payload goes through the
//! HTML-safe `json` filter.

use askama::Template;
use serde_json::{json, Value};

use crate::error::RenderError;
use crate::render::view::RenderTarget;
use crate::seo::SeoProperties;

/// Static parts of the generated document (`lumen.document.*`, `lumen.hydration.*`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSettings {
    pub lang: String,
    /// Title used when no SEO title is supplied.
    pub default_title: String,
    /// `id` of the mount element.
    pub mount_id: String,
    /// Extra `<head>` markup, emitted verbatim after the viewport declaration.
    pub head: Vec<String>,
    /// Name of the `window` property that carries `{componentName, props}`.
    pub hydration_global: String,
    /// URL of the hydration bootstrap module.
    pub hydration_script: String,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            lang: "en".into(),
            default_title: "Lumen App".into(),
            mount_id: "root".into(),
            head: Vec::new(),
            hydration_global: "__HYDRATION_DATA__".into(),
            hydration_script: "/scripts/hydration".into(),
        }
    }
}

/// One `<meta>` element of the head.
struct MetaTag<'a> {
    attr: &'static str,
    key: &'static str,
    content: &'a str,
}

#[derive(Template)]
#[template(path = "document_prefix.html")]
struct DocumentPrefix<'a> {
    lang: &'a str,
    head: &'a [String],
    title: &'a str,
    meta: Vec<MetaTag<'a>>,
    canonical: Option<&'a str>,
    hydration_global: &'a str,
    payload: Value,
    mount_id: &'a str,
}

#[derive(Template)]
#[template(path = "document_suffix.html")]
struct DocumentSuffix<'a> {
    hydration_script: &'a str,
}

/// Everything before the mount element's content, and everything after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentShell {
    prefix: String,
    suffix: String,
}

impl DocumentShell {
    /// Build the shell for `target`.
    ///
    /// # Errors
    ///
    /// [`RenderError::Serialization`] when the target's props could not be
    /// serialized, [`RenderError::Template`] when a document template fails.
    pub fn compose(
        settings: &DocumentSettings,
        target: &RenderTarget,
        seo: &SeoProperties,
    ) -> Result<Self, RenderError> {
        let payload = json!({
            "componentName": target.display_name(),
            "props": target.props_value()?,
        });

        let prefix = DocumentPrefix {
            lang: &settings.lang,
            head: &settings.head,
            title: seo.title.as_deref().unwrap_or(&settings.default_title),
            meta: meta_tags(seo),
            canonical: seo.canonical.as_deref(),
            hydration_global: &settings.hydration_global,
            payload,
            mount_id: &settings.mount_id,
        }
        .render()
        .map_err(|e| RenderError::Template(e.to_string()))?;

        let suffix = DocumentSuffix {
            hydration_script: &settings.hydration_script,
        }
        .render()
        .map_err(|e| RenderError::Template(e.to_string()))?;

        Ok(Self { prefix, suffix })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// The complete document with `markup` inside the mount element.
    pub fn wrap(&self, markup: &str) -> String {
        let mut out = String::with_capacity(self.prefix.len() + markup.len() + self.suffix.len());
        out.push_str(&self.prefix);
        out.push_str(markup);
        out.push_str(&self.suffix);
        out
    }

    pub fn into_parts(self) -> (String, String) {
        (self.prefix, self.suffix)
    }
}

/// Only supplied fields produce a tag.
fn meta_tags(seo: &SeoProperties) -> Vec<MetaTag<'_>> {
    [
        ("name", "description", &seo.description),
        ("name", "keywords", &seo.keywords),
        ("name", "author", &seo.author),
        ("property", "og:title", &seo.og_title),
        ("property", "og:description", &seo.og_description),
        ("property", "og:image", &seo.og_image),
    ]
    .into_iter()
    .filter_map(|(attr, key, value)| {
        value.as_deref().map(|content| MetaTag { attr, key, content })
    })
    .collect()
}
