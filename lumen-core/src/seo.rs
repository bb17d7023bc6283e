use serde::{Deserialize, Serialize};

/// Search-engine and social-preview properties for a rendered page.
///
/// Only fields that are set produce a tag in the document head.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoProperties {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub author: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_image: Option<String>,
    pub canonical: Option<String>,
}

impl SeoProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn og_title(mut self, og_title: impl Into<String>) -> Self {
        self.og_title = Some(og_title.into());
        self
    }

    pub fn og_description(mut self, og_description: impl Into<String>) -> Self {
        self.og_description = Some(og_description.into());
        self
    }

    pub fn og_image(mut self, og_image: impl Into<String>) -> Self {
        self.og_image = Some(og_image.into());
        self
    }

    pub fn canonical(mut self, canonical: impl Into<String>) -> Self {
        self.canonical = Some(canonical.into());
        self
    }

    /// Overlay `other` on top of `self`; fields set in `other` win.
    pub fn merge(&mut self, other: SeoProperties) {
        fn overlay(slot: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *slot = value;
            }
        }
        overlay(&mut self.title, other.title);
        overlay(&mut self.description, other.description);
        overlay(&mut self.keywords, other.keywords);
        overlay(&mut self.author, other.author);
        overlay(&mut self.og_title, other.og_title);
        overlay(&mut self.og_description, other.og_description);
        overlay(&mut self.og_image, other.og_image);
        overlay(&mut self.canonical, other.canonical);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_unset_fields() {
        let mut seo = SeoProperties::new().title("Home").keywords("a, b");
        seo.merge(SeoProperties::new().title("About").description("about us"));
        assert_eq!(seo.title.as_deref(), Some("About"));
        assert_eq!(seo.keywords.as_deref(), Some("a, b"));
        assert_eq!(seo.description.as_deref(), Some("about us"));
        assert_eq!(seo.canonical, None);
    }
}
