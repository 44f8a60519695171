//! Module descriptors.
//!
//! [`SourceInfo`] is what a compiled module reports about itself through its
//! `describe()` export. [`ModuleDescriptor`] is the registry entry the
//! manifest publishes for it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Audience classification of a module's content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentRating {
    #[default]
    Everyone,
    Mature,
    Adult,
}

impl fmt::Display for ContentRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Everyone => "EVERYONE",
            Self::Mature => "MATURE",
            Self::Adult => "ADULT",
        };
        f.write_str(label)
    }
}

/// Capabilities a module declares, stored as the bit-set the host runtime expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceIntents(u32);

impl SourceIntents {
    pub const MANGA_CHAPTERS: Self = Self(1 << 0);
    pub const MANGA_TRACKING: Self = Self(1 << 1);
    pub const HOMEPAGE_SECTIONS: Self = Self(1 << 2);
    pub const COLLECTION_MANAGEMENT: Self = Self(1 << 3);
    pub const CLOUDFLARE_BYPASS_REQUIRED: Self = Self(1 << 4);
    pub const SETTINGS_UI: Self = Self(1 << 5);
}

impl std::ops::BitOr for SourceIntents {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Metadata a module exposes about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub name: String,
    pub author: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_website: Option<String>,
    #[serde(default)]
    pub content_rating: ContentRating,
    pub version: String,
    pub icon: String,
    #[serde(default)]
    pub source_tags: Vec<String>,
    #[serde(rename = "websiteBaseURL", default)]
    pub website_base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intents: Option<SourceIntents>,
}

/// One module's entry in the registry manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDescriptor {
    /// Directory name of the module; unique within a manifest.
    pub id: String,
    pub name: String,
    pub author: String,
    pub desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub content_rating: ContentRating,
    pub version: String,
    pub icon: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "websiteBaseURL", default)]
    pub website_base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intents: Option<SourceIntents>,
}

impl ModuleDescriptor {
    /// Attach a module identifier to the info the module reported.
    #[must_use]
    pub fn from_info(id: impl Into<String>, info: SourceInfo) -> Self {
        Self {
            id: id.into(),
            name: info.name,
            author: info.author,
            desc: info.description,
            website: info.author_website,
            content_rating: info.content_rating,
            version: info.version,
            icon: info.icon,
            tags: info.source_tags,
            website_base_url: info.website_base_url,
            intents: info.intents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_info() -> SourceInfo {
        SourceInfo {
            name: "Alpha".to_string(),
            author: "someone".to_string(),
            description: "Reads alpha".to_string(),
            author_website: Some("https://github.com/someone".to_string()),
            content_rating: ContentRating::Mature,
            version: "1.2.3".to_string(),
            icon: "icon.png".to_string(),
            source_tags: vec!["x".to_string(), "y".to_string()],
            website_base_url: "https://alpha.example".to_string(),
            intents: Some(SourceIntents::MANGA_CHAPTERS | SourceIntents::SETTINGS_UI),
        }
    }

    #[test]
    fn test_source_info_from_module_json() {
        let json = r#"{
            "name": "Alpha",
            "author": "someone",
            "description": "Reads alpha",
            "contentRating": "ADULT",
            "version": "2.0.0",
            "icon": "icon.png",
            "websiteBaseURL": "https://alpha.example",
            "sourceTags": ["x", "y"],
            "intents": 5
        }"#;

        let info: SourceInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.content_rating, ContentRating::Adult);
        assert_eq!(info.source_tags, vec!["x", "y"]);
        assert!(info.author_website.is_none());

        assert_eq!(
            info.intents,
            Some(SourceIntents::MANGA_CHAPTERS | SourceIntents::HOMEPAGE_SECTIONS)
        );
    }

    #[test]
    fn test_source_info_requires_icon() {
        let json = r#"{"name": "A", "author": "b", "description": "c", "version": "1.0.0"}"#;
        let err = serde_json::from_str::<SourceInfo>(json).unwrap_err();
        assert!(err.to_string().contains("icon"));
    }

    #[test]
    fn test_descriptor_wire_names() {
        let descriptor = ModuleDescriptor::from_info("alpha", sample_info());
        let value = serde_json::to_value(&descriptor).unwrap();

        assert_eq!(value["id"], "alpha");
        assert_eq!(value["desc"], "Reads alpha");
        assert_eq!(value["website"], "https://github.com/someone");
        assert_eq!(value["contentRating"], "MATURE");
        assert_eq!(value["websiteBaseURL"], "https://alpha.example");
        assert_eq!(value["tags"], serde_json::json!(["x", "y"]));
        assert_eq!(value["intents"], 33);
    }

    #[test]
    fn test_descriptor_omits_absent_optionals() {
        let mut info = sample_info();
        info.author_website = None;
        info.intents = None;

        let value = serde_json::to_value(ModuleDescriptor::from_info("alpha", info)).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("website"));
        assert!(!object.contains_key("intents"));
    }

    #[test]
    fn test_content_rating_display() {
        assert_eq!(ContentRating::Everyone.to_string(), "EVERYONE");
        assert_eq!(ContentRating::Adult.to_string(), "ADULT");
    }
}
