// src/content/mod.rs
// Typed content model for the learning catalog
//
// Each content type keeps its own record shape; ContentItem is the tagged
// union resolved at the lookup boundary so downstream code asks
// display_name()/summary() instead of branching on shape.

use serde::{Deserialize, Serialize};

/// The five catalog content types.
///
/// The model historically emits table-style plurals ("prompts", "modules"),
/// so those are accepted as aliases on input. Output is always singular.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[serde(alias = "modules")]
    Module,
    News,
    #[serde(alias = "tools")]
    Tool,
    #[serde(alias = "prompts")]
    Prompt,
    #[serde(alias = "learning_plans")]
    LearningPlan,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Module => "module",
            ContentType::News => "news",
            ContentType::Tool => "tool",
            ContentType::Prompt => "prompt",
            ContentType::LearningPlan => "learning_plan",
        }
    }
}

/// A recommendation returned by the model: which item, of which type.
///
/// Never persisted - only meaningful as input to resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRef {
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub id: String,
}

/// Lightweight catalog projection sent to the model for selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsRecord {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub prompt_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningPlanRecord {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// A fully resolved catalog record.
///
/// Fetched fresh per request, attached to at most one chat message,
/// never cached across turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Module(ModuleRecord),
    News(NewsRecord),
    Tool(ToolRecord),
    Prompt(PromptRecord),
    LearningPlan(LearningPlanRecord),
}

impl ContentItem {
    pub fn id(&self) -> &str {
        match self {
            ContentItem::Module(r) => &r.id,
            ContentItem::News(r) => &r.id,
            ContentItem::Tool(r) => &r.id,
            ContentItem::Prompt(r) => &r.id,
            ContentItem::LearningPlan(r) => &r.id,
        }
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            ContentItem::Module(_) => ContentType::Module,
            ContentItem::News(_) => ContentType::News,
            ContentItem::Tool(_) => ContentType::Tool,
            ContentItem::Prompt(_) => ContentType::Prompt,
            ContentItem::LearningPlan(_) => ContentType::LearningPlan,
        }
    }

    /// Human-facing name, regardless of which field the record keeps it in.
    pub fn display_name(&self) -> &str {
        match self {
            ContentItem::Module(r) => &r.name,
            ContentItem::News(r) => &r.title,
            ContentItem::Tool(r) => &r.name,
            ContentItem::Prompt(r) => &r.title,
            ContentItem::LearningPlan(r) => &r.name,
        }
    }

    /// Short description for display and prompt serialization.
    pub fn summary(&self) -> &str {
        match self {
            ContentItem::Module(r) => &r.description,
            ContentItem::News(r) => &r.summary,
            ContentItem::Tool(r) => &r.description,
            ContentItem::Prompt(r) => &r.description,
            ContentItem::LearningPlan(r) => &r.description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_accepts_plural_aliases() {
        let t: ContentType = serde_json::from_str("\"prompts\"").unwrap();
        assert_eq!(t, ContentType::Prompt);

        let t: ContentType = serde_json::from_str("\"learning_plans\"").unwrap();
        assert_eq!(t, ContentType::LearningPlan);

        // Singular spellings still work
        let t: ContentType = serde_json::from_str("\"module\"").unwrap();
        assert_eq!(t, ContentType::Module);
    }

    #[test]
    fn test_content_type_emits_singular() {
        assert_eq!(
            serde_json::to_string(&ContentType::Prompt).unwrap(),
            "\"prompt\""
        );
        assert_eq!(
            serde_json::to_string(&ContentType::LearningPlan).unwrap(),
            "\"learning_plan\""
        );
    }

    #[test]
    fn test_content_ref_wire_shape() {
        let r: ContentRef = serde_json::from_str(r#"{"type":"prompts","id":"p1"}"#).unwrap();
        assert_eq!(r.content_type, ContentType::Prompt);
        assert_eq!(r.id, "p1");
    }

    #[test]
    fn test_item_accessors() {
        let item = ContentItem::Prompt(PromptRecord {
            id: "p1".into(),
            title: "Prompt Engineering Basics".into(),
            description: "Core prompting patterns".into(),
            prompt_text: "You are...".into(),
        });
        assert_eq!(item.display_name(), "Prompt Engineering Basics");
        assert_eq!(item.summary(), "Core prompting patterns");
        assert_eq!(item.content_type(), ContentType::Prompt);

        let news = ContentItem::News(NewsRecord {
            id: "n1".into(),
            title: "New model released".into(),
            summary: "Short take".into(),
            source_url: None,
        });
        assert_eq!(news.display_name(), "New model released");
    }

    #[test]
    fn test_item_tagged_serialization() {
        let item = ContentItem::Module(ModuleRecord {
            id: "m1".into(),
            name: "Intro to AI".into(),
            description: "Foundations".into(),
            category: Some("basics".into()),
        });
        let v = serde_json::to_value(&item).unwrap();
        assert_eq!(v["type"], "module");
        assert_eq!(v["name"], "Intro to AI");
    }
}
