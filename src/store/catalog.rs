// src/store/catalog.rs
// Catalog reads: the published projection sent to the model, and the
// type-dispatched point lookups used during resolution.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::content::{
    ContentItem, ContentRef, ContentSummary, ContentType, LearningPlanRecord, ModuleRecord,
    NewsRecord, PromptRecord, ToolRecord,
};

/// Fetch the full published catalog: five independent queries, one per
/// content type, issued concurrently. No caching, no pagination - the
/// whole projection goes to the model every time.
pub async fn fetch_catalog(pool: &SqlitePool) -> Result<Vec<ContentSummary>> {
    let (modules, news, tools, prompts, plans) = tokio::try_join!(
        fetch_summaries(pool, ContentType::Module),
        fetch_summaries(pool, ContentType::News),
        fetch_summaries(pool, ContentType::Tool),
        fetch_summaries(pool, ContentType::Prompt),
        fetch_summaries(pool, ContentType::LearningPlan),
    )?;

    let mut catalog = modules;
    catalog.extend(news);
    catalog.extend(tools);
    catalog.extend(prompts);
    catalog.extend(plans);
    Ok(catalog)
}

async fn fetch_summaries(
    pool: &SqlitePool,
    content_type: ContentType,
) -> Result<Vec<ContentSummary>> {
    let sql = match content_type {
        ContentType::Module => {
            "SELECT id, name, description FROM modules \
             WHERE status = 'published' AND deleted_at IS NULL"
        }
        ContentType::News => {
            "SELECT id, title, summary FROM news \
             WHERE status = 'published' AND deleted_at IS NULL"
        }
        ContentType::Tool => {
            "SELECT id, name, description FROM tools \
             WHERE status = 'published' AND deleted_at IS NULL"
        }
        ContentType::Prompt => {
            "SELECT id, title, description FROM prompts \
             WHERE status = 'published' AND deleted_at IS NULL"
        }
        ContentType::LearningPlan => {
            "SELECT id, name, description FROM learning_plans \
             WHERE status = 'published' AND deleted_at IS NULL"
        }
    };

    let rows: Vec<(String, String, String)> = sqlx::query_as(sql).fetch_all(pool).await?;

    Ok(rows
        .into_iter()
        .map(|(id, name, description)| ContentSummary {
            id,
            name,
            description,
            content_type,
        })
        .collect())
}

/// Point lookup for one recommended ref. `None` when the row does not
/// exist, is unpublished, or was soft-deleted.
pub async fn fetch_item(pool: &SqlitePool, content_ref: &ContentRef) -> Result<Option<ContentItem>> {
    let id = content_ref.id.as_str();

    let item = match content_ref.content_type {
        ContentType::Module => {
            let row: Option<(String, String, String, Option<String>)> = sqlx::query_as(
                "SELECT id, name, description, category FROM modules \
                 WHERE id = ?1 AND status = 'published' AND deleted_at IS NULL",
            )
            .bind(id)
            .fetch_optional(pool)
            .await?;
            row.map(|(id, name, description, category)| {
                ContentItem::Module(ModuleRecord {
                    id,
                    name,
                    description,
                    category,
                })
            })
        }
        ContentType::News => {
            let row: Option<(String, String, String, Option<String>)> = sqlx::query_as(
                "SELECT id, title, summary, source_url FROM news \
                 WHERE id = ?1 AND status = 'published' AND deleted_at IS NULL",
            )
            .bind(id)
            .fetch_optional(pool)
            .await?;
            row.map(|(id, title, summary, source_url)| {
                ContentItem::News(NewsRecord {
                    id,
                    title,
                    summary,
                    source_url,
                })
            })
        }
        ContentType::Tool => {
            let row: Option<(String, String, String, Option<String>)> = sqlx::query_as(
                "SELECT id, name, description, url FROM tools \
                 WHERE id = ?1 AND status = 'published' AND deleted_at IS NULL",
            )
            .bind(id)
            .fetch_optional(pool)
            .await?;
            row.map(|(id, name, description, url)| {
                ContentItem::Tool(ToolRecord {
                    id,
                    name,
                    description,
                    url,
                })
            })
        }
        ContentType::Prompt => {
            let row: Option<(String, String, String, String)> = sqlx::query_as(
                "SELECT id, title, description, prompt_text FROM prompts \
                 WHERE id = ?1 AND status = 'published' AND deleted_at IS NULL",
            )
            .bind(id)
            .fetch_optional(pool)
            .await?;
            row.map(|(id, title, description, prompt_text)| {
                ContentItem::Prompt(PromptRecord {
                    id,
                    title,
                    description,
                    prompt_text,
                })
            })
        }
        ContentType::LearningPlan => {
            let row: Option<(String, String, String)> = sqlx::query_as(
                "SELECT id, name, description FROM learning_plans \
                 WHERE id = ?1 AND status = 'published' AND deleted_at IS NULL",
            )
            .bind(id)
            .fetch_optional(pool)
            .await?;
            row.map(|(id, name, description)| {
                ContentItem::LearningPlan(LearningPlanRecord {
                    id,
                    name,
                    description,
                })
            })
        }
    };

    Ok(item)
}
