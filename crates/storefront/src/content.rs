//! Markdown content for event and workshop pages.
//!
//! Loaded once at startup from `content/events/*.md` and
//! `content/workshops/*.md`. Each file has YAML frontmatter and an optional
//! markdown body; the file stem is the slug.

use std::path::Path;
use std::sync::Arc;

use comrak::{Options, markdown_to_html};
use gray_matter::{Matter, ParsedEntity, engine::YAML};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Frontmatter for an event.
#[derive(Debug, Clone, Deserialize)]
pub struct EventMeta {
    pub name: String,
    /// Registration fee in rupees.
    pub fee: u32,
    pub img_src: String,
    #[serde(default)]
    pub rulebook: Option<String>,
    /// Position in the listing, ascending.
    #[serde(default)]
    pub order: u32,
}

/// Frontmatter for a workshop.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkshopMeta {
    pub name: String,
    pub img_src: String,
    pub register_link: String,
    #[serde(default)]
    pub order: u32,
}

/// A rendered content entry.
#[derive(Debug, Clone)]
pub struct Entry<M> {
    pub slug: String,
    pub meta: M,
    pub body_html: String,
}

pub type Event = Entry<EventMeta>;
pub type Workshop = Entry<WorkshopMeta>;

/// All content, in listing order.
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    events: Arc<Vec<Event>>,
    workshops: Arc<Vec<Workshop>>,
}

impl ContentStore {
    /// Load all content from `content_dir`.
    ///
    /// Missing directories yield empty listings; unparseable files are logged
    /// and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if a content directory exists but cannot be read.
    pub fn load(content_dir: &Path) -> Result<Self, ContentError> {
        let mut events: Vec<Event> = load_dir(&content_dir.join("events"))?;
        events.sort_by(|a, b| a.meta.order.cmp(&b.meta.order).then(a.slug.cmp(&b.slug)));

        let mut workshops: Vec<Workshop> = load_dir(&content_dir.join("workshops"))?;
        workshops.sort_by(|a, b| a.meta.order.cmp(&b.meta.order).then(a.slug.cmp(&b.slug)));

        tracing::info!(
            events = events.len(),
            workshops = workshops.len(),
            "Content loaded"
        );

        Ok(Self {
            events: Arc::new(events),
            workshops: Arc::new(workshops),
        })
    }

    /// Build a store from already parsed entries.
    #[must_use]
    pub fn from_entries(events: Vec<Event>, workshops: Vec<Workshop>) -> Self {
        Self {
            events: Arc::new(events),
            workshops: Arc::new(workshops),
        }
    }

    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    #[must_use]
    pub fn event(&self, slug: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.slug == slug)
    }

    #[must_use]
    pub fn workshops(&self) -> &[Workshop] {
        &self.workshops
    }
}

fn load_dir<M: DeserializeOwned>(dir: &Path) -> Result<Vec<Entry<M>>, ContentError> {
    let mut entries = Vec::new();

    if !dir.exists() {
        tracing::warn!(dir = %dir.display(), "Content directory does not exist");
        return Ok(entries);
    }

    let listing = std::fs::read_dir(dir).map_err(|e| ContentError::Io(e.to_string()))?;

    for item in listing.flatten() {
        let path = item.path();
        if !path.extension().is_some_and(|ext| ext == "md") {
            continue;
        }

        let Some(slug) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        let parsed = std::fs::read_to_string(&path)
            .map_err(|e| ContentError::Io(e.to_string()))
            .and_then(|text| parse_entry(slug, &text));

        match parsed {
            Ok(entry) => entries.push(entry),
            Err(e) => tracing::error!(path = %path.display(), error = %e, "Failed to load content"),
        }
    }

    Ok(entries)
}

/// Parse one markdown document with frontmatter.
///
/// # Errors
///
/// Returns an error if the frontmatter is missing or does not match `M`.
pub fn parse_entry<M: DeserializeOwned>(slug: &str, text: &str) -> Result<Entry<M>, ContentError> {
    let matter = Matter::<YAML>::new();
    let parsed: ParsedEntity<M> = matter
        .parse(text)
        .map_err(|e| ContentError::Parse(format!("Failed to parse frontmatter: {e}")))?;
    let meta = parsed
        .data
        .ok_or_else(|| ContentError::Parse("Missing frontmatter".to_string()))?;

    Ok(Entry {
        slug: slug.to_string(),
        meta,
        body_html: render_markdown(&parsed.content),
    })
}

/// Render markdown to HTML with the GFM extensions event rules use.
fn render_markdown(content: &str) -> String {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    markdown_to_html(content, &options)
}

/// Content loading errors
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ROBOWARS: &str = "---
name: Robowars
fee: 500
img_src: /images/events/robowars.jpg
rulebook: https://example.com/robowars.pdf
order: 2
---
Build a bot. **Break** the others.
";

    #[test]
    fn test_parse_event() {
        let event: Event = parse_entry("robowars", ROBOWARS).unwrap();
        assert_eq!(event.slug, "robowars");
        assert_eq!(event.meta.fee, 500);
        assert_eq!(event.meta.order, 2);
        assert!(event.body_html.contains("<strong>Break</strong>"));
    }

    #[test]
    fn test_missing_frontmatter() {
        let err = parse_entry::<EventMeta>("x", "just text").unwrap_err();
        assert!(matches!(err, ContentError::Parse(_)));
    }

    #[test]
    fn test_store_lookup() {
        let event: Event = parse_entry("robowars", ROBOWARS).unwrap();
        let store = ContentStore::from_entries(vec![event], Vec::new());
        assert!(store.event("robowars").is_some());
        assert!(store.event("hackathon").is_none());
        assert!(store.workshops().is_empty());
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let store = ContentStore::load(Path::new("/nonexistent/celesta-content")).unwrap();
        assert!(store.events().is_empty());
    }
}
