//! Document metadata extraction
//!
//! Reads OpenGraph, Twitter Card and standard meta tags, falling back to
//! JSON-LD and the page title. The result becomes the attributes of the
//! document root.

use scraper::{Html, Selector};
use serde_json::Value;

/// Metadata found in a page head. Empty fields are left out of the root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub hostname: Option<String>,
    pub description: Option<String>,
    pub sitename: Option<String>,
    pub date: Option<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub language: Option<String>,
}

impl DocumentMetadata {
    /// Attribute pairs in a stable order
    pub fn into_attributes(self) -> Vec<(String, String)> {
        let mut attrs = Vec::new();
        let mut push = |key: &str, value: Option<String>| {
            if let Some(v) = value.filter(|v| !v.is_empty()) {
                attrs.push((key.to_string(), v));
            }
        };

        push("title", self.title);
        push("author", self.author);
        push("url", self.url);
        push("hostname", self.hostname);
        push("description", self.description);
        push("sitename", self.sitename);
        push("date", self.date);
        push("categories", join_list(&self.categories));
        push("tags", join_list(&self.tags));
        push("language", self.language);
        attrs
    }
}

fn join_list(items: &[String]) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        Some(items.join(","))
    }
}

/// Collect metadata from a parsed page
pub fn extract_metadata(document: &Html) -> DocumentMetadata {
    let mut meta = DocumentMetadata::default();

    if let Ok(selector) = Selector::parse("meta") {
        for element in document.select(&selector) {
            let property = element.value().attr("property");
            let name = element.value().attr("name");
            let content = element.value().attr("content").unwrap_or("").trim();

            if content.is_empty() {
                continue;
            }

            if let Some(prop) = property {
                match prop {
                    "og:title" => set_once(&mut meta.title, content),
                    "og:url" => set_once(&mut meta.url, content),
                    "og:description" => set_once(&mut meta.description, content),
                    "og:site_name" => set_once(&mut meta.sitename, content),
                    "og:locale" => set_once(&mut meta.language, content),
                    "article:author" => set_once(&mut meta.author, content),
                    "article:published_time" => set_once(&mut meta.date, content),
                    "article:section" => push_unique(&mut meta.categories, content),
                    "article:tag" => push_unique(&mut meta.tags, content),
                    _ => {}
                }
            }

            if let Some(n) = name {
                match n.to_ascii_lowercase().as_str() {
                    "author" => set_once(&mut meta.author, content),
                    "description" => set_once(&mut meta.description, content),
                    "twitter:title" => set_once(&mut meta.title, content),
                    "twitter:description" => set_once(&mut meta.description, content),
                    "application-name" => set_once(&mut meta.sitename, content),
                    "date" | "dc.date" | "dcterms.date" => set_once(&mut meta.date, content),
                    "keywords" => {
                        for keyword in content.split(',') {
                            push_unique(&mut meta.tags, keyword.trim());
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    apply_jsonld(document, &mut meta);

    if meta.title.is_none() {
        meta.title = first_text(document, "title").or_else(|| first_text(document, "h1"));
    }

    if meta.url.is_none() {
        meta.url = first_attr(document, r#"link[rel="canonical"]"#, "href");
    }

    if let Some(ref url) = meta.url {
        meta.hostname = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(String::from));
    }

    // Document language beats og:locale
    if let Some(lang) = first_attr(document, "html", "lang") {
        meta.language = Some(lang);
    }

    meta
}

/// Fill remaining gaps from JSON-LD article objects
fn apply_jsonld(document: &Html, meta: &mut DocumentMetadata) {
    let selector = match Selector::parse(r#"script[type="application/ld+json"]"#) {
        Ok(s) => s,
        Err(_) => return,
    };

    for element in document.select(&selector) {
        let content = element.inner_html();
        let trimmed = content.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Ok(json) = serde_json::from_str::<Value>(trimmed) {
            for object in jsonld_objects(&json) {
                if let Some(headline) = object.get("headline").and_then(Value::as_str) {
                    set_once(&mut meta.title, headline);
                }
                if let Some(date) = object.get("datePublished").and_then(Value::as_str) {
                    set_once(&mut meta.date, date);
                }
                if let Some(author) = object.get("author").and_then(person_name) {
                    set_once(&mut meta.author, &author);
                }
                if let Some(site) = object
                    .get("publisher")
                    .and_then(|p| p.get("name"))
                    .and_then(Value::as_str)
                {
                    set_once(&mut meta.sitename, site);
                }
            }
        }
    }
}

/// Flatten top-level arrays and `@graph` into a list of objects
fn jsonld_objects(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(arr) => arr.iter().flat_map(jsonld_objects).collect(),
        Value::Object(obj) => match obj.get("@graph") {
            Some(Value::Array(graph)) => graph.iter().filter(|v| v.is_object()).collect(),
            _ => vec![value],
        },
        _ => vec![],
    }
}

/// Author may be a string, a Person object or a list of either
fn person_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(|s| s.trim().to_string()),
        Value::Array(arr) => {
            let names: Vec<String> = arr.iter().filter_map(person_name).collect();
            if names.is_empty() {
                None
            } else {
                Some(names.join("; "))
            }
        }
        _ => None,
    }
}

fn set_once(slot: &mut Option<String>, value: &str) {
    if slot.is_none() && !value.trim().is_empty() {
        *slot = Some(value.trim().to_string());
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let text = document
        .select(&selector)
        .next()?
        .text()
        .collect::<Vec<_>>()
        .join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn first_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .find_map(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
