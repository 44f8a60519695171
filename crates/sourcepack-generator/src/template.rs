//! Catalogue page templates.
//!
//! Templates are parsed once into literal text and `{{ name }}` slots. A
//! `{{ name? }}` slot renders empty when no value is given.

use thiserror::Error;

/// Template errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// A `{{` without a matching `}}`.
    #[error("{template}: unclosed slot at byte {offset}")]
    Unclosed { template: &'static str, offset: usize },

    /// A required slot had no value.
    #[error("{template}: no value for `{slot}`")]
    Missing { template: &'static str, slot: String },
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot { name: String, optional: bool },
}

/// A parsed template.
#[derive(Debug, Clone)]
pub struct Template {
    name: &'static str,
    segments: Vec<Segment>,
}

impl Template {
    /// Split `source` into text and slots.
    pub fn parse(name: &'static str, source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Text(rest[..open].to_string()));
            }
            let Some(close) = rest[open..].find("}}") else {
                return Err(TemplateError::Unclosed {
                    template: name,
                    offset: offset + open,
                });
            };
            let slot = rest[open + 2..open + close].trim();
            segments.push(match slot.strip_suffix('?') {
                Some(name) => Segment::Slot {
                    name: name.trim_end().to_string(),
                    optional: true,
                },
                None => Segment::Slot {
                    name: slot.to_string(),
                    optional: false,
                },
            });
            let consumed = open + close + 2;
            rest = &rest[consumed..];
            offset += consumed;
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self { name, segments })
    }

    /// Fill the slots from `values`. Values are inserted verbatim.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot { name, optional } => {
                    match values.iter().find(|(key, _)| *key == name.as_str()) {
                        Some((_, value)) => out.push_str(value),
                        None if *optional => {}
                        None => {
                            return Err(TemplateError::Missing {
                                template: self.name,
                                slot: name.clone(),
                            });
                        }
                    }
                }
            }
        }
        Ok(out)
    }
}

/// Escape text for use in HTML content and attribute values.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Catalogue page.
pub const PAGE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{{ repository_name }}</title>
    <meta name="description" content="{{ repository_description }}">
    <style>
        :root {
            --color-bg: #F8FAFC;
            --color-card: #FFFFFF;
            --color-text: #1E293B;
            --color-muted: #64748B;
            --color-border: #E2E8F0;
            --color-primary: #3B82F6;
        }
        @media (prefers-color-scheme: dark) {
            :root {
                --color-bg: #0F172A;
                --color-card: #1E293B;
                --color-text: #F1F5F9;
                --color-muted: #94A3B8;
                --color-border: #334155;
            }
        }
        body {
            margin: 0;
            font-family: system-ui, -apple-system, sans-serif;
            background: var(--color-bg);
            color: var(--color-text);
        }
        main { max-width: 48rem; margin: 0 auto; padding: 2rem 1rem; }
        header { display: flex; align-items: center; gap: 1rem; }
        header img { width: 4rem; height: 4rem; border-radius: 0.75rem; }
        .description { color: var(--color-muted); }
        .add-repo {
            display: inline-block;
            margin: 1rem 0;
            padding: 0.6rem 1.2rem;
            border-radius: 0.5rem;
            background: var(--color-primary);
            color: #FFFFFF;
            text-decoration: none;
        }
        .sources { list-style: none; padding: 0; }
        .source {
            padding: 0.75rem 1rem;
            margin-bottom: 0.5rem;
            border: 1px solid var(--color-border);
            border-radius: 0.5rem;
            background: var(--color-card);
        }
        .tag {
            display: inline-block;
            margin-left: 0.4rem;
            padding: 0.1rem 0.5rem;
            border-radius: 999px;
            font-size: 0.75rem;
            border: 1px solid var(--color-border);
            color: var(--color-muted);
        }
    </style>
</head>
<body>
    <main>
        <header>
            {{ logo_html? }}
            <h1>{{ repository_name }}</h1>
        </header>
        <p class="description">{{ repository_description }}</p>
        {{ add_button_html? }}
        <h2>Sources</h2>
        <ul class="sources">
            {{ sources_html }}
        </ul>
    </main>
</body>
</html>"##;

/// One entry of the sources list.
pub const SOURCE_TEMPLATE: &str = r#"<li class="source">
    <span class="source-name">{{ name }}</span>{{ tags_html? }}
</li>"#;

/// Link that adds the repository to the reader app.
pub const ADD_BUTTON_TEMPLATE: &str = r#"<a class="add-repo"
    href="paperback://addRepo?displayName={{ display_name }}&amp;url={{ url }}">Add to Paperback</a>"#;
