
use crate::{Result, WikiRagError};

/// A parsed wiki page, split into its conventional sections.
///
/// Wiki exports follow a fixed shape: an H1 title, optional disambiguation
/// text, the title repeated as a bare line introducing an infobox-style
/// property block, a prose description, then the remaining body. Immutable
/// once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub disambiguation: String,
    pub properties: String,
    pub description: String,
    pub rest: String,
}

impl Document {
    /// Parse a raw markdown wiki page into its sections.
    ///
    /// The first line must be an H1 heading; anything else is an error.
    /// A page where the title never reappears as a bare line simply ends up
    /// with everything in `disambiguation` and the other sections empty.
    #[inline]
    pub fn parse(text: &str) -> Result<Self> {
        let lines: Vec<&str> = text.trim().lines().collect();

        let Some(first) = lines.first() else {
            return Err(WikiRagError::Document("Document is empty".to_string()));
        };
        let Some(title) = first.strip_prefix("# ") else {
            return Err(WikiRagError::Document(
                "First line must be a level 1 heading".to_string(),
            ));
        };
        let title = title.trim().to_string();
        let marker = title.to_lowercase();

        // Disambiguation: everything until the title reappears as a bare line
        let mut i = 1;
        let mut disambiguation_lines = Vec::new();
        while i < lines.len() && lines[i].trim().to_lowercase() != marker {
            disambiguation_lines.push(lines[i]);
            i += 1;
        }
        let disambiguation = disambiguation_lines.join("\n").trim().to_string();

        // Property block: from past the marker until two consecutive blank lines
        i += 1;
        let mut property_lines = Vec::new();
        let mut blank_count = 0;
        while i < lines.len() {
            if lines[i].trim().is_empty() {
                blank_count += 1;
            } else {
                blank_count = 0;
            }
            property_lines.push(lines[i]);
            i += 1;
            if blank_count >= 2 {
                break;
            }
        }
        let properties = property_lines.join("\n").trim().to_string();

        while i < lines.len() && lines[i].trim().is_empty() {
            i += 1;
        }

        // Description: prose up to the first H2
        let mut description_lines = Vec::new();
        while i < lines.len() {
            if lines[i].starts_with("## ") {
                break;
            }
            description_lines.push(lines[i]);
            i += 1;
        }
        let description = description_lines.join("\n").trim().to_string();

        let rest = lines[i..].join("\n").trim().to_string();

        Ok(Self {
            title,
            disambiguation,
            properties,
            description,
            rest,
        })
    }
}
