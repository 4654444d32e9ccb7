//! Pulls text, references and organic results out of a search response.
//!
//! The response shape is not guaranteed, so every element is deserialized on
//! its own: one malformed block or reference is skipped or defaulted without
//! affecting its neighbours.

use serde::Deserialize;
use serde_json::Value;

use crate::config::FieldPolicy;
use crate::data_models::{OrganicResult, Reference};
use crate::error::CallError;

pub const NO_CONTENT: &str = "No content available.";
pub const NO_TITLE: &str = "No title available";
pub const NO_SNIPPET: &str = "No snippet available";
pub const NO_LINK: &str = "#";

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
enum TextBlock {
    Paragraph {
        snippet: Option<String>,
    },
    List {
        #[serde(default)]
        list: Vec<Value>,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Debug, Default)]
struct ListItem {
    snippet: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct RawReference {
    title: Option<String>,
    link: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct RawOrganic {
    title: Option<String>,
    snippet: Option<String>,
    link: Option<String>,
}

fn elements<'a>(parent: Option<&'a Value>, key: &str) -> &'a [Value] {
    parent
        .and_then(|v| v.get(key))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn push_snippet(out: &mut Vec<String>, snippet: Option<String>) {
    if let Some(s) = snippet {
        if !s.trim().is_empty() {
            out.push(s);
        }
    }
}

/// Joined snippet text and references of an `ai_overview` block.
///
/// Never fails. Without any snippet the text is [`NO_CONTENT`], so every
/// overview yields a non-empty document.
pub fn extract_ai_overview(overview: Option<&Value>) -> (String, Vec<Reference>) {
    let mut snippets = Vec::new();
    for block in elements(overview, "text_blocks") {
        match TextBlock::deserialize(block) {
            Ok(TextBlock::Paragraph { snippet }) => push_snippet(&mut snippets, snippet),
            Ok(TextBlock::List { list }) => {
                for item in &list {
                    let item = ListItem::deserialize(item).unwrap_or_default();
                    push_snippet(&mut snippets, item.snippet);
                }
            }
            Ok(TextBlock::Other) => {}
            Err(e) => log::debug!("skipping unreadable text block: {e}"),
        }
    }

    let text = if snippets.is_empty() {
        NO_CONTENT.to_string()
    } else {
        snippets.join(" ")
    };

    let references = elements(overview, "references")
        .iter()
        .map(|r| {
            let raw = RawReference::deserialize(r).unwrap_or_default();
            Reference {
                title: raw.title.unwrap_or_else(|| NO_TITLE.to_string()),
                link: raw.link.unwrap_or_else(|| NO_LINK.to_string()),
            }
        })
        .collect();

    (text, references)
}

/// Maps each `organic_results` entry to an [`OrganicResult`].
///
/// An absent list is an empty result. Missing fields are either defaulted
/// or reported as [`CallError::MissingField`], depending on `policy`.
pub fn extract_organic(
    results: Option<&Value>,
    policy: FieldPolicy,
) -> Result<Vec<OrganicResult>, CallError> {
    let entries = match results.and_then(Value::as_array) {
        Some(entries) => entries,
        None => return Ok(Vec::new()),
    };

    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| -> Result<OrganicResult, CallError> {
            let raw = RawOrganic::deserialize(entry).unwrap_or_default();
            let context = || format!("organic result {}", idx + 1);
            let field = |value: Option<String>, name: &'static str, placeholder: &str| {
                match (value, policy) {
                    (Some(v), _) => Ok(v),
                    (None, FieldPolicy::Lenient) => Ok(placeholder.to_string()),
                    (None, FieldPolicy::Strict) => Err(CallError::MissingField {
                        field: name,
                        context: context(),
                    }),
                }
            };
            Ok(OrganicResult {
                title: field(raw.title, "title", NO_TITLE)?,
                snippet: field(raw.snippet, "snippet", NO_SNIPPET)?,
                link: field(raw.link, "link", NO_LINK)?,
            })
        })
        .collect()
}
