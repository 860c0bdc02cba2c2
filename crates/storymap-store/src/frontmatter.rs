//! Markdown documents headed by a YAML front-matter block.
//!
//! Issue files look like this:
//!
//! ```text
//! ---
//! iid: 12
//! title: Implement Login Feature
//! ---
//!
//! Free-form description text.
//! ```
//!
//! [`compose`] produces that layout from any serializable header; [`split`]
//! separates the header from the body again. The closing delimiter may be
//! `---` or `...`, and a leading byte-order mark is tolerated.

use crate::{Error, Result};
use serde::Serialize;

const DELIMITER: &str = "---";
const ALT_CLOSING_DELIMITER: &str = "...";

/// A markdown document split into its front-matter and body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontMatter<'a> {
    /// Raw YAML between the delimiters, `None` when the document has no block.
    pub yaml: Option<&'a str>,
    /// Everything after the closing delimiter (or the whole document).
    pub body: &'a str,
}

/// Renders `header` as a front-matter block followed by a blank line and
/// `body`. The result always ends with a newline.
///
/// # Errors
///
/// Returns an error if `header` cannot be serialized to a YAML mapping.
pub fn compose<T: Serialize + ?Sized>(header: &T, body: &str) -> Result<String> {
    let yaml = serde_yaml::to_string(header)?;
    if !yaml.ends_with('\n') {
        return Err(Error::FrontMatter(
            "header did not serialize to a YAML block".to_string(),
        ));
    }

    let mut out = String::with_capacity(yaml.len() + body.len() + 10);
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(&yaml);
    out.push_str(DELIMITER);
    out.push_str("\n\n");
    out.push_str(body);
    if !body.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

/// Splits a document into front-matter and body.
///
/// If the first line is not a delimiter, or no closing delimiter is found, the
/// whole document is returned as the body.
pub fn split(content: &str) -> FrontMatter<'_> {
    let unmarked = content.trim_start_matches('\u{feff}');
    let whole = FrontMatter {
        yaml: None,
        body: content,
    };

    let mut lines = unmarked.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return whole;
    };
    if first.trim_end() != DELIMITER {
        return whole;
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        let trimmed = line.trim_end();
        if trimmed == DELIMITER || trimmed == ALT_CLOSING_DELIMITER {
            return FrontMatter {
                yaml: Some(&unmarked[yaml_start..offset]),
                body: &unmarked[offset + line.len()..],
            };
        }
        offset += line.len();
    }

    whole
}
