//! Canonical file locations for issues.
//!
//! Paths are relative to the data directory and always use `/` as the
//! separator, so they serialize identically on every platform:
//!
//! ```text
//! backbones/<backbone>/<epic>/epic.md          epic
//! backbones/<backbone>/<epic>/story-<s>.md     story linked to that epic
//! backbones/<backbone>/story-<s>.md            story without a parent
//! backbones/<backbone>/<s>.md                  anything else
//! _unassigned/<filename>                       no backbone label
//! ```
//!
//! Tasks have no file.

use crate::domain::{IssueKind, LabelScheme};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Directory holding everything filed under a backbone.
pub const BACKBONES_DIR: &str = "backbones";

/// Directory for issues without a backbone label.
pub const UNASSIGNED_DIR: &str = "_unassigned";

/// Filename of an epic inside its own directory.
pub const EPIC_FILENAME: &str = "epic.md";

/// Derive a filesystem-safe slug from arbitrary text.
///
/// Diacritics are stripped, the text is lowercased, and every run of
/// characters outside `[a-z0-9]` becomes a single `-`. Leading and trailing
/// hyphens are trimmed, so the result may be empty.
///
/// ```
/// use storymap::paths::slugify;
///
/// assert_eq!(slugify("Héllo, Wörld!"), "hello-world");
/// assert_eq!(slugify("---"), "");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
    {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Directory part of a `/`-separated relative path.
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Maps issue metadata to file paths.
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    scheme: &'a LabelScheme,
}

impl<'a> PathResolver<'a> {
    /// Create a resolver for the given label scheme.
    pub fn new(scheme: &'a LabelScheme) -> Self {
        Self { scheme }
    }

    /// Default path for an issue, or `None` for tasks.
    ///
    /// Stories get the backbone-level default; placing them under their
    /// epic is up to the caller (see [`PathResolver::child_path`]).
    pub fn resolve(&self, title: &str, labels: &[String]) -> Option<String> {
        let kind = self.scheme.kind(labels);
        let filename = match kind {
            IssueKind::Task => return None,
            IssueKind::Epic => EPIC_FILENAME.to_string(),
            IssueKind::Story => story_filename(title),
            IssueKind::Other => format!("{}.md", slugify(title)),
        };

        let Some(backbone) = self.scheme.backbone(labels) else {
            return Some(format!("{UNASSIGNED_DIR}/{filename}"));
        };

        let root = format!("{BACKBONES_DIR}/{}", slugify(backbone));
        Some(match kind {
            IssueKind::Epic => format!("{root}/{}/{filename}", slugify(title)),
            _ => format!("{root}/{filename}"),
        })
    }

    /// Path of a story placed inside its epic's directory.
    pub fn child_path(&self, parent_dir: &str, title: &str) -> String {
        if parent_dir.is_empty() {
            story_filename(title)
        } else {
            format!("{parent_dir}/{}", story_filename(title))
        }
    }

    /// Last-resort location for an issue the resolver cannot place.
    pub fn unassigned_path(&self, title: &str) -> String {
        format!("{UNASSIGNED_DIR}/{}.md", slugify(title))
    }
}

fn story_filename(title: &str) -> String {
    format!("story-{}.md", slugify(title))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[rstest]
    #[case::diacritics("Héllo, Wörld!", "hello-world")]
    #[case::empty("", "")]
    #[case::only_hyphens("---", "")]
    #[case::collapses_runs("a  --  b", "a-b")]
    #[case::digits("Release 2.0", "release-2-0")]
    #[case::trims("  (Draft) ", "draft")]
    #[case::compatibility_forms("ﬁle №5", "file-no5")]
    fn slugify_cases(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(slugify(input), expected);
    }

    #[rstest]
    #[case::epic(
        "Implement Login Feature",
        &["Type::Epic", "Backbone::User Authentication"],
        Some("backbones/user-authentication/implement-login-feature/epic.md")
    )]
    #[case::story(
        "Reset Password",
        &["Type::Story", "Backbone::User Authentication"],
        Some("backbones/user-authentication/story-reset-password.md")
    )]
    #[case::untyped(
        "Write Docs",
        &["Backbone::Docs"],
        Some("backbones/docs/write-docs.md")
    )]
    #[case::unassigned_epic("Billing", &["Type::Epic"], Some("_unassigned/epic.md"))]
    #[case::unassigned_story("Pay", &["Type::Story"], Some("_unassigned/story-pay.md"))]
    #[case::task("Add index", &["Type::Task", "Backbone::Data"], None)]
    #[case::empty_title("", &["Backbone::X"], Some("backbones/x/.md"))]
    fn resolve_cases(#[case] title: &str, #[case] input: &[&str], #[case] expected: Option<&str>) {
        let scheme = LabelScheme::default();
        let resolver = PathResolver::new(&scheme);
        assert_eq!(
            resolver.resolve(title, &labels(input)).as_deref(),
            expected
        );
    }

    #[test]
    fn child_path_nests_under_parent_dir() {
        let scheme = LabelScheme::default();
        let resolver = PathResolver::new(&scheme);
        let epic = resolver
            .resolve(
                "Implement Login Feature",
                &labels(&["Type::Epic", "Backbone::User Authentication"]),
            )
            .unwrap();

        assert_eq!(
            resolver.child_path(parent_dir(&epic), "Remember Me"),
            "backbones/user-authentication/implement-login-feature/story-remember-me.md"
        );
    }

    #[test]
    fn parent_dir_of_bare_filename_is_empty() {
        assert_eq!(parent_dir("epic.md"), "");
        assert_eq!(parent_dir("a/b/c.md"), "a/b");
    }

    proptest! {
        #[test]
        fn slug_is_total_and_safe(text in ".*") {
            let slug = slugify(&text);
            prop_assert!(slug.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-'));
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }

        #[test]
        fn slug_is_idempotent(text in ".*") {
            let once = slugify(&text);
            prop_assert_eq!(slugify(&once), once.clone());
        }

        #[test]
        fn resolve_is_deterministic(
            title in ".*",
            backbone in "[A-Za-z ]{0,12}",
            kind in prop::sample::select(vec!["Type::Epic", "Type::Story", "Type::Task", "bug"]),
        ) {
            let scheme = LabelScheme::default();
            let resolver = PathResolver::new(&scheme);
            let l = vec![kind.to_string(), format!("Backbone::{backbone}")];
            prop_assert_eq!(resolver.resolve(&title, &l), resolver.resolve(&title, &l));
        }
    }
}
