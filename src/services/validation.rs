//! Input validation and sanitization for markstore.
//!
//! Every write passes through a [`Validator`] before it can reach the tree.
//! Checks never panic; a rejected input yields a [`ValidationError`] listing
//! each problem found.

use url::Url;

use crate::types::bookmark::{Bookmark, Folder, ROOT_FOLDER_ID};
use crate::types::errors::{ValidationError, ValidationIssue};
use crate::types::settings::TextLimits;

/// URL schemes a bookmark may use.
pub const ALLOWED_SCHEMES: [&str; 3] = ["http", "https", "ftp"];

/// Free-text fragments removed by [`sanitize_input`].
const STRIPPED_SCHEMES: [&str; 2] = ["javascript:", "data:"];

/// Returns true for empty or whitespace-only text.
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Returns true if `text` is at most `max` characters long.
pub fn is_valid_text_length(text: &str, max: usize) -> bool {
    text.chars().count() <= max
}

/// Ids are non-empty tokens of `[A-Za-z0-9_-]`, at most `max_len` characters.
pub fn is_valid_id(id: &str, max_len: usize) -> bool {
    !is_blank(id)
        && id.len() <= max_len
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Parses `url` and checks its scheme against [`ALLOWED_SCHEMES`].
pub fn is_valid_url(url: &str) -> bool {
    parse_allowed(url).is_some()
}

fn parse_allowed(url: &str) -> Option<Url> {
    if is_blank(url) {
        return None;
    }
    let parsed = Url::parse(url.trim()).ok()?;
    if ALLOWED_SCHEMES.contains(&parsed.scheme()) {
        Some(parsed)
    } else {
        None
    }
}

/// Returns the normalized form of an allowed URL, or `None` if it is rejected.
pub fn sanitize_url(url: &str) -> Option<String> {
    parse_allowed(url).map(|u| u.to_string())
}

/// Strips angle brackets and `javascript:` / `data:` fragments, then trims.
pub fn sanitize_input(input: &str) -> String {
    let mut cleaned: String = input.chars().filter(|c| *c != '<' && *c != '>').collect();
    for scheme in STRIPPED_SCHEMES {
        cleaned = remove_ignore_ascii_case(&cleaned, scheme);
    }
    cleaned.trim().to_string()
}

/// Single left-to-right pass removing every case-insensitive match of an
/// ASCII `pattern`.
fn remove_ignore_ascii_case(haystack: &str, pattern: &str) -> String {
    // ASCII lowercasing keeps byte offsets aligned with the original.
    let lowered = haystack.to_ascii_lowercase();
    let mut out = String::with_capacity(haystack.len());
    let mut cursor = 0;
    while let Some(pos) = lowered[cursor..].find(pattern) {
        let start = cursor + pos;
        out.push_str(&haystack[cursor..start]);
        cursor = start + pattern.len();
    }
    out.push_str(&haystack[cursor..]);
    out
}

/// Entity-level validator configured with text limits.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    limits: TextLimits,
}

impl Validator {
    pub fn new(limits: TextLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &TextLimits {
        &self.limits
    }

    pub fn is_valid_id(&self, id: &str) -> bool {
        is_valid_id(id, self.limits.id)
    }

    /// Validates a bookmark and returns its sanitized copy.
    ///
    /// An empty `folder_id` resolves to root. Existence of the folder is the
    /// caller's concern.
    pub fn validate_bookmark(&self, bookmark: &Bookmark) -> Result<Bookmark, ValidationError> {
        let mut issues = Vec::new();

        if !self.is_valid_id(&bookmark.id) {
            issues.push(ValidationIssue::InvalidId(bookmark.id.clone()));
        }

        let name = sanitize_input(&bookmark.name);
        if is_blank(&name) {
            issues.push(ValidationIssue::EmptyName);
        } else if !is_valid_text_length(&bookmark.name, self.limits.bookmark_name) {
            issues.push(ValidationIssue::NameTooLong(self.limits.bookmark_name));
        }

        let url = sanitize_url(&bookmark.url);
        if url.is_none() {
            issues.push(ValidationIssue::InvalidUrl(bookmark.url.clone()));
        }

        if !is_valid_text_length(&bookmark.description, self.limits.bookmark_description) {
            issues.push(ValidationIssue::DescriptionTooLong(
                self.limits.bookmark_description,
            ));
        }

        let folder_id = if bookmark.folder_id.is_empty() {
            ROOT_FOLDER_ID.to_string()
        } else if self.is_valid_id(&bookmark.folder_id) {
            bookmark.folder_id.clone()
        } else {
            issues.push(ValidationIssue::InvalidFolderId(bookmark.folder_id.clone()));
            String::new()
        };

        if !issues.is_empty() {
            return Err(ValidationError { issues });
        }

        Ok(Bookmark {
            name,
            url: url.unwrap_or_default(),
            description: sanitize_input(&bookmark.description),
            folder_id,
            ..bookmark.clone()
        })
    }

    /// Validates a folder and returns its sanitized copy.
    ///
    /// A non-root folder without a parent is attached to root.
    pub fn validate_folder(&self, folder: &Folder) -> Result<Folder, ValidationError> {
        let mut issues = Vec::new();

        if !self.is_valid_id(&folder.id) {
            issues.push(ValidationIssue::InvalidId(folder.id.clone()));
        }

        let name = sanitize_input(&folder.name);
        if is_blank(&name) {
            issues.push(ValidationIssue::EmptyName);
        } else if !is_valid_text_length(&folder.name, self.limits.folder_name) {
            issues.push(ValidationIssue::NameTooLong(self.limits.folder_name));
        }

        let parent_id = match folder.parent_id.as_deref() {
            _ if folder.is_root() => None,
            None | Some("") => Some(ROOT_FOLDER_ID.to_string()),
            Some(pid) if self.is_valid_id(pid) => Some(pid.to_string()),
            Some(pid) => {
                issues.push(ValidationIssue::InvalidFolderId(pid.to_string()));
                None
            }
        };

        if !issues.is_empty() {
            return Err(ValidationError { issues });
        }

        Ok(Folder {
            name,
            parent_id,
            ..folder.clone()
        })
    }
}
