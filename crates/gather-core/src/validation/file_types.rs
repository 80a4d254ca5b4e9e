//! File type rules for binary submissions.
//!
//! Image submissions must carry one of [`IMAGE_EXTENSIONS`]. Plain file
//! submissions are only checked when the task restricts `allowed_types`; each
//! entry is either a category tag or a bare extension with or without the dot.

use crate::error::AppError;
use crate::models::SubmissionKind;

pub const IMAGE_EXTENSIONS: [&str; 6] = [".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp"];

const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".avi", ".mov", ".wmv", ".flv", ".mkv"];
const DOCUMENT_EXTENSIONS: &[&str] = &[
    ".doc", ".docx", ".pdf", ".txt", ".xls", ".xlsx", ".ppt", ".pptx",
];
const ARCHIVE_EXTENSIONS: &[&str] = &[".zip", ".rar", ".7z", ".tar", ".gz"];
const TEXT_EXTENSIONS: &[&str] = &[".txt", ".md", ".json", ".xml", ".csv"];

/// Extensions belonging to a category tag, or `None` if the tag is not a category.
pub fn category_extensions(category: &str) -> Option<&'static [&'static str]> {
    match category {
        "image" => Some(&IMAGE_EXTENSIONS),
        "video" => Some(VIDEO_EXTENSIONS),
        "document" => Some(DOCUMENT_EXTENSIONS),
        "archive" => Some(ARCHIVE_EXTENSIONS),
        "text" => Some(TEXT_EXTENSIONS),
        _ => None,
    }
}

/// Extension of `filename` including the leading dot, case preserved.
///
/// Only the last component counts (`a.tar.gz` gives `.gz`) and leading dots
/// do not start an extension (`.bashrc` has none).
pub fn file_extension(filename: &str) -> &str {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    let stem_start = base.len() - base.trim_start_matches('.').len();
    match base[stem_start..].rfind('.') {
        Some(pos) => &base[stem_start + pos..],
        None => "",
    }
}

fn matches_allowed(extension: &str, allowed: &str) -> bool {
    let allowed = allowed.trim().to_lowercase();
    if allowed.is_empty() {
        return false;
    }
    match category_extensions(&allowed) {
        Some(extensions) => extensions.contains(&extension),
        None => extension == allowed || extension == format!(".{}", allowed),
    }
}

/// Check a binary upload's extension against the rules for its kind.
pub fn validate_file_type(
    kind: SubmissionKind,
    allowed_types: Option<&[String]>,
    filename: &str,
) -> Result<(), AppError> {
    let extension = file_extension(filename).to_lowercase();

    match kind {
        SubmissionKind::Image => {
            if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
                Ok(())
            } else {
                Err(AppError::InvalidImageType { extension })
            }
        }
        SubmissionKind::File => match allowed_types {
            Some(allowed) if !allowed.is_empty() => {
                if allowed.iter().any(|a| matches_allowed(&extension, a)) {
                    Ok(())
                } else {
                    Err(AppError::InvalidFileType { extension })
                }
            }
            _ => Ok(()),
        },
        SubmissionKind::Text | SubmissionKind::Questionnaire => Err(AppError::InvalidInput(
            format!("{} submissions do not carry a file", kind),
        )),
    }
}
