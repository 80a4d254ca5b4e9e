//! Shared key generation for storage backends.
//!
//! Key format: `submissions/{task_id}/{uuid}{ext}`.

use uuid::Uuid;

const MAX_EXTENSION_LEN: usize = 16;

/// Generate a fresh storage key for content submitted to `task_id`.
///
/// `extension` is kept (lowercased) only when it is a dot followed by ASCII
/// alphanumerics; anything else is dropped from the key.
pub fn generate_storage_key(task_id: Uuid, extension: &str) -> String {
    format!(
        "submissions/{}/{}{}",
        task_id,
        Uuid::new_v4().simple(),
        safe_extension(extension)
    )
}

fn safe_extension(extension: &str) -> String {
    match extension.strip_prefix('.') {
        Some(rest)
            if !rest.is_empty()
                && rest.len() <= MAX_EXTENSION_LEN
                && rest.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            format!(".{}", rest.to_ascii_lowercase())
        }
        _ => String::new(),
    }
}
