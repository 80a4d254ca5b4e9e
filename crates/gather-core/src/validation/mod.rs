//! Validation modules

pub mod file_types;
pub mod visibility;

pub use file_types::{
    category_extensions, file_extension, validate_file_type, IMAGE_EXTENSIONS,
};
pub use visibility::{effective_private, effective_private_for_task};
