//! Visibility policy for submissions.

use crate::models::Task;

/// Derive the stored `private` flag from task policy and the caller's request.
///
/// | admin_only_visible | allow_user_set_visibility | result    |
/// |--------------------|---------------------------|-----------|
/// | true               | any                       | private   |
/// | false              | false                     | public    |
/// | false              | true                      | requested |
pub fn effective_private(
    admin_only_visible: bool,
    allow_user_set_visibility: bool,
    requested_private: bool,
) -> bool {
    if admin_only_visible {
        true
    } else if !allow_user_set_visibility {
        false
    } else {
        requested_private
    }
}

pub fn effective_private_for_task(task: &Task, requested_private: bool) -> bool {
    effective_private(
        task.admin_only_visible,
        task.allow_user_set_visibility,
        requested_private,
    )
}
