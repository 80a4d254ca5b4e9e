//! Naming template engine
//!
//! Renders a template such as `{student_id}_{name}` against a member's
//! attributes into a name that is safe to use as an archive folder or file name.
//! Rendering is pure; collision handling is left to the caller via [`unique_name`].

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::AppError;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is valid"));

/// Template used when neither the caller nor the task supplies one.
pub const DEFAULT_NAMING_FORMAT: &str = "{student_id}_{name}";

/// Maximum length of a rendered name, in characters.
pub const MAX_NAME_LENGTH: usize = 200;

/// The closed set of variables a template may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamingVariable {
    StudentId,
    Name,
    Gender,
    Dormitory,
}

impl NamingVariable {
    pub const ALL: [NamingVariable; 4] = [
        NamingVariable::StudentId,
        NamingVariable::Name,
        NamingVariable::Gender,
        NamingVariable::Dormitory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NamingVariable::StudentId => "student_id",
            NamingVariable::Name => "name",
            NamingVariable::Gender => "gender",
            NamingVariable::Dormitory => "dormitory",
        }
    }

    pub fn placeholder(&self) -> String {
        format!("{{{}}}", self.as_str())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == name)
    }
}

/// Member attributes available to a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamingAttributes {
    pub student_id: String,
    pub name: String,
    pub gender: Option<String>,
    pub dormitory: Option<String>,
}

impl NamingAttributes {
    pub fn value(&self, variable: NamingVariable) -> &str {
        match variable {
            NamingVariable::StudentId => &self.student_id,
            NamingVariable::Name => &self.name,
            NamingVariable::Gender => self.gender.as_deref().unwrap_or(""),
            NamingVariable::Dormitory => self.dormitory.as_deref().unwrap_or(""),
        }
    }
}

/// Render `template` for one member and sanitize the result.
///
/// Placeholders outside the variable set are left as literal text.
pub fn render(template: &str, attrs: &NamingAttributes) -> String {
    let mut result = template.to_string();
    for variable in NamingVariable::ALL {
        result = result.replace(&variable.placeholder(), attrs.value(variable));
    }
    sanitize(&result)
}

/// Replace characters that are illegal in file names, trim spaces and dots
/// from both ends, and cap the length.
pub fn sanitize(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    replaced
        .trim_matches(|c| c == ' ' || c == '.')
        .chars()
        .take(MAX_NAME_LENGTH)
        .collect()
}

/// Check that a template is non-empty, references at least one known
/// variable and no unknown ones.
pub fn validate(template: &str) -> Result<(), AppError> {
    if template.is_empty() {
        return Err(AppError::InvalidNamingTemplate(
            "Naming template must not be empty".to_string(),
        ));
    }

    let mut has_known = false;
    for caps in PLACEHOLDER.captures_iter(template) {
        let name = &caps[1];
        if NamingVariable::from_name(name).is_none() {
            return Err(AppError::InvalidNamingTemplate(format!(
                "Unknown variable: {{{}}}",
                name
            )));
        }
        has_known = true;
    }

    if !has_known {
        let supported: Vec<String> = NamingVariable::ALL
            .iter()
            .map(NamingVariable::placeholder)
            .collect();
        return Err(AppError::InvalidNamingTemplate(format!(
            "Naming template must contain at least one variable: {}",
            supported.join(", ")
        )));
    }

    Ok(())
}

/// Return `base` if unused, else the first of `base_1`, `base_2`, ... not in `used`.
pub fn unique_name(base: &str, used: &HashSet<String>) -> String {
    unique_filename(base, "", used)
}

/// Same as [`unique_name`] with the counter placed before `extension`.
pub fn unique_filename(stem: &str, extension: &str, used: &HashSet<String>) -> String {
    let candidate = format!("{}{}", stem, extension);
    if !used.contains(&candidate) {
        return candidate;
    }

    let mut counter = 1;
    loop {
        let candidate = format!("{}_{}{}", stem, counter, extension);
        if !used.contains(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}
