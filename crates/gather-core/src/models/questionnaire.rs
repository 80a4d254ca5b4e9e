use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    #[default]
    Text,
    Radio,
    Checkbox,
    Image,
    File,
}

impl Display for QuestionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            QuestionType::Text => write!(f, "text"),
            QuestionType::Radio => write!(f, "radio"),
            QuestionType::Checkbox => write!(f, "checkbox"),
            QuestionType::Image => write!(f, "image"),
            QuestionType::File => write!(f, "file"),
        }
    }
}

fn default_required() -> bool {
    true
}

/// One entry of a task's questionnaire configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDefinition {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "type", default)]
    pub question_type: QuestionType,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

impl QuestionDefinition {
    /// Title shown to people; falls back to "Question N" (1-based).
    pub fn display_title(&self, index: usize) -> String {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => format!("Question {}", index + 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerScalar {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl Display for AnswerScalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AnswerScalar::Bool(b) => write!(f, "{}", b),
            AnswerScalar::Number(n) => write!(f, "{}", n),
            AnswerScalar::Text(s) => write!(f, "{}", s),
        }
    }
}

/// An answer is either a single scalar or a list of scalars (checkbox questions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    List(Vec<AnswerScalar>),
    Scalar(AnswerScalar),
}

impl AnswerValue {
    /// Empty strings and empty lists count as unanswered. `0` and `false` do not.
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::List(items) => items.is_empty(),
            AnswerValue::Scalar(AnswerScalar::Text(s)) => s.is_empty(),
            AnswerValue::Scalar(_) => false,
        }
    }

    /// Plain-text rendering; list items are joined with ", ".
    pub fn render(&self) -> String {
        match self {
            AnswerValue::Scalar(s) => s.to_string(),
            AnswerValue::List(items) => items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    fn from_json(index: u32, value: JsonValue) -> Result<Option<Self>, AppError> {
        match value {
            JsonValue::Null => Ok(None),
            JsonValue::Array(items) => {
                let mut scalars = Vec::with_capacity(items.len());
                for item in items {
                    match scalar_from_json(index, item)? {
                        Some(s) => scalars.push(s),
                        None => continue,
                    }
                }
                Ok(Some(AnswerValue::List(scalars)))
            }
            other => Ok(scalar_from_json(index, other)?.map(AnswerValue::Scalar)),
        }
    }
}

fn scalar_from_json(index: u32, value: JsonValue) -> Result<Option<AnswerScalar>, AppError> {
    match value {
        JsonValue::Null => Ok(None),
        JsonValue::Bool(b) => Ok(Some(AnswerScalar::Bool(b))),
        JsonValue::Number(n) => Ok(Some(AnswerScalar::Number(n))),
        JsonValue::String(s) => Ok(Some(AnswerScalar::Text(s))),
        JsonValue::Array(_) | JsonValue::Object(_) => Err(AppError::InvalidInput(format!(
            "Answer to question {} must be a scalar or a list of scalars",
            index
        ))),
    }
}

/// Answers keyed by 0-based question index.
///
/// Keys arrive as strings or integers depending on the client; they are
/// normalized to integers at the boundary and serialized back as decimal strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QuestionnaireAnswers(BTreeMap<u32, AnswerValue>);

impl QuestionnaireAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: u32, value: AnswerValue) {
        self.0.insert(index, value);
    }

    pub fn get(&self, index: usize) -> Option<&AnswerValue> {
        u32::try_from(index).ok().and_then(|i| self.0.get(&i))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u32, &AnswerValue)> {
        self.0.iter()
    }

    /// Build answers from a JSON object such as `{"0": "a", "1": ["x", "y"]}`.
    ///
    /// Keys must be integer-like after trimming; `null` answers are dropped.
    pub fn from_json(value: JsonValue) -> Result<Self, AppError> {
        let map = match value {
            JsonValue::Object(map) => map,
            JsonValue::Null => return Ok(Self::default()),
            _ => {
                return Err(AppError::InvalidInput(
                    "Questionnaire answers must be a JSON object".to_string(),
                ))
            }
        };

        let mut answers = BTreeMap::new();
        for (key, value) in map {
            let index: u32 = key.trim().parse().map_err(|_| {
                AppError::InvalidInput(format!("Invalid question index: {:?}", key))
            })?;
            if let Some(answer) = AnswerValue::from_json(index, value)? {
                answers.insert(index, answer);
            }
        }
        Ok(Self(answers))
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }

    pub fn is_answered(&self, index: usize) -> bool {
        self.get(index).is_some_and(|a| !a.is_empty())
    }

    /// Rendered answer for a question, or an empty string when unanswered.
    pub fn render_answer(&self, index: usize) -> String {
        self.get(index).map(AnswerValue::render).unwrap_or_default()
    }

    /// First required question without a non-empty answer.
    pub fn first_missing_required(
        &self,
        questions: &[QuestionDefinition],
    ) -> Option<(usize, String)> {
        questions
            .iter()
            .enumerate()
            .find(|(i, q)| q.required && !self.is_answered(*i))
            .map(|(i, q)| (i, q.display_title(i)))
    }

    /// Human readable form pairing each configured question with its answer.
    pub fn render_text(&self, task_title: &str, questions: &[QuestionDefinition]) -> String {
        let mut lines = vec![
            format!("Questionnaire answers - {}", task_title),
            "=".repeat(40),
            String::new(),
        ];
        for (i, q) in questions.iter().enumerate() {
            lines.push(format!("[{}] {}", i + 1, q.display_title(i)));
            lines.push(format!("Answer: {}", self.render_answer(i)));
            lines.push(String::new());
        }
        lines.join("\n")
    }
}

impl<'de> Deserialize<'de> for QuestionnaireAnswers {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = JsonValue::deserialize(deserializer)?;
        QuestionnaireAnswers::from_json(value).map_err(serde::de::Error::custom)
    }
}
