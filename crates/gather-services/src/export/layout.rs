//! Archive layout planning.
//!
//! Decides every folder and entry name of an export before any content is
//! read, so the archive and its preview always agree.

use std::collections::{BTreeMap, HashMap, HashSet};

use gather_core::models::{
    Member, QuestionnaireAnswers, StoredFile, Submission, SubmissionContent, SubmissionKind,
};
use gather_core::naming;
use gather_core::validation::file_extension;
use serde::Serialize;
use uuid::Uuid;

use crate::archive::sanitize_archive_filename;

const UNNAMED_FOLDER: &str = "unnamed";

/// Where the bytes of one archive entry come from.
#[derive(Debug, Clone, Copy)]
pub enum ArtifactSource<'a> {
    Stored(&'a StoredFile),
    Text(&'a str),
    AnswersJson(&'a QuestionnaireAnswers),
    AnswersText(&'a QuestionnaireAnswers),
}

#[derive(Debug, Clone)]
pub struct PlannedArtifact<'a> {
    pub name: String,
    pub source: ArtifactSource<'a>,
}

#[derive(Debug, Clone)]
pub struct OwnerFolder<'a> {
    pub member: &'a Member,
    pub folder: String,
    pub artifacts: Vec<PlannedArtifact<'a>>,
}

impl OwnerFolder<'_> {
    pub fn entry_path(&self, artifact: &PlannedArtifact<'_>) -> String {
        format!("{}/{}", self.folder, artifact.name)
    }
}

/// One folder of an export preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderPreview {
    pub member_id: Uuid,
    pub member_name: String,
    pub folder: String,
    pub files: Vec<String>,
}

impl From<&OwnerFolder<'_>> for FolderPreview {
    fn from(folder: &OwnerFolder<'_>) -> Self {
        FolderPreview {
            member_id: folder.member.id,
            member_name: folder.member.name.clone(),
            folder: folder.folder.clone(),
            files: folder.artifacts.iter().map(|a| a.name.clone()).collect(),
        }
    }
}

/// Group submissions by member and name every folder and entry.
///
/// Folders are ordered by student id so collision suffixes are stable across
/// runs. Submissions whose member is unknown are left out.
pub fn plan_folders<'a>(
    template: &str,
    members: &'a HashMap<Uuid, Member>,
    submissions: &'a [Submission],
) -> Vec<OwnerFolder<'a>> {
    let mut grouped: BTreeMap<(&'a str, Uuid), (&'a Member, Vec<&'a Submission>)> =
        BTreeMap::new();
    for submission in submissions {
        let Some(member) = members.get(&submission.member_id) else {
            tracing::debug!(
                submission_id = %submission.id,
                member_id = %submission.member_id,
                "Skipping submission of unknown member"
            );
            continue;
        };
        grouped
            .entry((member.student_id.as_str(), member.id))
            .or_insert_with(|| (member, Vec::new()))
            .1
            .push(submission);
    }

    let mut used_folders = HashSet::new();
    let mut folders = Vec::with_capacity(grouped.len());
    for (member, mut owned) in grouped.into_values() {
        owned.sort_by_key(|s| (s.kind, s.item_index));
        let artifacts = plan_artifacts(&owned);
        if artifacts.is_empty() {
            continue;
        }

        let folder = naming::unique_name(&folder_base(template, member), &used_folders);
        used_folders.insert(folder.clone());

        folders.push(OwnerFolder {
            member,
            folder,
            artifacts,
        });
    }
    folders
}

fn folder_base(template: &str, member: &Member) -> String {
    let rendered = naming::render(template, &member.naming_attributes());
    if !rendered.is_empty() {
        return rendered;
    }
    let fallback = naming::sanitize(&member.student_id);
    if fallback.is_empty() {
        UNNAMED_FOLDER.to_string()
    } else {
        fallback
    }
}

/// Entries for one member's submissions, which must be sorted by (kind, item_index).
fn plan_artifacts<'a>(submissions: &[&'a Submission]) -> Vec<PlannedArtifact<'a>> {
    let mut per_kind: HashMap<SubmissionKind, usize> = HashMap::new();
    for submission in submissions.iter().filter(|s| has_content(s)) {
        *per_kind.entry(submission.kind).or_default() += 1;
    }

    let mut used = HashSet::new();
    let mut seen: HashMap<SubmissionKind, usize> = HashMap::new();
    let mut artifacts = Vec::new();

    for submission in submissions.iter().copied().filter(|s| has_content(s)) {
        let ordinal = {
            let n = seen.entry(submission.kind).or_default();
            *n += 1;
            *n
        };
        let multiple = per_kind.get(&submission.kind).copied().unwrap_or(0) > 1;
        let suffix = if multiple {
            format!("_{}", ordinal)
        } else {
            String::new()
        };

        let mut push = |stem: String, extension: &str, source: ArtifactSource<'a>| {
            let name = naming::unique_filename(&stem, extension, &used);
            used.insert(name.clone());
            artifacts.push(PlannedArtifact { name, source });
        };

        match &submission.content {
            SubmissionContent::Text(text) => {
                push(format!("text{}", suffix), ".txt", ArtifactSource::Text(text));
            }
            SubmissionContent::Questionnaire(answers) => {
                let stem = format!("questionnaire{}", suffix);
                push(stem.clone(), ".json", ArtifactSource::AnswersJson(answers));
                push(stem, ".txt", ArtifactSource::AnswersText(answers));
            }
            SubmissionContent::Binary(file) => {
                let (stem, extension) = binary_name(file, submission.kind);
                push(
                    format!("{}{}", stem, suffix),
                    &extension,
                    ArtifactSource::Stored(file),
                );
            }
        }
    }

    artifacts
}

fn has_content(submission: &Submission) -> bool {
    match &submission.content {
        SubmissionContent::Text(text) => !text.is_empty(),
        SubmissionContent::Questionnaire(answers) => !answers.is_empty(),
        SubmissionContent::Binary(file) => !file.storage_key.is_empty(),
    }
}

/// Safe (stem, extension) for a stored file's original name. Only the stem
/// is length-capped so the extension survives long names.
fn binary_name(file: &StoredFile, kind: SubmissionKind) -> (String, String) {
    let base = sanitize_archive_filename(&file.original_filename, "");
    let raw_extension = file_extension(&base);
    let raw_stem = &base[..base.len() - raw_extension.len()];

    let extension = match naming::sanitize(raw_extension.trim_start_matches('.')) {
        ext if ext.is_empty() => String::new(),
        ext => format!(".{}", ext),
    };
    let stem = naming::sanitize(raw_stem);
    if stem.is_empty() {
        (kind.as_str().to_string(), extension)
    } else {
        (stem, extension)
    }
}
