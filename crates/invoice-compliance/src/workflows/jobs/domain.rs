use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::parse::{lenient_timestamp, null_as_default};
use super::review::{BusinessUnit, ReviewRecord};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Agency code owning a job (e.g. `AG-0042`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgencyId(pub String);

impl fmt::Display for AgencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The six document buckets tracked on every job checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    AgencyInvoice,
    ApprovedQuotation,
    JobOrder,
    Timesheet,
    ThirdParty,
    PerformanceProof,
}

impl DocumentKind {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::AgencyInvoice,
            Self::ApprovedQuotation,
            Self::JobOrder,
            Self::Timesheet,
            Self::ThirdParty,
            Self::PerformanceProof,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::AgencyInvoice => "agency_invoice",
            Self::ApprovedQuotation => "approved_quotation",
            Self::JobOrder => "job_order",
            Self::Timesheet => "timesheet",
            Self::ThirdParty => "third_party",
            Self::PerformanceProof => "performance_proof",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::AgencyInvoice => "Agency Invoice",
            Self::ApprovedQuotation => "Approved Quotation",
            Self::JobOrder => "Job Order",
            Self::Timesheet => "Timesheet",
            Self::ThirdParty => "Third Party Documents",
            Self::PerformanceProof => "Performance Proof",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for DocumentKind {
    type Err = ChecklistError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ordered()
            .into_iter()
            .find(|kind| kind.key() == value.trim())
            .ok_or_else(|| ChecklistError::UnknownKind(value.to_string()))
    }
}

/// Errors raised by checklist mutations.
#[derive(Debug, thiserror::Error)]
pub enum ChecklistError {
    #[error("invalid folder type '{0}', must be one of: agency_invoice, approved_quotation, job_order, timesheet, third_party, performance_proof")]
    UnknownKind(String),
    #[error("document {index} not found in {kind} ({len} attached)")]
    DocumentNotFound {
        kind: DocumentKind,
        index: usize,
        len: usize,
    },
}

/// One uploaded file reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub file_path: String,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(default)]
    pub uploaded_by: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new(
        file_path: impl Into<String>,
        original_filename: Option<String>,
        uploaded_by: Option<String>,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        let file_path = file_path.into();
        let content_type = mime_guess::from_path(original_filename.as_deref().unwrap_or(&file_path))
            .first()
            .map(|mime| mime.essence_str().to_string());

        Self {
            file_path,
            original_filename,
            uploaded_by,
            uploaded_at: Some(uploaded_at),
            content_type,
            metadata: BTreeMap::new(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.original_filename
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.file_path)
    }
}

/// Per-job document tracker. Every bucket is always present; absent, `null`, or
/// non-list buckets in stored records read back as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    #[serde(default, deserialize_with = "lenient_documents")]
    pub agency_invoice: Vec<Document>,
    #[serde(default, deserialize_with = "lenient_documents")]
    pub approved_quotation: Vec<Document>,
    #[serde(default, deserialize_with = "lenient_documents")]
    pub job_order: Vec<Document>,
    #[serde(default, deserialize_with = "lenient_documents")]
    pub timesheet: Vec<Document>,
    #[serde(default, deserialize_with = "lenient_documents")]
    pub third_party: Vec<Document>,
    #[serde(default, deserialize_with = "lenient_documents")]
    pub performance_proof: Vec<Document>,
}

/// Entries that do not read as a document are dropped so one bad upload record
/// leaves the rest of its bucket intact.
fn lenient_documents<'de, D>(deserializer: D) -> Result<Vec<Document>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(entries)) = raw else {
        return Ok(Vec::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}

impl Checklist {
    pub fn documents(&self, kind: DocumentKind) -> &[Document] {
        match kind {
            DocumentKind::AgencyInvoice => &self.agency_invoice,
            DocumentKind::ApprovedQuotation => &self.approved_quotation,
            DocumentKind::JobOrder => &self.job_order,
            DocumentKind::Timesheet => &self.timesheet,
            DocumentKind::ThirdParty => &self.third_party,
            DocumentKind::PerformanceProof => &self.performance_proof,
        }
    }

    fn documents_mut(&mut self, kind: DocumentKind) -> &mut Vec<Document> {
        match kind {
            DocumentKind::AgencyInvoice => &mut self.agency_invoice,
            DocumentKind::ApprovedQuotation => &mut self.approved_quotation,
            DocumentKind::JobOrder => &mut self.job_order,
            DocumentKind::Timesheet => &mut self.timesheet,
            DocumentKind::ThirdParty => &mut self.third_party,
            DocumentKind::PerformanceProof => &mut self.performance_proof,
        }
    }

    pub fn count(&self, kind: DocumentKind) -> usize {
        self.documents(kind).len()
    }

    pub fn attach(&mut self, kind: DocumentKind, document: Document) {
        self.documents_mut(kind).push(document);
    }

    /// Removes the document at `index`, shifting later documents down.
    pub fn remove(&mut self, kind: DocumentKind, index: usize) -> Result<Document, ChecklistError> {
        let documents = self.documents_mut(kind);
        if index >= documents.len() {
            return Err(ChecklistError::DocumentNotFound {
                kind,
                index,
                len: documents.len(),
            });
        }
        Ok(documents.remove(index))
    }

    pub fn filenames(&self, kind: DocumentKind) -> Vec<&str> {
        self.documents(kind)
            .iter()
            .map(Document::display_name)
            .collect()
    }

    /// Present/missing view for every bucket, timesheet and third party included.
    pub fn presence(&self) -> Vec<ChecklistPresence> {
        DocumentKind::ordered()
            .into_iter()
            .map(|kind| {
                let count = self.count(kind);
                ChecklistPresence {
                    kind,
                    label: kind.label(),
                    count,
                    present: count > 0,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistPresence {
    pub kind: DocumentKind,
    pub label: &'static str,
    pub count: usize,
    pub present: bool,
}

/// Compliance verdict stored on a job. Anything other than `Compliant`,
/// including legacy values such as `pending`, reads back as `NotCompliant`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Compliant,
    #[default]
    NotCompliant,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Compliant => "Compliant",
            Self::NotCompliant => "Not Compliant",
        }
    }

    pub fn normalize(raw: &str) -> Self {
        if raw == Self::Compliant.label() {
            Self::Compliant
        } else {
            Self::NotCompliant
        }
    }

    pub const fn is_compliant(self) -> bool {
        matches!(self, Self::Compliant)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for JobStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(Value::String(text)) => Self::normalize(&text),
            _ => Self::NotCompliant,
        })
    }
}

fn default_created_by() -> String {
    "Admin".to_string()
}

fn lenient_checklist<'de, D>(deserializer: D) -> Result<Checklist, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(value @ Value::Object(_)) => serde_json::from_value(value).unwrap_or_default(),
        _ => Checklist::default(),
    })
}

fn lenient_review<'de, D>(deserializer: D) -> Result<Option<ReviewRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

/// One campaign/invoice cycle run by an agency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub agency_id: AgencyId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default = "default_created_by")]
    pub created_by: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, deserialize_with = "lenient_checklist")]
    pub checklist: Checklist,
    #[serde(default, deserialize_with = "lenient_review")]
    pub review: Option<ReviewRecord>,
}

impl Job {
    /// New jobs start with an empty checklist and are not yet compliant.
    pub fn new(
        id: JobId,
        agency_id: AgencyId,
        title: impl Into<String>,
        created_by: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            agency_id,
            title: title.into(),
            description: None,
            start_date: None,
            end_date: None,
            created_by: created_by.into(),
            created_at: Some(created_at),
            updated_at: Some(created_at),
            status: JobStatus::NotCompliant,
            checklist: Checklist::default(),
            review: None,
        }
    }

    pub fn business_unit(&self) -> Option<BusinessUnit> {
        self.review.as_ref().and_then(ReviewRecord::business_unit)
    }

    pub fn invoice_total(&self) -> f64 {
        self.review
            .as_ref()
            .map(|review| review.agency_invoice_total_amount)
            .unwrap_or(0.0)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }
}
