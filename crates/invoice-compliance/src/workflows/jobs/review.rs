use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::parse::{
    empty_string_as_none, lenient_amount, lenient_days, lenient_timestamp, sanitize_amount,
};

/// Reporting segments used by the validation summary, in row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BusinessUnit {
    Ae,
    Apac,
    Domestic,
    Coe,
    Mea,
}

impl BusinessUnit {
    pub const fn ordered() -> [Self; 5] {
        [Self::Ae, Self::Apac, Self::Domestic, Self::Coe, Self::Mea]
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::Ae => "A/E",
            Self::Apac => "APAC",
            Self::Domestic => "DOMESTIC",
            Self::Coe => "COE",
            Self::Mea => "MEA",
        }
    }
}

impl fmt::Display for BusinessUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown business unit '{0}'")]
pub struct UnknownBusinessUnit(pub String);

impl FromStr for BusinessUnit {
    type Err = UnknownBusinessUnit;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ordered()
            .into_iter()
            .find(|unit| unit.code() == value)
            .ok_or_else(|| UnknownBusinessUnit(value.to_string()))
    }
}

/// `final_review_outcome` values. Free text entered by reviewers is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewOutcome {
    Approved,
    NotApproved,
    Other(String),
}

impl ReviewOutcome {
    pub fn label(&self) -> &str {
        match self {
            Self::Approved => "Approved",
            Self::NotApproved => "Not Approved",
            Self::Other(text) => text,
        }
    }

    pub fn from_label(raw: &str) -> Self {
        match raw {
            "Approved" => Self::Approved,
            "Not Approved" => Self::NotApproved,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ReviewOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for ReviewOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for ReviewOutcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_label(&raw))
    }
}

/// Non-text outcomes (numbers, booleans, objects) read as blank.
fn lenient_outcome<'de, D>(deserializer: D) -> Result<Option<ReviewOutcome>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(text)) if !text.trim().is_empty() => {
            Some(ReviewOutcome::from_label(&text))
        }
        _ => None,
    })
}

/// Structured invoice/PO data attached to a job after extraction or manual entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub market_bu: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub agency_invoice_number: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub po_number: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub period_month: Option<String>,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub date_invoice_sent_to_medpush: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub date_medpush_shared_feedback: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub date_agency_responded_to_feedback: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub date_medpush_approved_invoice: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub medium: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub campaign_name: Option<String>,

    #[serde(default, deserialize_with = "lenient_amount")]
    pub net_media_cost: f64,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub agency_fee: f64,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub taxes: f64,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub other_third_party_cost: f64,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub agency_invoice_total_amount: f64,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub media_plan_total_amount: f64,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub po_amount_with_af: f64,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub initial_review_outcome: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub agency_feedback_action: Option<String>,
    #[serde(default, deserialize_with = "lenient_outcome")]
    pub final_review_outcome: Option<ReviewOutcome>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub status_of_received_invoices: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub month_medpush_received_invoice: Option<String>,

    #[serde(default, deserialize_with = "lenient_days")]
    pub days_medpush_to_review_and_share_feedback: Option<i64>,
    #[serde(default, deserialize_with = "lenient_days")]
    pub days_agency_to_revert_to_medpush: Option<i64>,
    #[serde(default, deserialize_with = "lenient_days")]
    pub days_medpush_to_approve_after_revision: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_ai_invoice_output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_ai_po_output: Option<serde_json::Value>,
}

impl ReviewRecord {
    /// Resolves `market_bu` against the five reporting codes (exact match).
    pub fn business_unit(&self) -> Option<BusinessUnit> {
        self.market_bu
            .as_deref()
            .and_then(|code| code.parse::<BusinessUnit>().ok())
    }

    pub fn components_total(&self) -> f64 {
        self.net_media_cost + self.agency_fee + self.taxes + self.other_third_party_cost
    }

    /// Fills values derivable from other fields: the invoice total when only its
    /// components were captured, and the turnaround day counts between the
    /// review milestones. Values already present are kept.
    pub fn fill_derived(&mut self) {
        self.net_media_cost = sanitize_amount(self.net_media_cost);
        self.agency_fee = sanitize_amount(self.agency_fee);
        self.taxes = sanitize_amount(self.taxes);
        self.other_third_party_cost = sanitize_amount(self.other_third_party_cost);
        self.agency_invoice_total_amount = sanitize_amount(self.agency_invoice_total_amount);

        let has_components =
            self.net_media_cost > 0.0 || self.agency_fee > 0.0 || self.taxes > 0.0;
        if self.agency_invoice_total_amount == 0.0 && has_components {
            self.agency_invoice_total_amount = self.components_total();
        }

        if self.days_medpush_to_review_and_share_feedback.is_none() {
            self.days_medpush_to_review_and_share_feedback = days_between(
                self.date_invoice_sent_to_medpush,
                self.date_medpush_shared_feedback,
            );
        }
        if self.days_agency_to_revert_to_medpush.is_none() {
            self.days_agency_to_revert_to_medpush = days_between(
                self.date_medpush_shared_feedback,
                self.date_agency_responded_to_feedback,
            );
        }
        if self.days_medpush_to_approve_after_revision.is_none() {
            self.days_medpush_to_approve_after_revision = days_between(
                self.date_agency_responded_to_feedback,
                self.date_medpush_approved_invoice,
            );
        }

        if self.month_medpush_received_invoice.is_none() {
            self.month_medpush_received_invoice = self
                .date_invoice_sent_to_medpush
                .map(|sent| sent.format("%B %Y").to_string());
        }
    }
}

fn days_between(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Option<i64> {
    match (start, end) {
        (Some(start), Some(end)) if end >= start => Some((end - start).num_days()),
        _ => None,
    }
}
