/// Job application records: what the extractor returns and what the store keeps
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Application lifecycle stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "APPLIED")]
    Applied,
    #[serde(rename = "IN_PROGRESS_RECRUITER_CONTACT")]
    RecruiterContact,
    // Stored spelling, kept for compatibility with existing rows
    #[serde(rename = "IN_PROGRESS_ONLINE_ASSESMENT")]
    OnlineAssessment,
    #[serde(rename = "IN_PROGRESS_CASE_STUDY")]
    CaseStudy,
    #[serde(rename = "IN_PROGRESS_INTERVIEW_ROUND_1")]
    InterviewRound1,
    #[serde(rename = "IN_PROGRESS_INTERVIEW_ROUND_2")]
    InterviewRound2,
    #[serde(rename = "IN_PROGRESS_INTERVIEW_ROUND_3")]
    InterviewRound3,
    #[serde(rename = "IN_PROGRESS_INTERVIEW_ROUND_4")]
    InterviewRound4,
    #[serde(rename = "IN_PROGRESS_INTERVIEW_ROUND_5")]
    InterviewRound5,
    #[serde(rename = "IN_PROGRESS_INTERVIEW_ROUND_6")]
    InterviewRound6,
    #[serde(rename = "IN_PROGRESS_INTERVIEW_ROUND_7")]
    InterviewRound7,
    #[serde(rename = "REJECTED")]
    Rejected,
    #[serde(rename = "OFFER_RECEIVED")]
    OfferReceived,
    #[serde(rename = "OFFER_DECLINED")]
    OfferDeclined,
}

impl Status {
    pub const ALL: [Status; 14] = [
        Status::Applied,
        Status::RecruiterContact,
        Status::OnlineAssessment,
        Status::CaseStudy,
        Status::InterviewRound1,
        Status::InterviewRound2,
        Status::InterviewRound3,
        Status::InterviewRound4,
        Status::InterviewRound5,
        Status::InterviewRound6,
        Status::InterviewRound7,
        Status::Rejected,
        Status::OfferReceived,
        Status::OfferDeclined,
    ];

    /// Wire name, as the model and the store spell it
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Applied => "APPLIED",
            Status::RecruiterContact => "IN_PROGRESS_RECRUITER_CONTACT",
            Status::OnlineAssessment => "IN_PROGRESS_ONLINE_ASSESMENT",
            Status::CaseStudy => "IN_PROGRESS_CASE_STUDY",
            Status::InterviewRound1 => "IN_PROGRESS_INTERVIEW_ROUND_1",
            Status::InterviewRound2 => "IN_PROGRESS_INTERVIEW_ROUND_2",
            Status::InterviewRound3 => "IN_PROGRESS_INTERVIEW_ROUND_3",
            Status::InterviewRound4 => "IN_PROGRESS_INTERVIEW_ROUND_4",
            Status::InterviewRound5 => "IN_PROGRESS_INTERVIEW_ROUND_5",
            Status::InterviewRound6 => "IN_PROGRESS_INTERVIEW_ROUND_6",
            Status::InterviewRound7 => "IN_PROGRESS_INTERVIEW_ROUND_7",
            Status::Rejected => "REJECTED",
            Status::OfferReceived => "OFFER_RECEIVED",
            Status::OfferDeclined => "OFFER_DECLINED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Company as named in a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedCompany {
    pub name: String,
    #[serde(default)]
    pub domain: Option<String>,
}

/// Recruiter or hiring manager named in a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedContact {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// One role per message, as returned by the extractor model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedRole {
    /// Id of the message the role was extracted from
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub requisition_number: Option<String>,
    pub status: Status,
    pub status_confidence: f64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub contacts: Vec<ExtractedContact>,
    pub company: ExtractedCompany,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub domain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contact {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub title: Option<String>,
    pub company: Company,
}

/// Persisted role
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: Uuid,
    pub title: String,
    pub requisition_number: Option<String>,
    pub status: Status,
    pub last_status: Option<Status>,
    /// 0 means the status could not be determined
    pub status_confidence: f64,
    pub contacts: Vec<Contact>,
    pub company: Company,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by_id: String,
}
