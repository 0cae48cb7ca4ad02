//! Records returned by the admin listings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub source: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    Positive,
    Negative,
    Neutral,
    Initial,
}

impl FeedbackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackType::Positive => "positive",
            FeedbackType::Negative => "negative",
            FeedbackType::Neutral => "neutral",
            FeedbackType::Initial => "initial",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "positive" => Some(FeedbackType::Positive),
            "negative" => Some(FeedbackType::Negative),
            "neutral" => Some(FeedbackType::Neutral),
            "initial" => Some(FeedbackType::Initial),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: String,
    pub map_id: Option<String>,
    pub session_id: Option<String>,
    pub feedback_type: FeedbackType,
    pub rating: u8,
    pub comment: Option<String>,
    pub email: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Low => "LOW",
            ErrorSeverity::Medium => "MEDIUM",
            ErrorSeverity::High => "HIGH",
            ErrorSeverity::Critical => "CRITICAL",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "LOW" => Some(ErrorSeverity::Low),
            "MEDIUM" => Some(ErrorSeverity::Medium),
            "HIGH" => Some(ErrorSeverity::High),
            "CRITICAL" => Some(ErrorSeverity::Critical),
            _ => None,
        }
    }
}

/// A reported failure, shown in the admin log view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub id: String,
    pub session_id: Option<String>,
    pub category: String,
    pub severity: ErrorSeverity,
    pub message: String,
    pub metadata: Option<String>,
    pub created_at: String,
}
