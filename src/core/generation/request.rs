use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

pub const MIN_FIELD_CHARS: usize = 10;
pub const MAX_FIELD_CHARS: usize = 2000;

static API_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bapis?\b").expect("api word regex"));

/// What the user typed into the Jump form, plus optional context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub goals: String,
    pub challenges: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, alias = "aiExperience", skip_serializing_if = "Option::is_none")]
    pub ai_experience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    #[serde(default, alias = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid generation request")]
pub struct ValidationError {
    pub details: Vec<FieldError>,
}

/// Validated request with every context field resolved. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedRequest {
    pub goals: String,
    pub challenges: String,
    pub industry: String,
    pub ai_experience: String,
    pub urgency: String,
    pub budget: String,
    pub user_id: Option<String>,
}

impl GenerationRequest {
    pub fn new(goals: impl Into<String>, challenges: impl Into<String>) -> Self {
        Self {
            goals: goals.into(),
            challenges: challenges.into(),
            ..Default::default()
        }
    }

    /// Check length bounds on the free-text fields and fill in any missing
    /// context by inference.
    pub fn validate(&self) -> Result<ValidatedRequest, ValidationError> {
        let goals = self.goals.trim();
        let challenges = self.challenges.trim();

        let mut details = Vec::new();
        check_length("goals", goals, &mut details);
        check_length("challenges", challenges, &mut details);
        if !details.is_empty() {
            return Err(ValidationError { details });
        }

        let text = format!("{goals} {challenges}").to_lowercase();
        let pick = |given: &Option<String>, infer: fn(&str) -> &'static str| {
            given
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| infer(&text).to_string())
        };

        Ok(ValidatedRequest {
            goals: goals.to_string(),
            challenges: challenges.to_string(),
            industry: pick(&self.industry, infer_industry),
            ai_experience: pick(&self.ai_experience, infer_experience),
            urgency: pick(&self.urgency, infer_urgency),
            budget: pick(&self.budget, infer_budget),
            user_id: self
                .user_id
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        })
    }
}

fn check_length(field: &'static str, value: &str, out: &mut Vec<FieldError>) {
    let chars = value.chars().count();
    if chars < MIN_FIELD_CHARS {
        out.push(FieldError {
            field,
            message: format!("{field} must be at least {MIN_FIELD_CHARS} characters"),
        });
    } else if chars > MAX_FIELD_CHARS {
        out.push(FieldError {
            field,
            message: format!("{field} must be at most {MAX_FIELD_CHARS} characters"),
        });
    }
}

const INDUSTRY_KEYWORDS: &[(&str, &[&str])] = &[
    ("Healthcare", &["health", "clinic", "patient", "medical", "hospital"]),
    ("Finance", &["finance", "bank", "accounting", "invest", "fintech"]),
    ("E-commerce", &["ecommerce", "e-commerce", "online store", "shopify", "retail"]),
    ("Education", &["school", "course", "student", "teach", "education"]),
    ("Marketing", &["marketing", "content", "agency", "brand", "seo", "social media"]),
    ("Real Estate", &["real estate", "property", "realtor", "listing"]),
    ("Technology", &["software", "saas", "app", "developer", "startup"]),
    ("Manufacturing", &["factory", "manufactur", "supply chain", "warehouse"]),
];

fn infer_industry(text: &str) -> &'static str {
    INDUSTRY_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| text.contains(w)))
        .map(|(name, _)| *name)
        .unwrap_or("General Business")
}

fn infer_experience(text: &str) -> &'static str {
    if ["no technical", "non-technical", "beginner", "never used", "new to ai"]
        .iter()
        .any(|w| text.contains(w))
    {
        "Beginner"
    } else if ["machine learning", "fine-tun", "automation", "python"]
        .iter()
        .any(|w| text.contains(w))
        || API_WORD.is_match(text)
    {
        "Advanced"
    } else {
        "Intermediate"
    }
}

fn infer_urgency(text: &str) -> &'static str {
    if ["asap", "urgent", "fast", "immediately", "this week", "quickly"]
        .iter()
        .any(|w| text.contains(w))
    {
        "High"
    } else if ["long term", "long-term", "eventually", "next year"]
        .iter()
        .any(|w| text.contains(w))
    {
        "Low"
    } else {
        "Medium"
    }
}

fn infer_budget(text: &str) -> &'static str {
    if ["limited budget", "low budget", "no budget", "cheap", "bootstrap", "tight budget"]
        .iter()
        .any(|w| text.contains(w))
    {
        "Low"
    } else if ["enterprise", "large budget", "well funded", "well-funded"]
        .iter()
        .any(|w| text.contains(w))
    {
        "High"
    } else {
        "Medium"
    }
}
