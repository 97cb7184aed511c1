//! Conversation context
//!
//! One [`BuildingProjectContext`] exists per conversation. Tools in this
//! crate are the only writers of its fields; everything else reads through
//! getters. The single exception is [`BuildingProjectContext::ensure_inquiry_id`],
//! which handoff hooks use to guarantee an inquiry id.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Project types offered by ERNI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectType {
    /// Single-family house
    Einfamilienhaus,
    /// Multi-family house
    Mehrfamilienhaus,
    /// Agricultural building
    Agrar,
    /// Renovation of an existing building
    Renovation,
}

impl ProjectType {
    /// All variants in catalog order
    pub const ALL: [Self; 4] = [
        Self::Einfamilienhaus,
        Self::Mehrfamilienhaus,
        Self::Agrar,
        Self::Renovation,
    ];

    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Einfamilienhaus => "Einfamilienhaus",
            Self::Mehrfamilienhaus => "Mehrfamilienhaus",
            Self::Agrar => "Agrar",
            Self::Renovation => "Renovation",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| s.to_string())
    }
}

/// Construction methods offered by ERNI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstructionType {
    /// Timber construction
    Holzbau,
    /// System construction
    Systembau,
}

impl ConstructionType {
    /// All variants in catalog order
    pub const ALL: [Self; 2] = [Self::Holzbau, Self::Systembau];

    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Holzbau => "Holzbau",
            Self::Systembau => "Systembau",
        }
    }
}

impl fmt::Display for ConstructionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConstructionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| s.to_string())
    }
}

/// Facts collected about one customer interaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildingProjectContext {
    customer_name: Option<String>,
    customer_email: Option<String>,
    customer_phone: Option<String>,
    project_number: Option<String>,
    project_type: Option<String>,
    construction_type: Option<String>,
    area_sqm: Option<f64>,
    location: Option<String>,
    budget_chf: Option<f64>,
    preferred_start_date: Option<String>,
    #[serde(default)]
    consultation_booked: bool,
    specialist_assigned: Option<String>,
    inquiry_id: Option<String>,
}

/// Generate an inquiry id of the form `INQ-12345`
#[must_use]
pub fn generate_inquiry_id() -> String {
    format!("INQ-{}", rand::thread_rng().gen_range(10000..=99999))
}

impl BuildingProjectContext {
    /// Create a context for a new conversation with a fresh inquiry id
    #[must_use]
    pub fn new() -> Self {
        Self {
            inquiry_id: Some(generate_inquiry_id()),
            ..Default::default()
        }
    }

    /// Assign an inquiry id if none is set. Never overwrites an existing one.
    ///
    /// Returns `true` when an id was assigned.
    pub fn ensure_inquiry_id(&mut self) -> bool {
        if self.inquiry_id.is_some() {
            return false;
        }
        self.inquiry_id = Some(generate_inquiry_id());
        true
    }

    /// Customer's full name
    #[must_use]
    pub fn customer_name(&self) -> Option<&str> {
        self.customer_name.as_deref()
    }

    /// Customer's email address
    #[must_use]
    pub fn customer_email(&self) -> Option<&str> {
        self.customer_email.as_deref()
    }

    /// Customer's phone number
    #[must_use]
    pub fn customer_phone(&self) -> Option<&str> {
        self.customer_phone.as_deref()
    }

    /// Project number the customer asked about
    #[must_use]
    pub fn project_number(&self) -> Option<&str> {
        self.project_number.as_deref()
    }

    /// Project type of the last estimate
    #[must_use]
    pub fn project_type(&self) -> Option<&str> {
        self.project_type.as_deref()
    }

    /// Construction type of the last estimate
    #[must_use]
    pub fn construction_type(&self) -> Option<&str> {
        self.construction_type.as_deref()
    }

    /// Area in square meters
    #[must_use]
    pub fn area_sqm(&self) -> Option<f64> {
        self.area_sqm
    }

    /// Building location
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Estimated budget in CHF
    #[must_use]
    pub fn budget_chf(&self) -> Option<f64> {
        self.budget_chf
    }

    /// Preferred construction start date
    #[must_use]
    pub fn preferred_start_date(&self) -> Option<&str> {
        self.preferred_start_date.as_deref()
    }

    /// Whether a consultation has been booked
    #[must_use]
    pub fn consultation_booked(&self) -> bool {
        self.consultation_booked
    }

    /// Specialist type assigned to the consultation
    #[must_use]
    pub fn specialist_assigned(&self) -> Option<&str> {
        self.specialist_assigned.as_deref()
    }

    /// Inquiry identifier
    #[must_use]
    pub fn inquiry_id(&self) -> Option<&str> {
        self.inquiry_id.as_deref()
    }

    pub(crate) fn record_estimate(
        &mut self,
        project_type: ProjectType,
        construction_type: ConstructionType,
        area_sqm: f64,
        budget_chf: f64,
    ) {
        self.project_type = Some(project_type.as_str().to_string());
        self.construction_type = Some(construction_type.as_str().to_string());
        self.area_sqm = Some(area_sqm);
        self.budget_chf = Some(budget_chf);
    }

    pub(crate) fn record_booking(
        &mut self,
        name: &str,
        email: &str,
        phone: &str,
        specialist: &str,
    ) {
        self.customer_name = Some(name.to_string());
        self.customer_email = Some(email.to_string());
        self.customer_phone = Some(phone.to_string());
        self.consultation_booked = true;
        self.specialist_assigned = Some(specialist.to_string());
    }

    pub(crate) fn set_project_number(&mut self, number: &str) {
        self.project_number = Some(number.to_string());
    }

    pub(crate) fn set_location(&mut self, location: &str) {
        self.location = Some(location.to_string());
    }

    pub(crate) fn set_preferred_start_date(&mut self, date: &str) {
        self.preferred_start_date = Some(date.to_string());
    }

    /// Flat field map, used for API responses
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Fields whose value differs from `before`, in declaration order
    #[must_use]
    pub fn diff(&self, before: &Self) -> Vec<(String, Value)> {
        let old = before.to_map();
        self.to_map()
            .into_iter()
            .filter(|(key, value)| old.get(key) != Some(value))
            .collect()
    }
}
