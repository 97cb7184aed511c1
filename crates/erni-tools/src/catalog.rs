//! Catalog - Business data behind the domain tools
//!
//! Ships with built-in pricing, specialists, consultation slots and sample
//! projects. A JSON file can override any of the four sections; sections it
//! leaves out keep their defaults.

use crate::context::{ConstructionType, ProjectType};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Office address used in availability and booking replies
pub const OFFICE_ADDRESS: &str = "ERNI Gruppe, Guggibadstrasse 8, 6288 Schongau";

/// Public phone number
pub const OFFICE_PHONE: &str = "041 570 70 70";

/// Named specialists of one type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialistGroup {
    /// Specialist names
    pub names: Vec<String>,
}

/// A building project known to the status lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Project type label
    #[serde(rename = "type")]
    pub project_type: String,
    /// Building site
    pub location: String,
    /// Current stage
    pub stage: String,
    /// Progress in percent
    pub progress: u8,
    /// Next milestone
    pub next_milestone: String,
    /// Project manager
    pub responsible: String,
}

/// Business data used by the built-in tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// CHF per m², keyed by project type then construction type
    pub pricing: HashMap<String, HashMap<String, u32>>,
    /// Specialists keyed by specialist type
    pub specialists: HashMap<String, SpecialistGroup>,
    /// Consultation time slots
    pub time_slots: Vec<String>,
    /// Projects keyed by project number
    pub projects: HashMap<String, ProjectRecord>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    pricing: Option<HashMap<String, HashMap<String, u32>>>,
    specialists: Option<HashMap<String, SpecialistGroup>>,
    time_slots: Option<Vec<String>>,
    projects: Option<HashMap<String, ProjectRecord>>,
}

fn group(names: &[&str]) -> SpecialistGroup {
    SpecialistGroup {
        names: names.iter().map(|n| (*n).to_string()).collect(),
    }
}

fn project(
    project_type: ProjectType,
    location: &str,
    stage: &str,
    progress: u8,
    next_milestone: &str,
    responsible: &str,
) -> ProjectRecord {
    ProjectRecord {
        project_type: project_type.as_str().to_string(),
        location: location.to_string(),
        stage: stage.to_string(),
        progress,
        next_milestone: next_milestone.to_string(),
        responsible: responsible.to_string(),
    }
}

impl Default for Catalog {
    fn default() -> Self {
        let price_table = [
            (ProjectType::Einfamilienhaus, 3000, 2500),
            (ProjectType::Mehrfamilienhaus, 2800, 2300),
            (ProjectType::Agrar, 2000, 1800),
            (ProjectType::Renovation, 1500, 1200),
        ];
        let pricing = price_table
            .into_iter()
            .map(|(project_type, holzbau, systembau)| {
                let prices = HashMap::from([
                    (ConstructionType::Holzbau.as_str().to_string(), holzbau),
                    (ConstructionType::Systembau.as_str().to_string(), systembau),
                ]);
                (project_type.as_str().to_string(), prices)
            })
            .collect();

        let specialists = HashMap::from([
            ("Architekt".to_string(), group(&["André Arnold", "Stefan Gisler"])),
            (
                "Holzbau-Ingenieur".to_string(),
                group(&["Andreas Wermelinger", "Tobias Wili"]),
            ),
            ("Bauleiter".to_string(), group(&["Wolfgang Reinsch", "Marco Kaiser"])),
            ("Planner".to_string(), group(&["André Arnold", "Stefan Gisler"])),
            ("Engineer".to_string(), group(&["Andreas Wermelinger", "Tobias Wili"])),
        ]);

        let projects = HashMap::from([
            (
                "2024-156".to_string(),
                project(
                    ProjectType::Einfamilienhaus,
                    "Muri",
                    "Production",
                    75,
                    "Assembly 15-19 May 2025",
                    "Tobias Wili",
                ),
            ),
            (
                "2024-089".to_string(),
                project(
                    ProjectType::Mehrfamilienhaus,
                    "Schongau",
                    "Planning",
                    40,
                    "Building permit submission 10 June 2025",
                    "André Arnold",
                ),
            ),
            (
                "2023-234".to_string(),
                project(
                    ProjectType::Agrar,
                    "Hochdorf",
                    "Completed",
                    100,
                    "Final inspection completed",
                    "Stefan Gisler",
                ),
            ),
        ]);

        Self {
            pricing,
            specialists,
            time_slots: vec![
                "09:00-10:00".to_string(),
                "14:00-15:00".to_string(),
                "16:00-17:00".to_string(),
            ],
            projects,
        }
    }
}

impl Catalog {
    /// Load overrides from a JSON file on top of the built-in data
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid catalog JSON
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&raw)?;
        info!(path = %path.display(), projects = catalog.projects.len(), "Loaded catalog");
        Ok(catalog)
    }

    /// Parse overrides from a JSON string on top of the built-in data
    ///
    /// # Errors
    /// Returns an error if the text is not valid catalog JSON
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let file: CatalogFile =
            serde_json::from_str(raw).map_err(|e| Error::Catalog(e.to_string()))?;
        let mut catalog = Self::default();
        if let Some(pricing) = file.pricing {
            catalog.pricing = pricing;
        }
        if let Some(specialists) = file.specialists {
            catalog.specialists = specialists;
        }
        if let Some(time_slots) = file.time_slots {
            catalog.time_slots = time_slots;
        }
        if let Some(projects) = file.projects {
            catalog.projects = projects;
        }
        Ok(catalog)
    }

    /// Price per m² in CHF
    #[must_use]
    pub fn price_per_sqm(
        &self,
        project_type: ProjectType,
        construction_type: ConstructionType,
    ) -> Option<u32> {
        self.pricing
            .get(project_type.as_str())?
            .get(construction_type.as_str())
            .copied()
    }

    /// Specialist names for a type, falling back to a generic entry
    #[must_use]
    pub fn specialists_for(&self, specialist_type: &str) -> Vec<String> {
        self.specialists
            .get(specialist_type)
            .filter(|g| !g.names.is_empty())
            .map(|g| g.names.clone())
            .unwrap_or_else(|| vec!["Specialist".to_string()])
    }

    /// Look up a project by number
    #[must_use]
    pub fn project(&self, number: &str) -> Option<&ProjectRecord> {
        self.projects.get(number.trim())
    }
}
