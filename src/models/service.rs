use serde::{Deserialize, Serialize};

/// A catalog entry. The catalog is seeded once at startup and read-only
/// from the booking engine's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: String,
    pub service_type: ServiceType,
    pub icon: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Hourly,
    Project,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Hourly => "hourly",
            ServiceType::Project => "project",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "hourly" => ServiceType::Hourly,
            _ => ServiceType::Project,
        }
    }
}
