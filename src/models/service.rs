use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub provider_id: String,
    pub name: String,
    pub description: String,
    pub category: ServiceCategory,
    /// Informational; slot generation always steps by one hour.
    pub duration_minutes: i32,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceCategory {
    Therapy,
    Fitness,
    Education,
    Wellness,
    Professional,
    Creative,
    Other,
}

impl ServiceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Therapy => "therapy",
            ServiceCategory::Fitness => "fitness",
            ServiceCategory::Education => "education",
            ServiceCategory::Wellness => "wellness",
            ServiceCategory::Professional => "professional",
            ServiceCategory::Creative => "creative",
            ServiceCategory::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "therapy" => ServiceCategory::Therapy,
            "fitness" => ServiceCategory::Fitness,
            "education" => ServiceCategory::Education,
            "wellness" => ServiceCategory::Wellness,
            "professional" => ServiceCategory::Professional,
            "creative" => ServiceCategory::Creative,
            _ => ServiceCategory::Other,
        }
    }
}
