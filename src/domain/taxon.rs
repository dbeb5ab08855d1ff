use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::AppError;

/// The four admin-managed taxonomies. Each one is its own slug namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomyKind {
    JobCategories,
    CompanyCategories,
    CandidateCategories,
    Skills,
}

impl TaxonomyKind {
    pub const ALL: [TaxonomyKind; 4] = [
        TaxonomyKind::JobCategories,
        TaxonomyKind::CompanyCategories,
        TaxonomyKind::CandidateCategories,
        TaxonomyKind::Skills,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaxonomyKind::JobCategories => "job_categories",
            TaxonomyKind::CompanyCategories => "company_categories",
            TaxonomyKind::CandidateCategories => "candidate_categories",
            TaxonomyKind::Skills => "skills",
        }
    }

    /// Human label, used as the worksheet name on export.
    pub fn label(&self) -> &'static str {
        match self {
            TaxonomyKind::JobCategories => "Job Categories",
            TaxonomyKind::CompanyCategories => "Company Categories",
            TaxonomyKind::CandidateCategories => "Candidate Categories",
            TaxonomyKind::Skills => "Skills",
        }
    }

    pub fn flavor(&self) -> Flavor {
        match self {
            TaxonomyKind::JobCategories => Flavor::Hierarchical,
            _ => Flavor::Flat,
        }
    }
}

impl fmt::Display for TaxonomyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaxonomyKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        TaxonomyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| AppError::NotFound(format!("Unknown taxonomy '{}'", s)))
    }
}

/// Hierarchical taxa carry an icon and subcategories; flat taxa are name only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flavor {
    Hierarchical,
    Flat,
}

impl Flavor {
    pub fn is_hierarchical(&self) -> bool {
        matches!(self, Flavor::Hierarchical)
    }
}

/// Closed set of icon keys the admin UI knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Icon {
    #[default]
    Tag,
    Code,
    Palette,
    Briefcase,
    BarChart,
    Megaphone,
    Stethoscope,
    GraduationCap,
    Wrench,
    Truck,
    Camera,
    Music,
    ShoppingCart,
    Building,
    Scale,
    Calculator,
    PenTool,
    Database,
    Globe,
    Heart,
    Users,
    Shield,
    Cpu,
    Headphones,
    Utensils,
    Plane,
    Leaf,
    Hammer,
}

impl Icon {
    pub const ALL: &'static [Icon] = &[
        Icon::Tag,
        Icon::Code,
        Icon::Palette,
        Icon::Briefcase,
        Icon::BarChart,
        Icon::Megaphone,
        Icon::Stethoscope,
        Icon::GraduationCap,
        Icon::Wrench,
        Icon::Truck,
        Icon::Camera,
        Icon::Music,
        Icon::ShoppingCart,
        Icon::Building,
        Icon::Scale,
        Icon::Calculator,
        Icon::PenTool,
        Icon::Database,
        Icon::Globe,
        Icon::Heart,
        Icon::Users,
        Icon::Shield,
        Icon::Cpu,
        Icon::Headphones,
        Icon::Utensils,
        Icon::Plane,
        Icon::Leaf,
        Icon::Hammer,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Icon::Tag => "Tag",
            Icon::Code => "Code",
            Icon::Palette => "Palette",
            Icon::Briefcase => "Briefcase",
            Icon::BarChart => "BarChart",
            Icon::Megaphone => "Megaphone",
            Icon::Stethoscope => "Stethoscope",
            Icon::GraduationCap => "GraduationCap",
            Icon::Wrench => "Wrench",
            Icon::Truck => "Truck",
            Icon::Camera => "Camera",
            Icon::Music => "Music",
            Icon::ShoppingCart => "ShoppingCart",
            Icon::Building => "Building",
            Icon::Scale => "Scale",
            Icon::Calculator => "Calculator",
            Icon::PenTool => "PenTool",
            Icon::Database => "Database",
            Icon::Globe => "Globe",
            Icon::Heart => "Heart",
            Icon::Users => "Users",
            Icon::Shield => "Shield",
            Icon::Cpu => "Cpu",
            Icon::Headphones => "Headphones",
            Icon::Utensils => "Utensils",
            Icon::Plane => "Plane",
            Icon::Leaf => "Leaf",
            Icon::Hammer => "Hammer",
        }
    }

    /// Case-insensitive lookup; `None` for blank or unknown keys.
    pub fn from_key(raw: &str) -> Option<Icon> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Icon::ALL
            .iter()
            .copied()
            .find(|icon| icon.key().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxonId(pub String);

impl TaxonId {
    pub fn new_v4() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaxonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaxonId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Taxon {
    pub id: TaxonId,
    pub kind: TaxonomyKind,
    pub name: String,
    pub slug: String,
    /// Always `Some` for hierarchical taxa, `None` for flat ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    #[serde(default)]
    pub subcategories: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Taxon {
    pub fn effective_icon(&self) -> Icon {
        self.icon.unwrap_or_default()
    }
}

/// A taxon that has not been persisted yet; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTaxon {
    pub name: String,
    pub slug: String,
    pub icon: Option<Icon>,
    pub subcategories: Vec<String>,
}

/// In-place mutation of an existing taxon. `None` fields are left untouched;
/// `subcategories` replaces the whole list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxonPatch {
    pub icon: Option<Icon>,
    pub subcategories: Option<Vec<String>>,
}

impl TaxonPatch {
    pub fn is_empty(&self) -> bool {
        self.icon.is_none() && self.subcategories.is_none()
    }

    pub fn apply_to(&self, taxon: &mut Taxon) {
        if let Some(icon) = self.icon {
            taxon.icon = Some(icon);
        }
        if let Some(subcategories) = &self.subcategories {
            taxon.subcategories = subcategories.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_str_accepts_hyphens() {
        assert_eq!(
            "job-categories".parse::<TaxonomyKind>().unwrap(),
            TaxonomyKind::JobCategories
        );
        assert_eq!("Skills".parse::<TaxonomyKind>().unwrap(), TaxonomyKind::Skills);
        assert!("tags".parse::<TaxonomyKind>().is_err());
    }

    #[test]
    fn test_only_job_categories_are_hierarchical() {
        for kind in TaxonomyKind::ALL {
            assert_eq!(
                kind.flavor().is_hierarchical(),
                kind == TaxonomyKind::JobCategories
            );
        }
    }

    #[test]
    fn test_icon_lookup_is_case_insensitive() {
        assert_eq!(Icon::from_key(" code "), Some(Icon::Code));
        assert_eq!(Icon::from_key("BARCHART"), Some(Icon::BarChart));
        assert_eq!(Icon::from_key(""), None);
        assert_eq!(Icon::from_key("Spaceship"), None);
        assert_eq!(Icon::default(), Icon::Tag);
    }

    #[test]
    fn test_empty_patch() {
        assert!(TaxonPatch::default().is_empty());
        assert!(!TaxonPatch {
            icon: Some(Icon::Code),
            subcategories: None
        }
        .is_empty());
    }
}
