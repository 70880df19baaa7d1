use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Returned when there is nothing to rank against.
pub const FALLBACK_SPECIALTY: &str = "General Physician";

const DEFAULT_SPECIALTIES: [(&str, &str); 12] = [
    (
        "Cardiologist",
        "Heart specialist who treats chest pain, breathing issues, heart disease, chest tightness, and heart-related problems.",
    ),
    (
        "Pulmonologist",
        "Lung specialist who treats breathing problems, asthma, chest congestion, lung infections, and respiratory issues.",
    ),
    (
        "Dermatologist",
        "Skin and hair specialist for acne, rashes, itching, allergies, infections, and hair fall problems.",
    ),
    (
        "Gastroenterologist",
        "Stomach and digestive specialist who treats stomach pain, gas, acidity, vomiting, indigestion, and abdominal problems.",
    ),
    (
        "Neurologist",
        "Brain and nerve specialist who treats headaches, migraines, seizures, dizziness, nerve pain, and neurological disorders.",
    ),
    (
        "Psychiatrist",
        "Mental health doctor who treats anxiety, depression, stress, sadness, fear, and emotional disorders.",
    ),
    (
        "Orthopedic Surgeon",
        "Bone and joint specialist who treats back pain, knee pain, fractures, bone injuries, and joint problems.",
    ),
    (
        "General Physician",
        "General doctor for fever, cold, cough, fatigue, viral infections, weakness, and routine health checkups.",
    ),
    (
        "Pediatrician",
        "Specialist doctor for infants, children, and adolescents health and medical care.",
    ),
    (
        "Gynecologist",
        "Specialist in female reproductive health, pregnancy, and childbirth.",
    ),
    (
        "Endocrinologist",
        "Specialist in hormone-related conditions, diabetes, and thyroid problems.",
    ),
    (
        "Ophthalmologist",
        "Eye specialist for vision problems, cataract, and eye diseases.",
    ),
];

/// A medical specialty and the prose used to embed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specialty {
    pub name: String,
    pub description: String,
}

impl Specialty {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Ordered, immutable list of specialties.
///
/// Order matters: when two specialties score the same the earlier one wins.
/// Names are unique and non-blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialtyCatalog {
    specialties: Vec<Specialty>,
}

impl Default for SpecialtyCatalog {
    fn default() -> Self {
        Self {
            specialties: DEFAULT_SPECIALTIES
                .iter()
                .map(|(name, description)| Specialty::new(*name, *description))
                .collect(),
        }
    }
}

impl SpecialtyCatalog {
    /// Builds a custom catalog. An empty list is accepted; ranking against it
    /// yields [`FALLBACK_SPECIALTY`].
    pub fn new(specialties: Vec<Specialty>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(specialties.len());
        for (position, specialty) in specialties.iter().enumerate() {
            if specialty.name.trim().is_empty() {
                return Err(CatalogError::BlankName(position));
            }
            if specialty.description.trim().is_empty() {
                return Err(CatalogError::BlankDescription(specialty.name.clone()));
            }
            if !seen.insert(specialty.name.as_str()) {
                return Err(CatalogError::DuplicateName(specialty.name.clone()));
            }
        }
        Ok(Self { specialties })
    }

    /// Parses a JSON array of `{"name": ..., "description": ...}` objects.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let specialties: Vec<Specialty> =
            serde_json::from_str(json).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::new(specialties)
    }

    pub fn specialties(&self) -> &[Specialty] {
        &self.specialties
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Specialty> {
        self.specialties.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specialties.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.specialties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specialties.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names().any(|n| n == name)
    }
}

impl<'a> IntoIterator for &'a SpecialtyCatalog {
    type Item = &'a Specialty;
    type IntoIter = std::slice::Iter<'a, Specialty>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_order_and_size() {
        let catalog = SpecialtyCatalog::default();
        assert_eq!(catalog.len(), 12);
        let names: Vec<&str> = catalog.names().collect();
        assert_eq!(names.first(), Some(&"Cardiologist"));
        assert_eq!(names.last(), Some(&"Ophthalmologist"));
        assert_eq!(names[7], FALLBACK_SPECIALTY);
    }

    #[test]
    fn default_catalog_passes_validation() {
        let catalog = SpecialtyCatalog::default();
        let rebuilt = SpecialtyCatalog::new(catalog.specialties().to_vec()).unwrap();
        assert_eq!(rebuilt, catalog);
    }

    #[test]
    fn rejects_duplicates_and_blanks() {
        let dup = SpecialtyCatalog::new(vec![
            Specialty::new("A", "first"),
            Specialty::new("A", "again"),
        ]);
        assert_eq!(dup, Err(CatalogError::DuplicateName("A".into())));

        let blank = SpecialtyCatalog::new(vec![Specialty::new("A", "x"), Specialty::new("  ", "y")]);
        assert_eq!(blank, Err(CatalogError::BlankName(1)));

        let no_desc = SpecialtyCatalog::new(vec![Specialty::new("A", "")]);
        assert_eq!(no_desc, Err(CatalogError::BlankDescription("A".into())));
    }

    #[test]
    fn empty_catalog_is_allowed() {
        assert!(SpecialtyCatalog::new(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn parses_json_catalog() {
        let catalog = SpecialtyCatalog::from_json(
            r#"[{"name":"Dentist","description":"Teeth and gums"},{"name":"Allergist","description":"Allergies"}]"#,
        )
        .unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains("Allergist"));
        assert!(matches!(
            SpecialtyCatalog::from_json("{}"),
            Err(CatalogError::Parse(_))
        ));
    }
}
