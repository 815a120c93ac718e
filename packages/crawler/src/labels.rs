//! Slovenian spec-table labels mapped to canonical field names.
//!
//! The mapping is data, not code: new label variants observed on the site
//! are added to the table below. Lookup tries an exact match first, then
//! substring containment, then the year heuristic (any label carrying a
//! standalone 4-digit token refers to the first-registration year).

use crate::types::SpecField;

/// Known label fragments, lowercase, ordered. Earlier entries win on
/// substring lookup.
static LABELS: &[(&str, SpecField)] = &[
    ("znamka", SpecField::Make),
    ("model", SpecField::Model),
    ("letnik", SpecField::Year),
    ("registracija", SpecField::Year),
    ("prevoženi", SpecField::Mileage),
    ("prevozeni", SpecField::Mileage),
    ("kilometr", SpecField::Mileage),
    ("gorivo", SpecField::FuelType),
    ("menjalnik", SpecField::Transmission),
    ("motor", SpecField::Engine),
    ("oblika", SpecField::BodyType),
    ("karoserija", SpecField::BodyType),
    ("vrat", SpecField::Doors),
    ("barva", SpecField::Color),
    ("vin", SpecField::Vin),
    ("šasije", SpecField::Vin),
    ("emisij", SpecField::EmissionClass),
];

/// Normalize a raw label cell: trimmed, lowercased, trailing colon removed.
fn normalize(label: &str) -> String {
    label.trim().trim_end_matches(':').trim().to_lowercase()
}

/// Map a raw Slovenian label to its canonical field, or `None` when the
/// label is unknown (unknown labels are ignored, not stored).
pub fn canonical_field(label: &str) -> Option<SpecField> {
    let label = normalize(label);
    if label.is_empty() {
        return None;
    }

    if let Some((_, field)) = LABELS.iter().find(|(key, _)| *key == label) {
        return Some(*field);
    }
    if let Some((_, field)) = LABELS.iter().find(|(key, _)| label.contains(key)) {
        return Some(*field);
    }

    // Labels like "1.registracija 2019" show up with the year embedded.
    if has_four_digit_token(&label) {
        return Some(SpecField::Year);
    }

    None
}

fn has_four_digit_token(label: &str) -> bool {
    label
        .split(|c: char| !c.is_ascii_digit())
        .any(|token| token.len() == 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        assert_eq!(canonical_field("Gorivo"), Some(SpecField::FuelType));
        assert_eq!(canonical_field("Menjalnik:"), Some(SpecField::Transmission));
    }

    #[test]
    fn substring_match() {
        assert_eq!(canonical_field("1.registracija"), Some(SpecField::Year));
        assert_eq!(canonical_field("Prevoženi km"), Some(SpecField::Mileage));
        assert_eq!(
            canonical_field("Številka šasije (VIN)"),
            Some(SpecField::Vin)
        );
        assert_eq!(
            canonical_field("Emisijski razred"),
            Some(SpecField::EmissionClass)
        );
    }

    #[test]
    fn four_digit_token_maps_to_year() {
        assert_eq!(canonical_field("2019"), Some(SpecField::Year));
        assert_eq!(canonical_field("reg. 2021"), Some(SpecField::Year));
    }

    #[test]
    fn unknown_labels_are_ignored() {
        assert_eq!(canonical_field("Garancija"), None);
        assert_eq!(canonical_field(""), None);
        assert_eq!(canonical_field("   "), None);
    }
}
