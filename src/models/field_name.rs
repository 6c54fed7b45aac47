//! Identifiers of the syllabus fields the engine reports.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// One detectable syllabus field.
///
/// Serializes (JSON, YAML, TOML keys) and parses (`--fields`) as the
/// snake_case name, e.g. `class_location`.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldName {
    Slos,
    Instructor,
    GradingScale,
    Modality,
    OfficeLocation,
    OfficeHours,
    OfficePhone,
    Email,
    PreferredContact,
    LatePolicy,
    CreditHours,
    Workload,
    AssignmentDelivery,
    AssignmentTypes,
    GradingProcess,
    ResponseTime,
    ClassLocation,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_field_name_round_trips_through_string() {
        for field in FieldName::iter() {
            assert_eq!(FieldName::from_str(field.as_ref()).unwrap(), field);
        }
        assert_eq!(FieldName::ClassLocation.to_string(), "class_location");
        assert_eq!(FieldName::Slos.as_ref(), "slos");
    }

    #[test]
    fn test_field_name_serde_matches_strum() {
        let json = serde_json::to_string(&FieldName::GradingProcess).unwrap();
        assert_eq!(json, "\"grading_process\"");
        assert!(FieldName::from_str("not_a_field").is_err());
    }
}
