//! The fixed, ordered list of fields the form asks for.

use nyay_core::error::IntakeError;
use std::collections::HashSet;

/// Fields of the demonstration First Information Report, in interview order.
const FIR_FIELDS: [&str; 7] = [
    "Complainant's Name",
    "Father's/Husband's Name",
    "Complainant's Address",
    "Place of Occurrence",
    "Date and Time of Occurrence",
    "Details of the Incident (in brief)",
    "Name(s) of the accused (if known)",
];

/// An immutable, non-empty, duplicate-free sequence of field identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchedule {
    fields: Vec<String>,
}

impl FieldSchedule {
    pub fn new<I, S>(fields: I) -> Result<Self, IntakeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if fields.is_empty() {
            return Err(IntakeError::EmptySchedule);
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.as_str()) {
                return Err(IntakeError::DuplicateField(field.clone()));
            }
        }

        Ok(Self { fields })
    }

    /// The built-in FIR schedule.
    pub fn fir() -> Self {
        Self {
            fields: FIR_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// The schedule from `[intake] fields`, or the FIR schedule when unset.
    pub fn from_config(config: &nyay_config::IntakeConfig) -> Result<Self, IntakeError> {
        if config.fields.is_empty() {
            Ok(Self::fir())
        } else {
            Self::new(config.fields.iter().cloned())
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The field at `index`. The caller checks `index < len()`.
    pub fn field_at(&self, index: usize) -> &str {
        &self.fields[index]
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fir_schedule_order() {
        let schedule = FieldSchedule::fir();
        assert_eq!(schedule.len(), 7);
        assert_eq!(schedule.field_at(0), "Complainant's Name");
        assert_eq!(schedule.field_at(6), "Name(s) of the accused (if known)");
        assert!(schedule.get(7).is_none());
    }

    #[test]
    fn empty_schedule_rejected() {
        let err = FieldSchedule::new(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, IntakeError::EmptySchedule));
    }

    #[test]
    fn duplicate_field_rejected() {
        let err = FieldSchedule::new(["A", "B", "A"]).unwrap_err();
        assert!(matches!(err, IntakeError::DuplicateField(f) if f == "A"));
    }

    #[test]
    fn config_fields_override_builtin() {
        let config = nyay_config::IntakeConfig {
            fields: vec!["Name".into(), "Phone".into()],
            ..Default::default()
        };
        let schedule = FieldSchedule::from_config(&config).unwrap();
        assert_eq!(schedule.iter().collect::<Vec<_>>(), vec!["Name", "Phone"]);

        let default = FieldSchedule::from_config(&nyay_config::IntakeConfig::default()).unwrap();
        assert_eq!(default, FieldSchedule::fir());
    }
}
