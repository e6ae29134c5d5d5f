//! Schema validation of a decoded profile body.

use crate::model::FieldMap;
use crate::schema::SchemaRegistry;

/// Outcome of checking a [`FieldMap`] against the schema.
///
/// Transient: produced by the repairer or the store, consumed immediately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// Fields that are missing or hold a value their kind rejects, in schema order
    pub invalid: Vec<String>,
    /// The subset of `invalid` whose schema entry is not repairable
    pub unrepairable: Vec<String>,
}

impl ValidationResult {
    pub fn is_sound(&self) -> bool {
        self.invalid.is_empty()
    }

    pub fn is_salvageable(&self) -> bool {
        self.unrepairable.is_empty()
    }
}

/// Check every schema field of `data`. Fields not in the schema are ignored.
pub fn validate(data: &FieldMap, schema: &dyn SchemaRegistry) -> ValidationResult {
    let mut result = ValidationResult::default();
    for spec in schema.fields() {
        let ok = data.get(spec.id).is_some_and(|value| spec.accepts(value));
        if !ok {
            result.invalid.push(spec.id.to_string());
            if !spec.repairable {
                result.unrepairable.push(spec.id.to_string());
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MappedExecutable;
    use crate::schema::{FieldValue, ProfileSchema};

    #[test]
    fn defaults_are_sound() {
        let data = FieldMap::defaults(&ProfileSchema);
        let result = validate(&data, &ProfileSchema);
        assert!(result.is_sound());
        assert!(result.is_salvageable());
    }

    #[test]
    fn missing_field_is_invalid() {
        let mut data = FieldMap::defaults(&ProfileSchema);
        data.remove("screenStat");
        let result = validate(&data, &ProfileSchema);
        assert_eq!(result.invalid, vec!["screenStat"]);
        assert!(result.is_salvageable());
    }

    #[test]
    fn out_of_range_value_is_invalid() {
        let mut data = FieldMap::defaults(&ProfileSchema);
        data.insert("fontSize", FieldValue::Integer(5000));
        let result = validate(&data, &ProfileSchema);
        assert_eq!(result.invalid, vec!["fontSize"]);
    }

    #[test]
    fn wrong_shape_is_invalid() {
        let mut data = FieldMap::defaults(&ProfileSchema);
        data.insert("hourlyChimes", FieldValue::text("1"));
        let result = validate(&data, &ProfileSchema);
        assert_eq!(result.invalid, vec!["hourlyChimes"]);
    }

    #[test]
    fn non_repairable_fields_are_reported_separately() {
        let mut data = FieldMap::defaults(&ProfileSchema);
        data.remove("username");
        data.insert("fontSize", FieldValue::Integer(-1));
        let result = validate(&data, &ProfileSchema);
        assert_eq!(result.invalid, vec!["username", "fontSize"]);
        assert_eq!(result.unrepairable, vec!["username"]);
        assert!(!result.is_salvageable());
    }

    #[test]
    fn duplicate_executables_are_invalid() {
        let exe = MappedExecutable::new("notes", "/bin/notes");
        let mut data = FieldMap::defaults(&ProfileSchema);
        data.insert("mappedExecutables", FieldValue::Executables(vec![exe.clone(), exe]));
        let result = validate(&data, &ProfileSchema);
        assert_eq!(result.invalid, vec!["mappedExecutables"]);
    }

    #[test]
    fn unknown_extra_fields_are_ignored() {
        let mut data = FieldMap::defaults(&ProfileSchema);
        data.insert("legacyField", FieldValue::Flag(true));
        assert!(validate(&data, &ProfileSchema).is_sound());
    }
}
