//! # Profile Repair
//!
//! The repairer takes the text of a stored profile and tries to turn it into a profile
//! every schema field accepts, without asking anyone.
//!
//! ## State Machine
//!
//! ```text
//!            decode ok                 all fields accepted
//!   text ──────────────► Checking ───────────────────────────► Repaired
//!     │                   │    ▲
//!     │ decode fails      │    │ substituted
//!     ▼                   ▼    │
//!  Unrepairable ◄──── Repairing ── budget spent ──► Exhausted
//!             invalid field
//!             is not repairable
//! ```
//!
//! - **Checking** validates every schema field against its kind.
//! - **Repairing** walks the invalid fields in schema order. A field marked non-repairable
//!   stops the machine at once; anything else is substituted.
//! - The Checking → Repairing cycle runs at most `max_attempts` times. Callers treat
//!   `Exhausted` the same as `Unrepairable`.
//!
//! ## Substitution Rules
//!
//! | Field kind | Invalid value | Replacement |
//! |------------|---------------|-------------|
//! | `Executables` | list with duplicates/blanks | same list, first occurrence kept, blanks dropped |
//! | `Executables` | not a list, or missing | empty list |
//! | `Geometry` | missing or malformed | default geometry |
//! | anything else | missing, wrong shape, out of range | schema default |

use tracing::debug;

use crate::codec::Codec;
use crate::model::{FieldMap, MappedExecutable};
use crate::schema::{FieldKind, FieldSpec, FieldValue, SchemaRegistry};
use crate::validate::{validate, ValidationResult};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairState {
    Checking,
    Repairing,
    /// Every field is acceptable; the profile may have been changed on the way
    Repaired,
    /// Fields were still invalid after the attempt budget was spent
    Exhausted,
    /// The text did not decode, or a non-repairable field was invalid
    Unrepairable,
}

impl RepairState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RepairState::Repaired | RepairState::Exhausted | RepairState::Unrepairable
        )
    }
}

/// Result of running the repairer over one profile.
#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub state: RepairState,
    /// The repaired body. Only present in the `Repaired` state.
    pub data: Option<FieldMap>,
    /// Fields that were substituted, in the order they were first touched
    pub repaired: Vec<String>,
    /// Completed Repairing passes
    pub attempts: u32,
    /// The last validation performed
    pub last_check: ValidationResult,
    /// Why the machine stopped, for anything but `Repaired`
    pub reason: Option<String>,
}

impl RepairOutcome {
    pub fn is_repaired(&self) -> bool {
        self.state == RepairState::Repaired
    }

    /// True if the repaired body differs from what was decoded.
    pub fn changed(&self) -> bool {
        !self.repaired.is_empty()
    }

    fn failed(state: RepairState, reason: String, attempts: u32, last_check: ValidationResult) -> Self {
        Self {
            state,
            data: None,
            repaired: Vec::new(),
            attempts,
            last_check,
            reason: Some(reason),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Repairer {
    max_attempts: u32,
}

impl Default for Repairer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl Repairer {
    /// A budget of zero is raised to one so a sound profile can still be accepted.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Validate without changing anything.
    pub fn check(&self, data: &FieldMap, schema: &dyn SchemaRegistry) -> ValidationResult {
        validate(data, schema)
    }

    /// Decode `text` and repair the result.
    pub fn run(&self, text: &str, codec: &dyn Codec, schema: &dyn SchemaRegistry) -> RepairOutcome {
        match codec.decode(text) {
            Ok(data) => self.repair(data, schema),
            Err(e) => RepairOutcome::failed(
                RepairState::Unrepairable,
                e.to_string(),
                0,
                ValidationResult::default(),
            ),
        }
    }

    /// Repair an already decoded body.
    pub fn repair(&self, mut data: FieldMap, schema: &dyn SchemaRegistry) -> RepairOutcome {
        let mut state = RepairState::Checking;
        let mut attempts = 0;
        let mut repaired: Vec<String> = Vec::new();
        let mut last_check = ValidationResult::default();

        while !state.is_terminal() {
            state = match state {
                RepairState::Checking => {
                    last_check = validate(&data, schema);
                    if last_check.is_sound() {
                        RepairState::Repaired
                    } else if attempts >= self.max_attempts {
                        RepairState::Exhausted
                    } else {
                        RepairState::Repairing
                    }
                }
                RepairState::Repairing => {
                    attempts += 1;
                    match self.substitute_all(&mut data, &last_check, schema, &mut repaired) {
                        Ok(()) => RepairState::Checking,
                        Err(field) => {
                            let reason = format!("field {} is invalid and not repairable", field);
                            return RepairOutcome::failed(
                                RepairState::Unrepairable,
                                reason,
                                attempts,
                                last_check,
                            );
                        }
                    }
                }
                terminal => terminal,
            };
        }

        if state == RepairState::Exhausted {
            let reason = format!(
                "still invalid after {} attempts: {}",
                attempts,
                last_check.invalid.join(", ")
            );
            return RepairOutcome::failed(state, reason, attempts, last_check);
        }

        RepairOutcome {
            state,
            data: Some(data),
            repaired,
            attempts,
            last_check,
            reason: None,
        }
    }

    /// One Repairing pass. Returns the id of the first non-repairable invalid field.
    fn substitute_all(
        &self,
        data: &mut FieldMap,
        check: &ValidationResult,
        schema: &dyn SchemaRegistry,
        repaired: &mut Vec<String>,
    ) -> std::result::Result<(), String> {
        for id in &check.invalid {
            let Some(spec) = schema.get(id) else {
                continue;
            };
            if !spec.repairable {
                return Err(id.clone());
            }
            let replacement = substitute(spec, data.get(id));
            debug!(
                field = spec.id,
                found = data.get(id).map_or("missing", FieldValue::shape),
                "substituting invalid field"
            );
            data.insert(id.clone(), replacement);
            if !repaired.contains(id) {
                repaired.push(id.clone());
            }
        }
        Ok(())
    }
}

fn substitute(spec: &FieldSpec, current: Option<&FieldValue>) -> FieldValue {
    match (spec.kind, current) {
        (FieldKind::Executables, Some(FieldValue::Executables(list))) => {
            FieldValue::Executables(clean_executables(list))
        }
        _ => spec.default.to_value(),
    }
}

/// Drop blank entries and later duplicates, keeping the original order.
fn clean_executables(list: &[MappedExecutable]) -> Vec<MappedExecutable> {
    let mut kept: Vec<MappedExecutable> = Vec::with_capacity(list.len());
    for exe in list {
        if !exe.is_blank() && !kept.contains(exe) {
            kept.push(exe.clone());
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::model::ScreenStat;
    use crate::schema::{DefaultValue, ProfileSchema};

    fn defaults() -> FieldMap {
        FieldMap::defaults(&ProfileSchema)
    }

    #[test]
    fn test_sound_profile_is_repaired_without_changes() {
        let outcome = Repairer::default().repair(defaults(), &ProfileSchema);
        assert_eq!(outcome.state, RepairState::Repaired);
        assert!(!outcome.changed());
        assert_eq!(outcome.attempts, 0);
        assert_eq!(outcome.data.unwrap(), defaults());
    }

    #[test]
    fn test_out_of_range_and_missing_fields_get_defaults() {
        let mut data = defaults();
        data.insert("fontSize", FieldValue::Integer(5000));
        data.remove("screenStat");

        let outcome = Repairer::default().repair(data, &ProfileSchema);
        assert!(outcome.is_repaired());
        assert_eq!(outcome.repaired, vec!["fontSize", "screenStat"]);

        let data = outcome.data.unwrap();
        assert_eq!(data.get("fontSize"), Some(&FieldValue::Integer(30)));
        assert_eq!(
            data.get("screenStat"),
            Some(&FieldValue::Geometry(ScreenStat::default()))
        );
    }

    #[test]
    fn test_executables_are_deduplicated_first_wins() {
        let a = MappedExecutable::new("a", "/bin/a");
        let b = MappedExecutable::new("b", "/bin/b");
        let blank = MappedExecutable::new("", "/bin/blank");
        let mut data = defaults();
        data.insert(
            "mappedExecutables",
            FieldValue::Executables(vec![b.clone(), a.clone(), blank, b.clone(), a.clone()]),
        );

        let outcome = Repairer::default().repair(data, &ProfileSchema);
        assert!(outcome.is_repaired());
        assert_eq!(
            outcome.data.unwrap().get("mappedExecutables"),
            Some(&FieldValue::Executables(vec![b, a]))
        );
    }

    #[test]
    fn test_non_list_executables_reset_to_empty() {
        let mut data = defaults();
        data.insert("mappedExecutables", FieldValue::text("notes"));
        let outcome = Repairer::default().repair(data, &ProfileSchema);
        assert_eq!(
            outcome.data.unwrap().get("mappedExecutables"),
            Some(&FieldValue::Executables(Vec::new()))
        );
    }

    #[test]
    fn test_invalid_ignore_field_is_unrepairable() {
        let mut data = defaults();
        data.insert("fontSize", FieldValue::Integer(-4));
        data.insert("username", FieldValue::Integer(12));

        let outcome = Repairer::default().repair(data, &ProfileSchema);
        assert_eq!(outcome.state, RepairState::Unrepairable);
        assert!(outcome.data.is_none());
        assert!(outcome.reason.unwrap().contains("username"));
    }

    #[test]
    fn test_undecodable_text_is_unrepairable() {
        let outcome = Repairer::default().run("{ not json", &JsonCodec, &ProfileSchema);
        assert_eq!(outcome.state, RepairState::Unrepairable);
        assert_eq!(outcome.attempts, 0);
    }

    #[test]
    fn test_run_repairs_decoded_text() {
        let mut data = defaults();
        data.insert("fillOpacity", FieldValue::Integer(999));
        let text = JsonCodec.encode(&data).unwrap();

        let outcome = Repairer::default().run(&text, &JsonCodec, &ProfileSchema);
        assert!(outcome.is_repaired());
        assert_eq!(outcome.repaired, vec!["fillOpacity"]);
    }

    #[test]
    fn test_default_rejected_by_its_own_kind_exhausts_budget() {
        let schema: Vec<FieldSpec> = vec![FieldSpec::new(
            "level",
            FieldKind::Integer { min: 1, max: 5 },
            DefaultValue::Integer(0),
        )];
        let outcome = Repairer::new(3).repair(FieldMap::new(), &schema);
        assert_eq!(outcome.state, RepairState::Exhausted);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.last_check.invalid, vec!["level"]);
    }

    #[test]
    fn test_zero_budget_is_raised_to_one() {
        assert_eq!(Repairer::new(0).max_attempts(), 1);
        let mut data = defaults();
        data.remove("fontName");
        assert!(Repairer::new(0).repair(data, &ProfileSchema).is_repaired());
    }

    #[test]
    fn test_every_repairable_subset_converges_in_one_pass() {
        let repairable: Vec<&FieldSpec> = crate::schema::PROFILE_FIELDS
            .iter()
            .filter(|spec| spec.repairable)
            .collect();
        for (i, spec) in repairable.iter().enumerate() {
            let mut data = defaults();
            for other in repairable.iter().skip(i) {
                data.insert(other.id, FieldValue::Other(serde_json::Value::Null));
            }
            let outcome = Repairer::default().repair(data, &ProfileSchema);
            assert!(outcome.is_repaired(), "failed starting at {}", spec.id);
            assert_eq!(outcome.attempts, 1);
        }
    }
}
