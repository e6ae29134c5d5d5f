//! Field specifications and the built-in profile registry.
//!
//! This module defines the schema for profile fields: what kind of value each holds,
//! what its default is, and whether an invalid value may be replaced by that default.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::value::FieldValue;
use crate::model::ScreenStat;

/// The kind of value a field holds.
///
/// Each kind knows which [`FieldValue`] shapes (and ranges) it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Any text, including empty
    Text,

    /// Six hex digits, `RRGGBB`, no leading `#`
    Color,

    /// On/off preference
    Flag,

    /// Whole number within an inclusive range
    Integer { min: i64, max: i64 },

    /// Window geometry sub-record
    Geometry,

    /// Mapped executables: no duplicates, no blank entries
    Executables,
}

impl FieldKind {
    /// Whether `value` is acceptable for a field of this kind.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        match (self, value) {
            (FieldKind::Text, FieldValue::Text(_)) => true,
            (FieldKind::Color, FieldValue::Text(s)) => {
                s.len() == 6 && s.bytes().all(|b| b.is_ascii_hexdigit())
            }
            (FieldKind::Flag, FieldValue::Flag(_)) => true,
            (FieldKind::Integer { min, max }, FieldValue::Integer(v)) => (*min..=*max).contains(v),
            (FieldKind::Geometry, FieldValue::Geometry(_)) => true,
            (FieldKind::Executables, FieldValue::Executables(exes)) => {
                exes.iter().enumerate().all(|(i, exe)| {
                    !exe.is_blank() && !exes[..i].contains(exe)
                })
            }
            _ => false,
        }
    }

    /// Human-readable description, used in `InvalidValue` errors.
    pub fn describe(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Color => "a six digit hex color",
            FieldKind::Flag => "a flag",
            FieldKind::Integer { .. } => "an integer within range",
            FieldKind::Geometry => "a screen geometry record",
            FieldKind::Executables => "a list of distinct, non-blank executables",
        }
    }
}

/// Const-constructible default for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Text(&'static str),
    Flag(bool),
    Integer(i64),
    /// All-zero geometry
    Geometry,
    /// Empty executable list
    NoExecutables,
}

impl DefaultValue {
    pub fn to_value(&self) -> FieldValue {
        match self {
            DefaultValue::Text(s) => FieldValue::Text((*s).to_string()),
            DefaultValue::Flag(b) => FieldValue::Flag(*b),
            DefaultValue::Integer(i) => FieldValue::Integer(*i),
            DefaultValue::Geometry => FieldValue::Geometry(ScreenStat::default()),
            DefaultValue::NoExecutables => FieldValue::Executables(Vec::new()),
        }
    }
}

/// Specification for a single profile field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// The field id as stored in the profile (e.g., "fontSize")
    pub id: &'static str,

    /// The kind of value this field holds
    pub kind: FieldKind,

    /// Value used for first-run construction and for repairs
    pub default: DefaultValue,

    /// Whether an invalid value may be replaced by `default`.
    ///
    /// Fields without a safe default (credentials, generated identifiers) are not
    /// repairable: a profile holding a bad value there cannot be salvaged.
    pub repairable: bool,

    /// Whether reads of this field are left out of the debug log
    pub quiet: bool,
}

impl FieldSpec {
    /// Create a repairable, non-quiet field spec.
    pub const fn new(id: &'static str, kind: FieldKind, default: DefaultValue) -> Self {
        Self {
            id,
            kind,
            default,
            repairable: true,
            quiet: false,
        }
    }

    /// Mark the field as not repairable.
    pub const fn ignore(mut self) -> Self {
        self.repairable = false;
        self
    }

    /// Keep reads of this field out of the log.
    pub const fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    pub fn accepts(&self, value: &FieldValue) -> bool {
        self.kind.accepts(value)
    }
}

/// Read-only source of field specifications.
///
/// The registry is shared by every component and never mutated after startup.
pub trait SchemaRegistry: Send + Sync {
    /// All fields, in a stable order.
    fn fields(&self) -> &[FieldSpec];

    /// Look up a field by id.
    fn get(&self, id: &str) -> Option<&FieldSpec> {
        self.fields().iter().find(|spec| spec.id == id)
    }
}

impl SchemaRegistry for Vec<FieldSpec> {
    fn fields(&self) -> &[FieldSpec] {
        self
    }
}

const fn flag(id: &'static str, default: bool) -> FieldSpec {
    FieldSpec::new(id, FieldKind::Flag, DefaultValue::Flag(default))
}

const fn color(id: &'static str, default: &'static str) -> FieldSpec {
    FieldSpec::new(id, FieldKind::Color, DefaultValue::Text(default))
}

const fn text(id: &'static str, default: &'static str) -> FieldSpec {
    FieldSpec::new(id, FieldKind::Text, DefaultValue::Text(default))
}

const fn integer(id: &'static str, min: i64, max: i64, default: i64) -> FieldSpec {
    FieldSpec::new(id, FieldKind::Integer { min, max }, DefaultValue::Integer(default))
}

/// Registry of all profile fields.
///
/// This is the single source of truth for field metadata.
/// Adding a new preference means adding an entry here.
pub const PROFILE_FIELDS: &[FieldSpec] = &[
    // Identity: no safe default exists
    text("username", "").ignore(),
    text("password", "").ignore().quiet(),
    text("youtubeUuid", "aaaaaaaaaaa").ignore().quiet(),
    integer("accountCreationTime", 0, i64::MAX, 0).ignore(),
    // Fonts & colors
    text("fontName", "Agency FB"),
    integer("fontSize", 10, 100, 30),
    integer("fontMetric", 0, 3, 1),
    color("foregroundColor", "000080"),
    color("backgroundColor", "000000"),
    color("frameColor", "1A2033"),
    integer("fillOpacity", 0, 255, 255),
    // Console preferences
    flag("introMusic", false),
    flag("debugStats", false),
    flag("randomBackground", false),
    flag("outputBorder", false),
    flag("inputBorder", false),
    flag("hourlyChimes", true),
    flag("silenceErrors", true),
    flag("fullscreen", false),
    flag("outputFill", false),
    flag("inputFill", false),
    flag("consoleClock", true),
    flag("consoleClockSeconds", true),
    text("clockFormat", "EEEEEEEEE h:mmaa"),
    flag("filterChat", true),
    flag("minimizeOnClose", false),
    flag("typingAnimation", true),
    flag("typingSound", true),
    flag("busyAnimation", true),
    flag("roundedFrameBorders", false),
    flag("capsMode", false),
    flag("compactTextMode", false),
    flag("wrapShell", false),
    flag("shouldPersistNotifications", false),
    flag("shouldDoAnimations", true),
    flag("audioTotalLength", true),
    flag("drawWeatherMap", true),
    flag("paintClockLabels", true),
    flag("clockWidgetSecondHand", true),
    flag("shownWelcomeMessage", false),
    // Session bookkeeping
    flag("loggedIn", false).quiet(),
    integer("lastSessionStart", 0, i64::MAX, 0).quiet(),
    // Structured sub-records
    FieldSpec::new("screenStat", FieldKind::Geometry, DefaultValue::Geometry),
    FieldSpec::new(
        "mappedExecutables",
        FieldKind::Executables,
        DefaultValue::NoExecutables,
    ),
];

static FIELD_INDEX: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
    PROFILE_FIELDS
        .iter()
        .enumerate()
        .map(|(i, spec)| (spec.id, i))
        .collect()
});

/// The built-in profile schema backed by [`PROFILE_FIELDS`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileSchema;

impl SchemaRegistry for ProfileSchema {
    fn fields(&self) -> &[FieldSpec] {
        PROFILE_FIELDS
    }

    fn get(&self, id: &str) -> Option<&FieldSpec> {
        FIELD_INDEX.get(id).map(|&i| &PROFILE_FIELDS[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MappedExecutable;
    use std::collections::HashSet;

    #[test]
    fn registry_has_expected_entries() {
        let schema = ProfileSchema;
        assert!(schema.get("fontSize").is_some());
        assert!(schema.get("screenStat").is_some());
        assert!(schema.get("mappedExecutables").is_some());
        assert!(schema.get("username").is_some());
    }

    #[test]
    fn unknown_field_returns_none() {
        assert!(ProfileSchema.get("nonexistent").is_none());
        assert!(ProfileSchema.get("FontSize").is_none());
    }

    #[test]
    fn field_ids_are_unique() {
        let mut seen = HashSet::new();
        for spec in PROFILE_FIELDS {
            assert!(seen.insert(spec.id), "duplicate field id {}", spec.id);
        }
    }

    #[test]
    fn every_default_is_accepted_by_its_own_kind() {
        for spec in PROFILE_FIELDS {
            assert!(
                spec.accepts(&spec.default.to_value()),
                "default of {} is rejected by its kind",
                spec.id
            );
        }
    }

    #[test]
    fn identity_fields_are_not_repairable() {
        for id in ["username", "password", "youtubeUuid", "accountCreationTime"] {
            assert!(!ProfileSchema.get(id).unwrap().repairable, "{} should be ignore", id);
        }
        assert!(ProfileSchema.get("fontSize").unwrap().repairable);
        assert!(ProfileSchema.get("screenStat").unwrap().repairable);
    }

    #[test]
    fn indexed_lookup_matches_linear_lookup() {
        let fields = PROFILE_FIELDS.to_vec();
        let linear: &dyn SchemaRegistry = &fields;
        for spec in PROFILE_FIELDS {
            assert_eq!(ProfileSchema.get(spec.id), linear.get(spec.id));
        }
    }

    #[test]
    fn integer_kind_enforces_range() {
        let kind = FieldKind::Integer { min: 10, max: 100 };
        assert!(kind.accepts(&FieldValue::Integer(10)));
        assert!(kind.accepts(&FieldValue::Integer(100)));
        assert!(!kind.accepts(&FieldValue::Integer(9)));
        assert!(!kind.accepts(&FieldValue::Integer(5000)));
        assert!(!kind.accepts(&FieldValue::text("30")));
    }

    #[test]
    fn color_kind_requires_six_hex_digits() {
        assert!(FieldKind::Color.accepts(&FieldValue::text("1A2033")));
        assert!(FieldKind::Color.accepts(&FieldValue::text("ffffff")));
        assert!(!FieldKind::Color.accepts(&FieldValue::text("#ffffff")));
        assert!(!FieldKind::Color.accepts(&FieldValue::text("fff")));
        assert!(!FieldKind::Color.accepts(&FieldValue::text("zzzzzz")));
    }

    #[test]
    fn executables_kind_rejects_duplicates_and_blanks() {
        let a = MappedExecutable::new("a", "/bin/a");
        let b = MappedExecutable::new("b", "/bin/b");
        let kind = FieldKind::Executables;
        assert!(kind.accepts(&FieldValue::Executables(vec![a.clone(), b.clone()])));
        assert!(!kind.accepts(&FieldValue::Executables(vec![a.clone(), b, a])));
        assert!(!kind.accepts(&FieldValue::Executables(vec![MappedExecutable::new(
            "", "/bin/x"
        )])));
    }

    #[test]
    fn other_values_are_never_accepted() {
        let other = FieldValue::Other(serde_json::Value::Null);
        for spec in PROFILE_FIELDS {
            assert!(!spec.accepts(&other));
        }
    }

    #[test]
    fn builder_flags_compose() {
        let spec = text("x", "").ignore().quiet();
        assert!(!spec.repairable);
        assert!(spec.quiet);
        let plain = text("y", "");
        assert!(plain.repairable);
        assert!(!plain.quiet);
    }
}
