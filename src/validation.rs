//! Submission validation: clinical history rules and image checks.
//!
//! Every rule runs independently and all violations are collected, so a
//! caller can report the whole list at once. Pure functions, no I/O.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::MAX_IMAGE_BYTES;
use crate::models::history::{
    AGE, CLINICAL_SIGNS, TOTAL_AFFECTED, TOTAL_BIRDS, TOTAL_DEATHS,
};
use crate::models::{ClinicalHistoryRecord, ImageFile};

/// Minimum trimmed length of the clinical signs description.
pub const MIN_CLINICAL_SIGNS_CHARS: usize = 10;

static AGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+\s*(weeks|months|years)$").unwrap());

/// Field-keyed violation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "{} invalid field(s): {}", self.0.len(), fields.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Validate a clinical history record.
pub fn validate_history(record: &ClinicalHistoryRecord) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_history(record, &mut errors);
    errors.into_result()
}

/// Validate the image set: at least one file, image media types, size cap.
///
/// Keys: `images` for the count, `image_<i>` for the type and
/// `image_<i>_size` for the size of the file at index `i`.
pub fn validate_images(images: &[ImageFile]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_images(images, &mut errors);
    errors.into_result()
}

/// Validate history and images together, merging all violations.
pub fn validate_submission(
    record: &ClinicalHistoryRecord,
    images: &[ImageFile],
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_history(record, &mut errors);
    check_images(images, &mut errors);
    errors.into_result()
}

fn check_history(record: &ClinicalHistoryRecord, errors: &mut ValidationErrors) {
    for (field, value) in record.fields() {
        if value.is_blank() {
            errors.insert(field, format!("{field} is required"));
        }
    }

    let age = record.age.as_text();
    let age = age.trim();
    if !age.is_empty() && !AGE_PATTERN.is_match(age) {
        errors.insert(
            AGE,
            "Age must be a number followed by weeks, months or years (e.g. 16 weeks)",
        );
    }

    let signs = record.clinical_signs.as_text();
    let signs = signs.trim();
    // Length in UTF-16 code units.
    if !signs.is_empty() && signs.encode_utf16().count() < MIN_CLINICAL_SIGNS_CHARS {
        errors.insert(
            CLINICAL_SIGNS,
            format!("{CLINICAL_SIGNS} must be at least {MIN_CLINICAL_SIGNS_CHARS} characters"),
        );
    }

    let birds = parse_count(&record.total_birds.as_text());
    let affected = parse_count(&record.total_affected.as_text());
    let deaths = parse_count(&record.total_deaths.as_text());

    if let (Some(birds), Some(affected)) = (birds, affected) {
        if affected > birds {
            errors.insert(
                TOTAL_AFFECTED,
                format!("{TOTAL_AFFECTED} cannot exceed {TOTAL_BIRDS}"),
            );
        }
    }
    if let (Some(birds), Some(deaths)) = (birds, deaths) {
        if deaths > birds {
            errors.insert(
                TOTAL_DEATHS,
                format!("{TOTAL_DEATHS} cannot exceed {TOTAL_BIRDS}"),
            );
        }
    }
}

fn check_images(images: &[ImageFile], errors: &mut ValidationErrors) {
    if images.is_empty() {
        errors.insert("images", "At least one image is required");
        return;
    }

    for (index, image) in images.iter().enumerate() {
        if !image.is_image() {
            errors.insert(
                format!("image_{index}"),
                format!("File {} is not an image", image.file_name),
            );
        }
        if image.size_bytes() > MAX_IMAGE_BYTES {
            errors.insert(
                format!("image_{index}_size"),
                format!("File {} exceeds the 10 MB limit", image.file_name),
            );
        }
    }
}

/// Leading-integer parse: optional whitespace and sign, then digits.
/// Trailing text is ignored; no leading digits means "not a number".
fn parse_count(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    let value = rest[..digits_len].parse::<i64>().ok()?;
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::history::{HISTORY_FIELDS, POST_MORTEM_FINDINGS, SPECIES};
    use crate::models::HistoryValue;

    fn valid_history() -> ClinicalHistoryRecord {
        ClinicalHistoryRecord {
            species: "Broiler".into(),
            age: "16 weeks".into(),
            clinical_signs: "Coughing, nasal discharge and reduced feed intake".into(),
            post_mortem_findings: "Tracheal congestion with mucus".into(),
            total_birds: "100".into(),
            total_affected: "50".into(),
            total_deaths: "5".into(),
        }
    }

    fn jpeg(size: usize) -> ImageFile {
        ImageFile::new("flock.jpg", "image/jpeg", vec![0xFF; size])
    }

    #[test]
    fn valid_history_passes() {
        assert!(validate_history(&valid_history()).is_ok());
    }

    #[test]
    fn each_missing_field_is_reported_by_name() {
        for field in HISTORY_FIELDS {
            let mut record = valid_history();
            record.set(field, "");
            let errors = validate_history(&record).unwrap_err();
            assert_eq!(
                errors.get(field),
                Some(format!("{field} is required").as_str()),
                "missing {field} should be reported"
            );
        }
    }

    #[test]
    fn whitespace_only_counts_as_missing() {
        let mut record = valid_history();
        record.species = "   ".into();
        let errors = validate_history(&record).unwrap_err();
        assert_eq!(errors.get(SPECIES), Some("Species is required"));
    }

    #[test]
    fn all_violations_are_collected() {
        let mut record = valid_history();
        record.species = HistoryValue::default();
        record.post_mortem_findings = HistoryValue::default();
        record.age = "old".into();
        record.total_affected = "500".into();
        let errors = validate_history(&record).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(SPECIES));
        assert!(errors.contains(POST_MORTEM_FINDINGS));
        assert!(errors.contains(AGE));
        assert!(errors.contains(TOTAL_AFFECTED));
    }

    #[test]
    fn age_format_accepts_units() {
        for age in ["16 weeks", "3 months", "2 years", "16weeks", "  8   weeks  "] {
            let mut record = valid_history();
            record.age = age.into();
            assert!(validate_history(&record).is_ok(), "{age:?} should pass");
        }
    }

    #[test]
    fn age_format_rejects_malformed() {
        for age in [
            "16",
            "sixteen weeks",
            "16 week",
            "weeks",
            "16 days",
            "1.5 years",
            "\u{0661}\u{0666} weeks",
            "\u{FF11}\u{FF16} months",
        ] {
            let mut record = valid_history();
            record.age = age.into();
            let errors = validate_history(&record).unwrap_err();
            let message = errors.get(AGE).unwrap();
            assert!(message.starts_with("Age must be"), "{age:?} gave {message}");
        }
    }

    #[test]
    fn missing_age_reports_required_not_format() {
        let mut record = valid_history();
        record.age = HistoryValue::default();
        let errors = validate_history(&record).unwrap_err();
        assert_eq!(errors.get(AGE), Some("Age is required"));
    }

    #[test]
    fn clinical_signs_length() {
        let mut record = valid_history();
        record.clinical_signs = "sick".into();
        let errors = validate_history(&record).unwrap_err();
        assert_eq!(
            errors.get(CLINICAL_SIGNS),
            Some("Clinical Signs must be at least 10 characters")
        );

        record.clinical_signs = "inappetence".into();
        assert!(validate_history(&record).is_ok());
    }

    #[test]
    fn clinical_signs_length_is_measured_after_trim() {
        let mut record = valid_history();
        record.clinical_signs = "   lethargic   ".into();
        let errors = validate_history(&record).unwrap_err();
        assert!(errors.contains(CLINICAL_SIGNS));
    }

    #[test]
    fn clinical_signs_length_counts_utf16_units() {
        let mut record = valid_history();
        record.clinical_signs = "\u{1F414}\u{1F414}\u{1F414}\u{1F414}\u{1F414}".into();
        assert!(validate_history(&record).is_ok());

        record.clinical_signs = "sick \u{1F414}".into();
        let errors = validate_history(&record).unwrap_err();
        assert!(errors.contains(CLINICAL_SIGNS));
    }

    #[test]
    fn numeric_counts_are_cross_checked() {
        let mut record = valid_history();
        record.total_birds = 100u64.into();
        record.total_affected = 150u64.into();
        record.total_deaths = 0u64.into();
        let errors = validate_history(&record).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.contains(TOTAL_AFFECTED));
    }

    #[test]
    fn affected_cannot_exceed_flock() {
        let mut record = valid_history();
        record.total_affected = "150".into();
        let errors = validate_history(&record).unwrap_err();
        assert_eq!(
            errors.get(TOTAL_AFFECTED),
            Some("Total Affected cannot exceed Total Birds in Farm")
        );

        record.total_affected = "50".into();
        assert!(validate_history(&record).is_ok());
    }

    #[test]
    fn deaths_cannot_exceed_flock() {
        let mut record = valid_history();
        record.total_deaths = "101".into();
        let errors = validate_history(&record).unwrap_err();
        assert!(errors.contains(TOTAL_DEATHS));
        assert!(!errors.contains(TOTAL_AFFECTED));
    }

    #[test]
    fn affected_plus_deaths_may_exceed_flock() {
        let mut record = valid_history();
        record.total_affected = "90".into();
        record.total_deaths = "90".into();
        assert!(validate_history(&record).is_ok());
    }

    #[test]
    fn unparsable_counts_skip_cross_check() {
        let mut record = valid_history();
        record.total_birds = "many".into();
        record.total_affected = "150".into();
        assert!(validate_history(&record).is_ok());
    }

    #[test]
    fn zero_counts_are_present() {
        let mut record = valid_history();
        record.total_affected = "0".into();
        record.total_deaths = "0".into();
        assert!(validate_history(&record).is_ok());
    }

    #[test]
    fn parse_count_uses_leading_digits() {
        assert_eq!(parse_count("100"), Some(100));
        assert_eq!(parse_count("  42 birds"), Some(42));
        assert_eq!(parse_count("-3"), Some(-3));
        assert_eq!(parse_count("12.9"), Some(12));
        assert_eq!(parse_count("abc"), None);
        assert_eq!(parse_count(""), None);
        assert_eq!(parse_count("-"), None);
    }

    #[test]
    fn zero_images_always_fail() {
        let errors = validate_images(&[]).unwrap_err();
        assert_eq!(errors.get("images"), Some("At least one image is required"));

        let mut record = valid_history();
        record.species = HistoryValue::default();
        let errors = validate_submission(&record, &[]).unwrap_err();
        assert!(errors.contains("images"));
        assert!(errors.contains(SPECIES));
    }

    #[test]
    fn non_image_media_type_is_keyed_by_index() {
        let images = vec![
            jpeg(10),
            ImageFile::new("report.pdf", "application/pdf", vec![0x25, 0x50]),
        ];
        let errors = validate_images(&images).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("image_1"), Some("File report.pdf is not an image"));
    }

    #[test]
    fn oversized_image_is_keyed_by_index() {
        let images = vec![jpeg(MAX_IMAGE_BYTES + 1), jpeg(MAX_IMAGE_BYTES)];
        let errors = validate_images(&images).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.contains("image_0_size"));
    }

    #[test]
    fn two_megabyte_jpeg_passes() {
        assert!(validate_submission(&valid_history(), &[jpeg(2 * 1024 * 1024)]).is_ok());
    }

    #[test]
    fn errors_serialize_as_flat_object() {
        let mut errors = ValidationErrors::new();
        errors.insert("images", "At least one image is required");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({"images": "At least one image is required"}));
    }
}
