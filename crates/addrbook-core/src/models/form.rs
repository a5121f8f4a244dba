//! Entry input forms and field rules
//!
//! Raw input arrives as text ([`EntryForm`] for a full record,
//! [`EntryPatch`] for an edit that only names the fields it changes).
//! [`EntryForm::clean`] checks every field against the rule list below and
//! produces typed [`EntryFields`] or a set of per-field messages.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{EntryFields, ValidationErrors};

/// Date format accepted for birthday fields.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid regex"));
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9 ().-]*[0-9][0-9 ().-]*$").expect("Invalid regex"));
static ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9][0-9 -]*$").expect("Invalid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextFormat {
    Free,
    Email,
    Phone,
    ZipCode,
}

/// Constraint set for one text field.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TextRule {
    pub field: &'static str,
    pub required: bool,
    pub max_len: usize,
    pub format: TextFormat,
}

impl TextRule {
    pub(crate) const fn required(field: &'static str, max_len: usize) -> Self {
        Self {
            field,
            required: true,
            max_len,
            format: TextFormat::Free,
        }
    }

    pub(crate) const fn optional(field: &'static str, max_len: usize) -> Self {
        Self {
            field,
            required: false,
            max_len,
            format: TextFormat::Free,
        }
    }

    const fn with_format(mut self, format: TextFormat) -> Self {
        self.format = format;
        self
    }

    /// Trim `value`, record any violations, and return the trimmed text.
    pub(crate) fn check(&self, errors: &mut ValidationErrors, value: &str) -> String {
        let value = value.trim();
        if value.is_empty() {
            if self.required {
                errors.add(self.field, "This field is required.");
            }
            return String::new();
        }

        let len = value.chars().count();
        if len > self.max_len {
            errors.add(
                self.field,
                format!(
                    "Ensure this value has at most {} characters (it has {len}).",
                    self.max_len
                ),
            );
        }

        let format_error = match self.format {
            TextFormat::Free => None,
            TextFormat::Email => {
                (!EMAIL_RE.is_match(value)).then_some("Enter a valid email address.")
            }
            TextFormat::Phone => {
                (!PHONE_RE.is_match(value)).then_some("Enter a valid phone number.")
            }
            TextFormat::ZipCode => (!ZIP_RE.is_match(value)).then_some("Enter a valid zip code."),
        };
        if let Some(message) = format_error {
            errors.add(self.field, message);
        }

        value.to_string()
    }
}

const LAST_NAME: TextRule = TextRule::required("last_name", 20);
const FIRST_NAME: TextRule = TextRule::optional("first_name", 20);
const ADDRESS: TextRule = TextRule::optional("address", 200);
const CITY: TextRule = TextRule::optional("city", 30);
const STATE: TextRule = TextRule::optional("state", 20);
const ZIP_CODE: TextRule = TextRule::optional("zip_code", 10).with_format(TextFormat::ZipCode);
const COUNTRY: TextRule = TextRule::optional("country", 30);
const EMAIL: TextRule = TextRule::optional("email", 254).with_format(TextFormat::Email);
const HOME_PHONE: TextRule = TextRule::optional("home_phone", 20).with_format(TextFormat::Phone);
const CELL_PHONE: TextRule = TextRule::optional("cell_phone", 20).with_format(TextFormat::Phone);
const FAX: TextRule = TextRule::optional("fax", 20).with_format(TextFormat::Phone);
const SPOUSE_LAST: TextRule = TextRule::optional("spouse_last", 20);
const SPOUSE_FIRST: TextRule = TextRule::optional("spouse_first", 20);
const SPOUSE_CELL: TextRule = TextRule::optional("spouse_cell", 20).with_format(TextFormat::Phone);
const SPOUSE_EMAIL: TextRule =
    TextRule::optional("spouse_email", 254).with_format(TextFormat::Email);

fn check_date(errors: &mut ValidationErrors, field: &str, value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(value, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add(field, "Enter a valid date in YYYY-MM-DD format.");
            None
        }
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|date| date.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// Raw text for every entry field, as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryForm {
    pub last_name: String,
    pub first_name: String,
    pub birthday: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub email: String,
    pub home_phone: String,
    pub cell_phone: String,
    pub fax: String,
    pub spouse_last: String,
    pub spouse_first: String,
    pub spouse_birth: String,
    pub spouse_cell: String,
    pub spouse_email: String,
}

impl EntryForm {
    /// Validate every field and convert to typed entry fields.
    pub fn clean(&self) -> Result<EntryFields, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let fields = EntryFields {
            last_name: LAST_NAME.check(&mut errors, &self.last_name),
            first_name: FIRST_NAME.check(&mut errors, &self.first_name),
            birthday: check_date(&mut errors, "birthday", &self.birthday),
            address: ADDRESS.check(&mut errors, &self.address),
            city: CITY.check(&mut errors, &self.city),
            state: STATE.check(&mut errors, &self.state),
            zip_code: ZIP_CODE.check(&mut errors, &self.zip_code),
            country: COUNTRY.check(&mut errors, &self.country),
            email: EMAIL.check(&mut errors, &self.email),
            home_phone: HOME_PHONE.check(&mut errors, &self.home_phone),
            cell_phone: CELL_PHONE.check(&mut errors, &self.cell_phone),
            fax: FAX.check(&mut errors, &self.fax),
            spouse_last: SPOUSE_LAST.check(&mut errors, &self.spouse_last),
            spouse_first: SPOUSE_FIRST.check(&mut errors, &self.spouse_first),
            spouse_birth: check_date(&mut errors, "spouse_birth", &self.spouse_birth),
            spouse_cell: SPOUSE_CELL.check(&mut errors, &self.spouse_cell),
            spouse_email: SPOUSE_EMAIL.check(&mut errors, &self.spouse_email),
        };
        errors.into_result(fields)
    }
}

impl From<&EntryFields> for EntryForm {
    fn from(fields: &EntryFields) -> Self {
        Self {
            last_name: fields.last_name.clone(),
            first_name: fields.first_name.clone(),
            birthday: format_date(fields.birthday),
            address: fields.address.clone(),
            city: fields.city.clone(),
            state: fields.state.clone(),
            zip_code: fields.zip_code.clone(),
            country: fields.country.clone(),
            email: fields.email.clone(),
            home_phone: fields.home_phone.clone(),
            cell_phone: fields.cell_phone.clone(),
            fax: fields.fax.clone(),
            spouse_last: fields.spouse_last.clone(),
            spouse_first: fields.spouse_first.clone(),
            spouse_birth: format_date(fields.spouse_birth),
            spouse_cell: fields.spouse_cell.clone(),
            spouse_email: fields.spouse_email.clone(),
        }
    }
}

/// Proposed changes to an existing entry.
///
/// Only the fields that are `Some` change; an empty string clears an
/// optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryPatch {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub birthday: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub email: Option<String>,
    pub home_phone: Option<String>,
    pub cell_phone: Option<String>,
    pub fax: Option<String>,
    pub spouse_last: Option<String>,
    pub spouse_first: Option<String>,
    pub spouse_birth: Option<String>,
    pub spouse_cell: Option<String>,
    pub spouse_email: Option<String>,
}

impl EntryPatch {
    /// Whether the patch names no field at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay this patch on `base`, producing the full form to validate.
    pub fn apply(&self, base: &EntryFields) -> EntryForm {
        let base = EntryForm::from(base);
        let pick = |patched: &Option<String>, current: String| patched.clone().unwrap_or(current);
        EntryForm {
            last_name: pick(&self.last_name, base.last_name),
            first_name: pick(&self.first_name, base.first_name),
            birthday: pick(&self.birthday, base.birthday),
            address: pick(&self.address, base.address),
            city: pick(&self.city, base.city),
            state: pick(&self.state, base.state),
            zip_code: pick(&self.zip_code, base.zip_code),
            country: pick(&self.country, base.country),
            email: pick(&self.email, base.email),
            home_phone: pick(&self.home_phone, base.home_phone),
            cell_phone: pick(&self.cell_phone, base.cell_phone),
            fax: pick(&self.fax, base.fax),
            spouse_last: pick(&self.spouse_last, base.spouse_last),
            spouse_first: pick(&self.spouse_first, base.spouse_first),
            spouse_birth: pick(&self.spouse_birth, base.spouse_birth),
            spouse_cell: pick(&self.spouse_cell, base.spouse_cell),
            spouse_email: pick(&self.spouse_email, base.spouse_email),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn valid_form() -> EntryForm {
        EntryForm {
            last_name: "Smith".to_string(),
            first_name: "Ann".to_string(),
            birthday: "1980-02-29".to_string(),
            city: "Pittsburgh".to_string(),
            zip_code: "15213".to_string(),
            email: "ann@example.com".to_string(),
            cell_phone: "+1 (412) 555-0100".to_string(),
            ..EntryForm::default()
        }
    }

    #[test]
    fn test_clean_valid_form() {
        let fields = valid_form().clean().unwrap();
        assert_eq!(fields.last_name, "Smith");
        assert_eq!(fields.birthday, NaiveDate::from_ymd_opt(1980, 2, 29));
        assert_eq!(fields.spouse_birth, None);
        assert_eq!(fields.fax, "");
    }

    #[test]
    fn test_clean_trims_whitespace() {
        let form = EntryForm {
            last_name: "  Smith ".to_string(),
            ..EntryForm::default()
        };
        assert_eq!(form.clean().unwrap().last_name, "Smith");
    }

    #[test]
    fn test_last_name_required() {
        let form = EntryForm {
            last_name: "   ".to_string(),
            ..EntryForm::default()
        };
        let errors = form.clean().unwrap_err();
        assert_eq!(errors.field("last_name"), ["This field is required."]);
    }

    #[test]
    fn test_last_name_too_long() {
        let form = EntryForm {
            last_name: "x".repeat(21),
            ..valid_form()
        };
        let errors = form.clean().unwrap_err();
        assert_eq!(
            errors.field("last_name"),
            ["Ensure this value has at most 20 characters (it has 21)."]
        );
        assert_eq!(errors.fields().count(), 1);
    }

    #[test]
    fn test_format_checks() {
        let form = EntryForm {
            email: "foo@bar".to_string(),
            home_phone: "call me".to_string(),
            zip_code: "ABCDE".to_string(),
            birthday: "02/29/1980".to_string(),
            ..valid_form()
        };
        let errors = form.clean().unwrap_err();
        assert!(errors.has_field("email"));
        assert!(errors.has_field("home_phone"));
        assert!(errors.has_field("zip_code"));
        assert!(errors.has_field("birthday"));
        assert!(!errors.has_field("last_name"));
    }

    #[test]
    fn test_optional_fields_may_be_blank() {
        let form = EntryForm {
            last_name: "Smith".to_string(),
            ..EntryForm::default()
        };
        assert!(form.clean().is_ok());
    }

    #[test]
    fn test_patch_keeps_unlisted_fields() {
        let base = valid_form().clean().unwrap();
        let patch = EntryPatch {
            city: Some("Boston".to_string()),
            ..EntryPatch::default()
        };
        let merged = patch.apply(&base).clean().unwrap();
        assert_eq!(merged.city, "Boston");
        assert_eq!(merged.last_name, "Smith");
        assert_eq!(merged.birthday, base.birthday);
    }

    #[test]
    fn test_patch_clears_with_empty_string() {
        let base = valid_form().clean().unwrap();
        let patch = EntryPatch {
            birthday: Some(String::new()),
            email: Some(String::new()),
            ..EntryPatch::default()
        };
        let merged = patch.apply(&base).clean().unwrap();
        assert_eq!(merged.birthday, None);
        assert_eq!(merged.email, "");
    }

    #[test]
    fn test_patch_is_empty_only_without_fields() {
        assert!(EntryPatch::default().is_empty());
        let clearing = EntryPatch {
            fax: Some(String::new()),
            ..EntryPatch::default()
        };
        assert!(!clearing.is_empty());
    }

    #[test]
    fn test_form_round_trips_fields() {
        let fields = valid_form().clean().unwrap();
        assert_eq!(EntryForm::from(&fields).clean().unwrap(), fields);
    }
}
