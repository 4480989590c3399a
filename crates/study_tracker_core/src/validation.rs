//! crates/study_tracker_core/src/validation.rs
//!
//! Checked input types. Raw user input goes in, and either a value the
//! services can trust comes out or a map of field name to messages.
//! Services only ever accept the checked types.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

pub const MAX_CONTENT_CHARS: usize = 3000;
pub const MAX_REFLECTION_CHARS: usize = 1000;
pub const MAX_POMODORO_MINUTES: u32 = 180;
/// Largest minute total a study log can hold; the stores keep it in a
/// signed 32-bit column.
pub const MAX_STUDY_MINUTES: u32 = i32::MAX as u32;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

//=========================================================================================
// Field Errors
//=========================================================================================

/// Validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn as_map(&self) -> &BTreeMap<String, Vec<String>> {
        &self.0
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }

    /// `Ok(value)` when nothing was recorded, the errors otherwise.
    fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

//=========================================================================================
// Study Log Input
//=========================================================================================

/// Study log fields exactly as submitted by the client.
#[derive(Debug, Clone, Default)]
pub struct StudyLogForm {
    pub study_date: String,
    pub content: String,
    pub duration_minutes: String,
    pub reflection: Option<String>,
}

/// A study log submission that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyLogInput {
    study_date: NaiveDate,
    content: String,
    duration_minutes: u32,
    reflection: Option<String>,
}

impl StudyLogInput {
    pub fn parse(form: StudyLogForm) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        let study_date = NaiveDate::parse_from_str(form.study_date.trim(), "%Y-%m-%d");
        if study_date.is_err() {
            errors.add("study_date", "Enter a valid date (YYYY-MM-DD)");
        }

        let content_chars = form.content.chars().count();
        if form.content.trim().is_empty() {
            errors.add("content", "Describe what you studied");
        } else if content_chars > MAX_CONTENT_CHARS {
            errors.add(
                "content",
                format!("Keep it within {} characters", MAX_CONTENT_CHARS),
            );
        }

        let duration_minutes = parse_minutes(&form.duration_minutes, &mut errors);

        let reflection = form.reflection.filter(|r| !r.is_empty());
        if let Some(reflection) = &reflection {
            if reflection.chars().count() > MAX_REFLECTION_CHARS {
                errors.add(
                    "reflection",
                    format!("Keep it within {} characters", MAX_REFLECTION_CHARS),
                );
            }
        }

        match (study_date, duration_minutes) {
            (Ok(study_date), Some(duration_minutes)) if errors.is_empty() => Ok(Self {
                study_date,
                content: form.content,
                duration_minutes,
                reflection,
            }),
            _ => Err(errors),
        }
    }

    pub fn study_date(&self) -> NaiveDate {
        self.study_date
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    pub fn reflection(&self) -> Option<&str> {
        self.reflection.as_deref()
    }

    pub(crate) fn into_fields(self) -> crate::domain::StudyLogFields {
        crate::domain::StudyLogFields {
            study_date: self.study_date,
            content: self.content,
            duration_minutes: self.duration_minutes,
            reflection: self.reflection,
        }
    }
}

/// Coerces a text field into a non-negative whole number of minutes.
fn parse_minutes(raw: &str, errors: &mut FieldErrors) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.add("duration_minutes", "Enter a whole number");
        return None;
    }
    if let Ok(minutes) = raw.parse::<i64>() {
        if minutes < 0 {
            errors.add("duration_minutes", "Enter 0 or more");
            return None;
        }
        return match u32::try_from(minutes).ok().filter(|m| *m <= MAX_STUDY_MINUTES) {
            Some(minutes) => Some(minutes),
            None => {
                errors.add("duration_minutes", "Value is too large");
                None
            }
        };
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value < 0.0 => {
            errors.add("duration_minutes", "Enter a whole number");
            errors.add("duration_minutes", "Enter 0 or more");
        }
        _ => errors.add("duration_minutes", "Enter a whole number"),
    }
    None
}

//=========================================================================================
// Listing and Pomodoro Input
//=========================================================================================

/// A checked listing request: 1-based page, bounded page size, optional dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    page: u32,
    page_size: u32,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            start_date: None,
            end_date: None,
        }
    }
}

impl ListQuery {
    pub fn new(
        page: Option<u32>,
        page_size: Option<u32>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let page = page.unwrap_or(1);
        if page == 0 {
            errors.add("page", "Page numbers start at 1");
        }
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            errors.add(
                "page_size",
                format!("Page size must be between 1 and {}", MAX_PAGE_SIZE),
            );
        }
        errors.finish(|| Self {
            page,
            page_size,
            start_date,
            end_date,
        })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn range(&self) -> crate::domain::DateRange {
        crate::domain::DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

/// Length of a completed focus interval, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PomodoroDuration(u32);

impl PomodoroDuration {
    pub fn new(minutes: u32) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        if minutes == 0 || minutes > MAX_POMODORO_MINUTES {
            errors.add(
                "duration_minutes",
                format!("Enter between 1 and {} minutes", MAX_POMODORO_MINUTES),
            );
        }
        errors.finish(|| Self(minutes))
    }

    pub fn minutes(&self) -> u32 {
        self.0
    }
}

//=========================================================================================
// Email
//=========================================================================================

/// An email address that passed a basic shape check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(raw: &str) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let candidate = raw.trim();
        if candidate.is_empty() {
            errors.add("email", "Enter your email address");
        } else if !looks_like_email(candidate) {
            errors.add("email", "Enter a valid email address");
        }
        errors.finish(|| Self(candidate.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn looks_like_email(candidate: &str) -> bool {
    if candidate.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(date: &str, content: &str, minutes: &str) -> StudyLogForm {
        StudyLogForm {
            study_date: date.to_string(),
            content: content.to_string(),
            duration_minutes: minutes.to_string(),
            reflection: None,
        }
    }

    #[test]
    fn accepts_a_well_formed_submission() {
        let input = StudyLogInput::parse(StudyLogForm {
            reflection: Some("went well".into()),
            ..form("2025-04-10", "Rust ownership", "45")
        })
        .unwrap();
        assert_eq!(input.study_date(), NaiveDate::from_ymd_opt(2025, 4, 10).unwrap());
        assert_eq!(input.duration_minutes(), 45);
        assert_eq!(input.reflection(), Some("went well"));
    }

    #[test]
    fn collects_errors_for_every_bad_field() {
        let errors = StudyLogInput::parse(form("10/04/2025", "   ", "2.5")).unwrap_err();
        assert!(errors.get("study_date").is_some());
        assert!(errors.get("content").is_some());
        assert_eq!(errors.get("duration_minutes").unwrap(), ["Enter a whole number"]);
    }

    #[test]
    fn rejects_negative_durations_and_oversized_text() {
        let errors = StudyLogInput::parse(StudyLogForm {
            reflection: Some("r".repeat(MAX_REFLECTION_CHARS + 1)),
            ..form("2025-04-10", &"c".repeat(MAX_CONTENT_CHARS + 1), "-5")
        })
        .unwrap_err();
        assert_eq!(errors.get("duration_minutes").unwrap(), ["Enter 0 or more"]);
        assert!(errors.get("content").is_some());
        assert!(errors.get("reflection").is_some());
    }

    #[test]
    fn empty_reflection_is_treated_as_absent() {
        let input = StudyLogInput::parse(StudyLogForm {
            reflection: Some(String::new()),
            ..form("2025-04-10", "notes", "0")
        })
        .unwrap();
        assert_eq!(input.reflection(), None);
        assert_eq!(input.duration_minutes(), 0);
    }

    #[test]
    fn content_limit_counts_characters_not_bytes() {
        let content = "学".repeat(MAX_CONTENT_CHARS);
        assert!(StudyLogInput::parse(form("2025-04-10", &content, "10")).is_ok());
    }

    #[test]
    fn list_query_defaults_and_bounds() {
        let query = ListQuery::new(None, None, None, None).unwrap();
        assert_eq!((query.page(), query.page_size(), query.offset()), (1, 10, 0));

        let third = ListQuery::new(Some(3), Some(20), None, None).unwrap();
        assert_eq!(third.offset(), 40);

        let errors = ListQuery::new(Some(0), Some(500), None, None).unwrap_err();
        assert!(errors.get("page").is_some());
        assert!(errors.get("page_size").is_some());
    }

    #[test]
    fn minutes_must_fit_the_stored_range() {
        let at_limit = StudyLogInput::parse(form("2025-04-10", "c", &MAX_STUDY_MINUTES.to_string()));
        assert_eq!(at_limit.unwrap().duration_minutes(), MAX_STUDY_MINUTES);

        let errors = StudyLogInput::parse(form("2025-04-10", "c", "3000000000")).unwrap_err();
        assert_eq!(errors.get("duration_minutes").unwrap(), ["Value is too large"]);
    }

    #[test]
    fn pomodoro_duration_must_be_positive_and_bounded() {
        assert_eq!(PomodoroDuration::new(25).unwrap().minutes(), 25);
        assert!(PomodoroDuration::new(0).is_err());
        assert!(PomodoroDuration::new(MAX_POMODORO_MINUTES + 1).is_err());
    }

    #[test]
    fn email_shape_check() {
        assert_eq!(EmailAddress::parse(" Ada@Example.com ").unwrap().as_str(), "ada@example.com");
        assert!(EmailAddress::parse("").unwrap_err().get("email").is_some());
        assert!(EmailAddress::parse("no-at-sign").is_err());
        assert!(EmailAddress::parse("a@localhost").is_err());
        assert!(EmailAddress::parse("a b@example.com").is_err());
        assert!(EmailAddress::parse("a@@example.com").is_err());
    }
}
