//! Client-side checks run before any create, update or login request is sent.

use chrono::{Datelike, Utc};
use shared::domain::{LanguageDraft, ProgrammingLanguage};

use crate::ValidationErrors;

const MIN_TEXT_LEN: usize = 2;
const MIN_PASSWORD_LEN: usize = 6;
const EARLIEST_RELEASE_YEAR: i32 = 1900;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.username.chars().count() < MIN_TEXT_LEN {
            errors.push("username", "Username must be at least 2 characters.");
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.push("password", "Password must be at least 6 characters.");
        }
        errors.into_result(())
    }
}

/// Raw text of the add/edit form, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageForm {
    pub name: String,
    pub creator: String,
    pub release_year: String,
    pub paradigm: String,
    pub popularity: String,
}

impl LanguageForm {
    pub fn from_language(language: &ProgrammingLanguage) -> Self {
        Self {
            name: language.name.clone(),
            creator: language.creator.clone(),
            release_year: language.release_year.to_string(),
            paradigm: language.paradigm.clone(),
            popularity: language.popularity.to_string(),
        }
    }

    pub fn validate(&self) -> Result<LanguageDraft, ValidationErrors> {
        self.validate_for_year(Utc::now().year())
    }

    pub fn validate_for_year(&self, current_year: i32) -> Result<LanguageDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let name = required_text(&mut errors, "name", "Name", &self.name);
        let creator = required_text(&mut errors, "creator", "Creator", &self.creator);
        let paradigm = required_text(&mut errors, "paradigm", "Paradigm", &self.paradigm);

        let release_year = match self.release_year.trim().parse::<i32>() {
            Ok(year) if year < EARLIEST_RELEASE_YEAR => {
                errors.push("releaseYear", "Release year must be valid.");
                year
            }
            Ok(year) if year > current_year => {
                errors.push("releaseYear", "Release year cannot be in the future.");
                year
            }
            Ok(year) => year,
            Err(_) => {
                errors.push("releaseYear", "Release year must be valid.");
                0
            }
        };

        let popularity = match self.popularity.trim().parse::<f64>() {
            Ok(value) if value.is_finite() && (0.0..=100.0).contains(&value) => value,
            _ => {
                errors.push("popularity", "Popularity must be between 0 and 100.");
                0.0
            }
        };

        errors.into_result(LanguageDraft {
            name,
            creator,
            release_year,
            paradigm,
            popularity,
        })
    }
}

fn required_text(
    errors: &mut ValidationErrors,
    field: &'static str,
    label: &str,
    raw: &str,
) -> String {
    let value = raw.trim();
    if value.chars().count() < MIN_TEXT_LEN {
        errors.push(field, format!("{label} must be at least 2 characters."));
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> LanguageForm {
        LanguageForm {
            name: " Rust ".into(),
            creator: "Graydon Hoare".into(),
            release_year: "2015".into(),
            paradigm: "Multi-paradigm".into(),
            popularity: "13.05".into(),
        }
    }

    #[test]
    fn valid_form_produces_trimmed_draft() {
        let draft = filled().validate_for_year(2026).expect("valid form");
        assert_eq!(draft.name, "Rust");
        assert_eq!(draft.release_year, 2015);
        assert!((draft.popularity - 13.05).abs() < f64::EPSILON);
    }

    #[test]
    fn reports_every_failing_field() {
        let form = LanguageForm {
            name: "R".into(),
            creator: String::new(),
            release_year: "2031".into(),
            paradigm: "OO".into(),
            popularity: "101".into(),
        };
        let errors = form.validate_for_year(2026).expect_err("invalid form");
        assert_eq!(
            errors.for_field("name"),
            Some("Name must be at least 2 characters.")
        );
        assert_eq!(
            errors.for_field("creator"),
            Some("Creator must be at least 2 characters.")
        );
        assert_eq!(
            errors.for_field("releaseYear"),
            Some("Release year cannot be in the future.")
        );
        assert_eq!(
            errors.for_field("popularity"),
            Some("Popularity must be between 0 and 100.")
        );
        assert!(errors.for_field("paradigm").is_none());
    }

    #[test]
    fn rejects_years_before_1900_and_non_numbers() {
        let mut form = filled();
        form.release_year = "1899".into();
        let errors = form.validate_for_year(2026).expect_err("too early");
        assert_eq!(errors.for_field("releaseYear"), Some("Release year must be valid."));

        form.release_year = "nineteen".into();
        form.popularity = "NaN".into();
        let errors = form.validate_for_year(2026).expect_err("not numbers");
        assert_eq!(errors.for_field("releaseYear"), Some("Release year must be valid."));
        assert!(errors.for_field("popularity").is_some());
    }

    #[test]
    fn login_form_enforces_minimum_lengths() {
        assert!(LoginForm::new("ada", "secret1").validate().is_ok());
        let errors = LoginForm::new("a", "12345").validate().expect_err("too short");
        assert_eq!(
            errors.to_string(),
            "Username must be at least 2 characters. Password must be at least 6 characters."
        );
    }

    #[test]
    fn edit_form_round_trips_existing_record() {
        let language = ProgrammingLanguage {
            id: shared::domain::LanguageId(3),
            name: "Go".into(),
            creator: "Google".into(),
            release_year: 2009,
            paradigm: "Concurrent".into(),
            popularity: 8.5,
        };
        let draft = LanguageForm::from_language(&language)
            .validate_for_year(2026)
            .expect("valid");
        assert_eq!(draft, language.draft());
    }
}
