use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(LanguageId);

/// One programming-language record as the API returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgrammingLanguage {
    pub id: LanguageId,
    pub name: String,
    pub creator: String,
    pub release_year: i32,
    pub paradigm: String,
    pub popularity: f64,
}

impl ProgrammingLanguage {
    pub fn draft(&self) -> LanguageDraft {
        LanguageDraft {
            name: self.name.clone(),
            creator: self.creator.clone(),
            release_year: self.release_year,
            paradigm: self.paradigm.clone(),
            popularity: self.popularity,
        }
    }
}

/// Record body without the server-assigned id, sent on create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageDraft {
    pub name: String,
    pub creator: String,
    pub release_year: i32,
    pub paradigm: String,
    pub popularity: f64,
}

/// Sortable table columns. Serialized as the record's JSON field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Id,
    Name,
    Creator,
    ReleaseYear,
    Paradigm,
    Popularity,
}

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        SortKey::Id,
        SortKey::Name,
        SortKey::Creator,
        SortKey::ReleaseYear,
        SortKey::Paradigm,
        SortKey::Popularity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Id => "id",
            SortKey::Name => "name",
            SortKey::Creator => "creator",
            SortKey::ReleaseYear => "releaseYear",
            SortKey::Paradigm => "paradigm",
            SortKey::Popularity => "popularity",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::Id => "ID",
            SortKey::Name => "Name",
            SortKey::Creator => "Creator",
            SortKey::ReleaseYear => "Release Year",
            SortKey::Paradigm => "Paradigm",
            SortKey::Popularity => "Popularity (%)",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', '_'], "");
        match normalized.as_str() {
            "id" => Some(SortKey::Id),
            "name" => Some(SortKey::Name),
            "creator" => Some(SortKey::Creator),
            "releaseyear" | "year" => Some(SortKey::ReleaseYear),
            "paradigm" => Some(SortKey::Paradigm),
            "popularity" => Some(SortKey::Popularity),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            SortDirection::Ascending => "↑",
            SortDirection::Descending => "↓",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(SortDirection::Ascending),
            "desc" | "descending" => Some(SortDirection::Descending),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_uses_camel_case_field_names() {
        let record = ProgrammingLanguage {
            id: LanguageId(4),
            name: "Rust".into(),
            creator: "Graydon Hoare".into(),
            release_year: 2015,
            paradigm: "Multi-paradigm".into(),
            popularity: 13.5,
        };
        let value = serde_json::to_value(&record).expect("json");
        assert_eq!(value["id"], 4);
        assert_eq!(value["releaseYear"], 2015);
        assert!(value.get("release_year").is_none());
    }

    #[test]
    fn sort_key_parses_cli_spellings() {
        assert_eq!(SortKey::parse("release-year"), Some(SortKey::ReleaseYear));
        assert_eq!(SortKey::parse("releaseYear"), Some(SortKey::ReleaseYear));
        assert_eq!(SortKey::parse("Name"), Some(SortKey::Name));
        assert_eq!(SortKey::parse("rating"), None);
        assert_eq!(
            serde_json::to_string(&SortKey::ReleaseYear).expect("json"),
            "\"releaseYear\""
        );
    }
}
