use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// A person name as published on the inbound topic.
///
/// Missing `name` or `surname` keys decode as empty strings, leaving it to
/// validation to report them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct NameRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patronymic: Option<String>,
}

/// One candidate country as returned by the nationality lookup.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CountryProbability {
    pub country_id: String,
    pub probability: f64,
}

/// A `NameRecord` with every demographic lookup resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub name: String,
    pub surname: String,
    pub patronymic: Option<String>,
    pub age: i32,
    pub gender: String,
    pub nationality: Vec<CountryProbability>,
}

impl EnrichedRecord {
    /// The most probable country code, or `None` when there are no candidates.
    ///
    /// The nationality service returns candidates sorted by descending probability, so
    /// for its responses this is the first candidate. Ties keep the earliest candidate.
    pub fn top_nationality(&self) -> Option<&str> {
        let mut best: Option<&CountryProbability> = None;

        for candidate in &self.nationality {
            match best {
                Some(current) if candidate.probability <= current.probability => {}
                _ => best = Some(candidate),
            }
        }

        best.map(|candidate| candidate.country_id.as_str())
    }
}

/// A row of the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, sqlx::FromRow)]
pub struct PersistedUser {
    pub id: i64,
    pub name: String,
    pub surname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patronymic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
}

/// A user about to be inserted. `None` fields are left out of the insert entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub surname: String,
    pub patronymic: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub nationality: Option<String>,
}

impl NewUser {
    /// Build a sparse insert out of a request body: name and surname must be present.
    pub fn from_patch(patch: UserPatch) -> Result<Self, ValidationError> {
        let patch = patch.into_sparse();

        let name = patch.name.ok_or(ValidationError::MissingField("name"))?;
        let surname = patch.surname.ok_or(ValidationError::MissingField("surname"))?;

        Ok(Self {
            name,
            surname,
            patronymic: patch.patronymic,
            age: patch.age,
            gender: patch.gender,
            nationality: patch.nationality,
        })
    }

    /// Attach the identifier assigned by storage.
    pub fn with_id(self, id: i64) -> PersistedUser {
        PersistedUser {
            id,
            name: self.name,
            surname: self.surname,
            patronymic: self.patronymic,
            age: self.age,
            gender: self.gender,
            nationality: self.nationality,
        }
    }
}

/// Unknown predictions (age 0, empty gender) are left out of the insert, the same way
/// `UserPatch::into_sparse` treats empty values.
impl From<&EnrichedRecord> for NewUser {
    fn from(record: &EnrichedRecord) -> Self {
        Self {
            name: record.name.clone(),
            surname: record.surname.clone(),
            patronymic: record.patronymic.clone().filter(|p| !p.is_empty()),
            age: Some(record.age).filter(|age| *age != 0),
            gender: Some(record.gender.clone()).filter(|g| !g.is_empty()),
            nationality: record.top_nationality().map(str::to_owned),
        }
    }
}

/// A partial set of user fields. Absent fields are left untouched by an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patronymic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
}

impl UserPatch {
    /// Treat empty strings and a zero age as absent.
    pub fn into_sparse(self) -> Self {
        fn present(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.is_empty())
        }

        Self {
            name: present(self.name),
            surname: present(self.surname),
            patronymic: present(self.patronymic),
            age: self.age.filter(|age| *age != 0),
            gender: present(self.gender),
            nationality: present(self.nationality),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.surname.is_none()
            && self.patronymic.is_none()
            && self.age.is_none()
            && self.gender.is_none()
            && self.nationality.is_none()
    }
}

/// One page of a name-filtered user listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: NonZeroU32,
    pub size: NonZeroU32,
    /// Substring matched against `name`. Empty matches everything.
    pub filter: String,
}

impl ListQuery {
    pub fn new(page: NonZeroU32, size: NonZeroU32, filter: &str) -> Self {
        Self {
            page,
            size,
            filter: filter.to_owned(),
        }
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page.get()) - 1) * i64::from(self.size.get())
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size.get())
    }
}
