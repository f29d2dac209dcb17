//! Entry-form validation.
//!
//! The store accepts any field content; these are the checks the entry form
//! applies before a person is written.

use roster_core::{
  Person, PersonId,
  district::{CIVIL_STATUSES, Districts},
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
  #[error("missing fields: {}", .0.join(", "))]
  MissingFields(Vec<&'static str>),

  #[error("unknown district: {0:?} (see `roster districts`)")]
  UnknownDistrict(String),

  #[error("unknown civil status: {0:?} (expected one of {expected:?})", expected = CIVIL_STATUSES)]
  UnknownCivilStatus(String),

  #[error("document id {0:?} already exists")]
  DuplicateDocumentId(String),
}

/// The editable fields of a person.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonForm {
  pub full_name:    String,
  pub document_id:  String,
  pub phone:        String,
  pub address:      String,
  pub district:     String,
  pub civil_status: Option<String>,
}

impl PersonForm {
  pub fn from_person(person: &Person) -> Self {
    Self {
      full_name:    person.full_name.clone(),
      document_id:  person.document_id.clone(),
      phone:        person.phone.clone(),
      address:      person.address.clone(),
      district:     person.district.clone(),
      civil_status: person.civil_status.clone(),
    }
  }

  /// Labels of the required fields that are blank, in form order.
  pub fn missing_fields(&self) -> Vec<&'static str> {
    [
      ("full name", &self.full_name),
      ("document id", &self.document_id),
      ("phone", &self.phone),
      ("address", &self.address),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(label, _)| label)
    .collect()
  }

  pub fn validate(&self, districts: &Districts) -> Result<(), FormError> {
    let missing = self.missing_fields();
    if !missing.is_empty() {
      return Err(FormError::MissingFields(missing));
    }
    if !districts.contains(&self.district) {
      return Err(FormError::UnknownDistrict(self.district.clone()));
    }
    if let Some(status) = &self.civil_status
      && !CIVIL_STATUSES.contains(&status.as_str())
    {
      return Err(FormError::UnknownCivilStatus(status.clone()));
    }
    Ok(())
  }

  pub fn into_person(self, id: PersonId) -> Person {
    Person {
      id,
      full_name: self.full_name,
      document_id: self.document_id,
      phone: self.phone,
      address: self.address,
      district: self.district,
      civil_status: self.civil_status,
    }
  }
}
