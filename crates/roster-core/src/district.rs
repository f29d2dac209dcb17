//! The static list of district names offered when recording a person.
//!
//! Districts are configuration, not data: nothing here is persisted, and the
//! store accepts any string in the `district` column.

/// Districts offered when no list is configured.
pub const DEFAULT_DISTRICTS: &[&str] = &[
  "Ate",
  "Barranco",
  "Breña",
  "Chorrillos",
  "Comas",
  "Independencia",
  "Jesús María",
  "La Molina",
  "La Victoria",
  "Lima",
  "Lince",
  "Los Olivos",
  "Magdalena del Mar",
  "Miraflores",
  "Pueblo Libre",
  "Rímac",
  "San Borja",
  "San Isidro",
  "San Juan de Lurigancho",
  "San Juan de Miraflores",
  "San Martín de Porres",
  "San Miguel",
  "Santiago de Surco",
  "Surquillo",
  "Villa El Salvador",
  "Villa María del Triunfo",
];

/// Civil status values offered by the entry form. Absent means "not
/// specified".
pub const CIVIL_STATUSES: &[&str] = &["Soltero(a)", "Casado(a)"];

/// Owned list of district names, defaulting to [`DEFAULT_DISTRICTS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Districts(Vec<String>);

impl Districts {
  pub fn new(names: Vec<String>) -> Self { Self(names) }

  pub fn contains(&self, name: &str) -> bool {
    self.0.iter().any(|d| d == name)
  }

  /// The first district; entry forms preselect it.
  pub fn first(&self) -> Option<&str> { self.0.first().map(String::as_str) }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.0.iter().map(String::as_str)
  }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl Default for Districts {
  fn default() -> Self {
    Self(DEFAULT_DISTRICTS.iter().map(|d| (*d).to_owned()).collect())
  }
}
