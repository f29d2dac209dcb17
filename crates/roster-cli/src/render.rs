//! Plain-text rendering of persons and lists.

use std::fmt::Write as _;

use roster_core::{Person, district::Districts};

const NOT_SPECIFIED: &str = "Not specified";

/// One table row per person.
pub fn table(persons: &[Person]) -> String {
  let mut out = String::new();
  for p in persons {
    let _ = writeln!(
      out,
      "{:>5}  {:<32} {:<12} {}",
      p.id, p.full_name, p.document_id, p.district
    );
  }
  out
}

/// Every field of one person, one per line.
pub fn details(p: &Person) -> String {
  let civil_status = p.civil_status.as_deref().unwrap_or(NOT_SPECIFIED);
  format!(
    "Id:            {}\n\
     Full name:     {}\n\
     Document id:   {}\n\
     Phone:         {}\n\
     Address:       {}\n\
     District:      {}\n\
     Civil status:  {}\n",
    p.id, p.full_name, p.document_id, p.phone, p.address, p.district, civil_status,
  )
}

pub fn status_line(shown: usize, total: usize) -> String {
  format!("Showing {shown} of {total} records")
}

pub fn districts(districts: &Districts) -> String {
  districts.iter().fold(String::new(), |mut out, d| {
    let _ = writeln!(out, "{d}");
    out
  })
}
