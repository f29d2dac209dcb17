//! Subcommand handlers.
//!
//! Writes, lookups and `watch` go through [`PersonController`]. `list` is a
//! one-shot read, so it takes the first snapshot of the store's live queries
//! directly instead of waiting on the controller's views to settle.

use std::sync::Arc;

use anyhow::{Context as _, Result, anyhow};
use roster_core::{Person, PersonId, PersonStore, district::Districts};
use roster_query::PersonController;
use roster_store_sqlite::SqliteStore;
use tokio::io::{AsyncBufReadExt as _, BufReader};

use crate::{
  EditArgs, NewPersonArgs,
  form::{FormError, PersonForm},
  render,
};

/// Everything a handler needs, built once in `main`.
pub struct Context {
  pub store:      Arc<SqliteStore>,
  pub controller: PersonController<SqliteStore>,
  pub districts:  Districts,
}

impl Context {
  async fn require(&self, id: i64) -> Result<Person> {
    self
      .controller
      .get_by_id(PersonId::new(id))
      .await?
      .ok_or_else(|| anyhow!("no person with id {id}"))
  }
}

// ─── Writes ───────────────────────────────────────────────────────────────────

pub async fn add(ctx: &Context, args: NewPersonArgs) -> Result<()> {
  let form = PersonForm {
    full_name:    args.name.unwrap_or_default(),
    document_id:  args.document.unwrap_or_default(),
    phone:        args.phone.unwrap_or_default(),
    address:      args.address.unwrap_or_default(),
    district:     args
      .district
      .or_else(|| ctx.districts.first().map(str::to_owned))
      .unwrap_or_default(),
    civil_status: args.civil_status,
  };
  form.validate(&ctx.districts)?;

  if !ctx
    .controller
    .is_document_id_unique(&form.document_id, None)
    .await?
  {
    return Err(FormError::DuplicateDocumentId(form.document_id).into());
  }

  let saved = ctx
    .controller
    .create(form.into_person(PersonId::UNSET))
    .await
    .context("failed to save person")?;
  println!("Person registered: {} (id {})", saved.full_name, saved.id);
  Ok(())
}

pub async fn edit(ctx: &Context, id: i64, changes: EditArgs) -> Result<()> {
  let existing = ctx.require(id).await?;

  let mut form = PersonForm::from_person(&existing);
  if let Some(name) = changes.name {
    form.full_name = name;
  }
  if let Some(phone) = changes.phone {
    form.phone = phone;
  }
  if let Some(address) = changes.address {
    form.address = address;
  }
  if let Some(district) = changes.district {
    form.district = district;
  }
  if changes.clear_civil_status {
    form.civil_status = None;
  } else if let Some(status) = changes.civil_status {
    form.civil_status = Some(status);
  }
  form.validate(&ctx.districts)?;

  if !ctx
    .controller
    .is_document_id_unique(&form.document_id, Some(existing.id))
    .await?
  {
    return Err(FormError::DuplicateDocumentId(form.document_id).into());
  }

  ctx
    .controller
    .update(form.into_person(existing.id))
    .await
    .context("failed to update person")?;
  println!("Person updated: id {}", existing.id);
  Ok(())
}

pub async fn delete(ctx: &Context, id: i64) -> Result<()> {
  let person = ctx.require(id).await?;
  ctx
    .controller
    .delete(&person)
    .await
    .context("failed to delete person")?;
  println!("Person deleted: {}", person.full_name);
  Ok(())
}

// ─── Reads ────────────────────────────────────────────────────────────────────

pub async fn show(ctx: &Context, id: i64) -> Result<()> {
  let person = ctx.require(id).await?;
  print!("{}", render::details(&person));
  Ok(())
}

/// Print the first snapshot of the full list, or of a search over it.
pub async fn list(ctx: &Context, search: Option<String>, json: bool) -> Result<()> {
  let all = ctx
    .store
    .get_all()
    .next()
    .await
    .context("store closed")?
    .context("failed to list persons")?;

  let shown = match search.as_deref() {
    Some(q) if !q.trim().is_empty() => ctx
      .store
      .search(q)
      .next()
      .await
      .context("store closed")?
      .context("failed to search persons")?,
    _ => all.clone(),
  };

  if json {
    println!("{}", serde_json::to_string_pretty(&shown)?);
  } else {
    print!("{}", render::table(&shown));
    println!("{}", render::status_line(shown.len(), all.len()));
  }
  Ok(())
}

/// Live incremental search driven by stdin, one search text per line.
pub async fn watch(ctx: &Context) -> Result<()> {
  let mut filtered = ctx.controller.filtered_records();
  let all = ctx.controller.all_records();
  let mut failure = ctx.controller.storage_failure();

  let mut lines = BufReader::new(tokio::io::stdin()).lines();

  loop {
    tokio::select! {
      changed = filtered.changed() => {
        changed.context("controller stopped")?;
        let shown = filtered.borrow_and_update().clone();
        print!("{}", render::table(&shown));
        println!("{}", render::status_line(shown.len(), all.borrow().len()));
      }
      changed = failure.changed() => {
        changed.context("controller stopped")?;
        let failed = failure.borrow_and_update().clone();
        if let Some(e) = failed {
          return Err(anyhow!("storage failure: {e}"));
        }
      }
      line = lines.next_line() => {
        match line.context("failed to read stdin")? {
          Some(text) => ctx.controller.set_search_text(text),
          None => return Ok(()),
        }
      }
    }
  }
}
