//! Read-only lookups: user, repository, paste, blob and paste list

use anyhow::{Context as AnyhowContext, Result};
use chrono::{DateTime, Utc};
use declarative::ResourceType;
use serde_json::{Value, json};
use srht::{Paste, User};

use super::Session;
use crate::Context;
use crate::cli::ShowCommand;
use crate::resource::{Api, RepositoryType};
use crate::ui;

pub fn run(ctx: &Context, what: ShowCommand, as_json: bool) -> Result<()> {
    let session = Session::open(ctx, false)?;
    let (title, value) = lookup(&session.api, &what)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        ui::header(&title);
        print_value(&value);
    }
    Ok(())
}

/// Fetch one data source as a title and flat JSON attributes
fn lookup(api: &Api, what: &ShowCommand) -> Result<(String, Value)> {
    let client = api.client();
    let rctx = api.ctx();

    match what {
        ShowCommand::User => {
            let user = client.get_current_user(&rctx)?;
            Ok((format!("User {}", user.canonical_name), user_value(&user)))
        }
        ShowCommand::Repo { name } => {
            let data = RepositoryType::new(api.clone())
                .import(name)?
                .with_context(|| format!("Repository '{name}' not found"))?;
            Ok((format!("Repository {name}"), json!(data.attributes)))
        }
        ShowCommand::Paste { id } => {
            let paste = client.get_paste(&rctx, id)?;
            Ok((format!("Paste {id}"), paste_value(&paste)))
        }
        ShowCommand::Blob { id, hash } => {
            let paste = client.get_paste(&rctx, id)?;
            let file = client.get_paste_blob(&rctx, id, hash)?;
            let (created, created_unix) = time_pair(paste.created);
            let value = json!({
                "id": id,
                "hash": file.hash,
                "filename": file.filename,
                "created": created,
                "created_unix": created_unix,
                "contents": file.contents,
            });
            Ok((format!("Blob {hash}"), value))
        }
        ShowCommand::Pastes => {
            let pastes = client.get_pastes(&rctx)?;
            let value = Value::Array(pastes.iter().map(paste_value).collect());
            Ok((format!("Pastes ({})", pastes.len()), value))
        }
    }
}

fn time_pair(time: DateTime<Utc>) -> (Value, Value) {
    (json!(time.to_rfc3339()), json!(time.timestamp()))
}

fn user_value(user: &User) -> Value {
    let (created, created_unix) = time_pair(user.created);
    json!({
        "id": user.id,
        "username": user.username,
        "canonical_name": user.canonical_name,
        "email": user.email,
        "url": user.url,
        "location": user.location,
        "bio": user.bio,
        "created": created,
        "created_unix": created_unix,
        "pgp_keys": user.pgp_keys.iter().map(|k| k.fingerprint.as_str()).collect::<Vec<_>>(),
    })
}

fn paste_value(paste: &Paste) -> Value {
    let (created, created_unix) = time_pair(paste.created);
    json!({
        "id": paste.id,
        "created": created,
        "created_unix": created_unix,
        "visibility": paste.visibility.as_str(),
        "user": paste.user.as_ref().map(|u| u.username.as_str()),
        "canonical_user": paste.user.as_ref().map(|u| u.canonical_name.as_str()),
        "files": paste.files.iter().map(|f| json!({
            "filename": f.filename,
            "hash": f.hash,
        })).collect::<Vec<_>>(),
    })
}

// ============================================================================
// Display
// ============================================================================

fn print_value(value: &Value) {
    match value {
        Value::Array(items) if items.is_empty() => ui::dim("(none)"),
        Value::Array(items) => {
            for item in items {
                println!();
                print_value(item);
            }
        }
        Value::Object(map) => {
            for (key, value) in map {
                if let Some(text) = scalar(value) {
                    ui::kv(key, &text);
                } else if let Value::Array(items) = value {
                    ui::kv(key, &format!("{} item(s)", items.len()));
                    for item in items {
                        ui::dim(&format!("  • {}", scalar(item).unwrap_or_else(|| inline(item))));
                    }
                }
            }
        }
        other => println!("{}", scalar(other).unwrap_or_default()),
    }
}

/// Display text of a scalar; `None` for arrays and objects
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some("-".to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// One-line `key=value` rendering of an object
fn inline(value: &Value) -> String {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{k}={}", scalar(v).unwrap_or_else(|| v.to_string())))
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
