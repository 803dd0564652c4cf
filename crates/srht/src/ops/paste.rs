//! paste.sr.ht operations.

use crate::Client;
use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::graphql::{Operation, Page};
use crate::ops::collect_pages;
use crate::types::{File, Paste};
use serde::Deserialize;

const PASTE_FIELDS: &str =
    "id created visibility user { canonicalName username } files { filename hash }";

impl Client {
    /// Fetch a paste's metadata and file hashes (no contents).
    ///
    /// # Errors
    ///
    /// `NotFound` when the paste does not exist or is not visible.
    pub fn get_paste(&self, ctx: &RequestContext, id: &str) -> Result<Paste> {
        let op = Operation::new(
            "GetPaste",
            format!("query GetPaste($id: String!) {{ paste(id: $id) {{ {PASTE_FIELDS} }} }}"),
        )
        .var("id", id);

        #[derive(Deserialize)]
        struct Response {
            paste: Option<Paste>,
        }

        let resp: Response = self.router.paste().execute(ctx, &op)?;
        resp.paste
            .ok_or_else(|| Error::not_found(format!("paste '{id}'")))
    }

    /// Fetch the contents of the file with `hash` in paste `id`.
    ///
    /// Runs in two phases: the paste is looked up first so a missing
    /// paste, an empty paste and an unknown hash all surface as
    /// `NotFound` before any contents are requested.
    pub fn get_paste_blob(&self, ctx: &RequestContext, id: &str, hash: &str) -> Result<File> {
        let paste = self.get_paste(ctx, id)?;
        if paste.files.is_empty() {
            return Err(Error::not_found(format!("files in paste '{id}'")));
        }
        if paste.file(hash).is_none() {
            return Err(Error::not_found(format!("file {hash} in paste '{id}'")));
        }

        ctx.check()?;

        let op = Operation::new(
            "GetPasteBlob",
            "query GetPasteBlob($id: String!, $hash: String!) {
                paste(id: $id) { files(hash: $hash) { filename hash contents } }
            }",
        )
        .var("id", id)
        .var("hash", hash);

        #[derive(Deserialize)]
        struct Files {
            #[serde(default)]
            files: Vec<File>,
        }
        #[derive(Deserialize)]
        struct Response {
            paste: Option<Files>,
        }

        let resp: Response = self.router.paste().execute(ctx, &op)?;
        resp.paste
            .and_then(|paste| paste.files.into_iter().find(|file| file.hash == hash))
            .ok_or_else(|| Error::not_found(format!("file {hash} in paste '{id}'")))
    }

    /// All pastes of the authenticated user, newest first as the server
    /// returns them.
    pub fn get_pastes(&self, ctx: &RequestContext) -> Result<Vec<Paste>> {
        #[derive(Deserialize)]
        struct Me {
            pastes: Page<Paste>,
        }
        #[derive(Deserialize)]
        struct Response {
            me: Me,
        }

        let client = self.router.paste();
        collect_pages(ctx, "pastes", |cursor| {
            let op = Operation::new(
                "GetPastes",
                format!(
                    "query GetPastes($cursor: Cursor) {{
                        me {{ pastes(cursor: $cursor) {{ results {{ {PASTE_FIELDS} }} cursor }} }}
                    }}"
                ),
            )
            .var_opt("cursor", cursor);
            let resp: Response = client.execute(ctx, &op)?;
            Ok(resp.me.pastes)
        })
    }
}
