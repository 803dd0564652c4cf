pub mod apply;
pub mod show;

use anyhow::{Context as AnyhowContext, Result};
use std::path::PathBuf;
use std::sync::Arc;

use crate::Context;
use crate::manifest::Manifest;
use crate::paths;
use crate::resource::Api;

/// Loaded manifest plus a client configured from it
pub struct Session {
    pub manifest: Manifest,
    pub state_path: PathBuf,
    pub api: Api,
}

impl Session {
    /// Open the manifest and build the client
    ///
    /// With `require_manifest` unset a missing manifest falls back to
    /// environment-only provider settings.
    pub fn open(ctx: &Context, require_manifest: bool) -> Result<Self> {
        let manifest_path = paths::manifest_path(ctx.manifest.as_deref())?;
        let manifest = if require_manifest {
            Manifest::load(&manifest_path).with_context(|| {
                format!(
                    "No manifest found. Create {} or pass --manifest",
                    manifest_path.display()
                )
            })?
        } else {
            Manifest::load_or_default(&manifest_path)?
        };

        let settings = manifest.provider.resolve()?;
        log::debug!("Provider settings: {settings:?}");
        let client = settings.client()?;

        Ok(Self {
            manifest,
            state_path: paths::state_path(ctx.state.as_deref())?,
            api: Api::new(Arc::new(client), settings.timeout),
        })
    }
}
