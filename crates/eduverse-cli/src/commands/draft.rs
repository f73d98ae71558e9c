//! Draft command handlers

use anyhow::{bail, Result};

use eduverse_core::KeyValueStore;

use super::Context;
use crate::editor::confirm;
use crate::output::Output;

/// List local drafts, including unreadable records
pub async fn list(ctx: &Context, output: &Output) -> Result<()> {
    let listing = ctx.note_sync().await?.list_drafts().await?;
    output.print_drafts(&listing);
    Ok(())
}

/// Delete a draft by key
pub async fn delete(ctx: &Context, key: String, force: bool, output: &Output) -> Result<()> {
    if !force && output.should_prompt() && !confirm(&format!("Delete draft {}?", key))? {
        output.message("Cancelled.");
        return Ok(());
    }

    remove(ctx, &key).await?;
    output.success(&format!("Deleted draft {}", key));
    Ok(())
}

/// Remove a key from the draft namespace
///
/// Unreadable records can be removed too.
pub(crate) async fn remove(ctx: &Context, key: &str) -> Result<()> {
    let sync = ctx.note_sync().await?;
    if !sync.drafts().owns_key(key) {
        bail!(
            "'{}' is not a draft key (draft keys start with {}_)",
            key,
            sync.drafts().prefix()
        );
    }
    if sync.drafts().store().get(key).await?.is_none() {
        bail!("No draft with key {}", key);
    }
    sync.delete_draft(key).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eduverse_core::Config;

    #[tokio::test]
    async fn test_remove_unreadable_draft() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let ctx = Context::open(config, None).unwrap();
        ctx.store()
            .set("@eduverse_drafts_broken", "{not json")
            .await
            .unwrap();

        remove(&ctx, "@eduverse_drafts_broken").await.unwrap();

        assert!(ctx
            .store()
            .get("@eduverse_drafts_broken")
            .await
            .unwrap()
            .is_none());
        assert!(remove(&ctx, "@eduverse_drafts_broken").await.is_err());
        assert!(remove(&ctx, "@user").await.is_err());
    }
}
