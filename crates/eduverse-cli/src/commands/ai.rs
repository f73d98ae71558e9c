//! AI assistant command handlers

use anyhow::{bail, Context as _, Result};

use super::Context;
use crate::output::Output;

/// Which assistant endpoint to call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ask {
    Chat,
    Explain,
    Math,
}

/// Send a prompt and print the reply
pub async fn ask(
    ctx: &Context,
    kind: Ask,
    words: Vec<String>,
    model: Option<String>,
    temperature: f32,
    output: &Output,
) -> Result<()> {
    let prompt = words.join(" ");
    if prompt.trim().is_empty() {
        bail!("Nothing to ask");
    }
    if !(0.0..=2.0).contains(&temperature) {
        bail!("Temperature must be between 0 and 2");
    }

    let session = ctx.session().await?;
    let model = model.unwrap_or_else(|| ctx.config.default_model.clone());
    let client = session.client();

    let reply = match kind {
        Ask::Chat => client.ai_chat(&prompt, &model, temperature).await,
        Ask::Explain => client.ai_explain(&prompt, &model, temperature).await,
        Ask::Math => client.ai_solve_math(&prompt, &model, temperature).await,
    }
    .context("AI request failed")?;

    output.print_ai_reply(&reply);
    Ok(())
}

/// List models the server accepts
pub async fn models(ctx: &Context, output: &Output) -> Result<()> {
    let session = ctx.session().await?;
    let catalog = session.client().ai_models().await?;
    output.print_models(&catalog);
    Ok(())
}
