//! Status command handler

use anyhow::Result;

use eduverse_core::{Config, Session};

use super::Context;
use crate::output::{Output, OutputFormat};

/// Show login, server and draft status
pub async fn show(ctx: &Context, output: &Output) -> Result<()> {
    let config = &ctx.config;
    let session = Session::restore(ctx.api(), ctx.store().as_ref()).await?;
    let claims = session.as_ref().and_then(Session::claims);
    let user = session.as_ref().and_then(Session::user);
    let drafts = ctx.note_sync().await?.list_drafts().await?;
    let config_file = ctx
        .config_path
        .clone()
        .unwrap_or_else(Config::config_file_path);

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "api_url": config.api_url,
                    "data_dir": config.data_dir,
                    "config_file": config_file,
                    "logged_in": session.is_some(),
                    "token": claims.as_ref().map(|c| serde_json::json!({
                        "subject": c.sub,
                        "expires_at": c.expires_at(),
                        "expired": c.is_expired(),
                    })),
                    "user": user,
                    "drafts": {
                        "count": drafts.drafts.len(),
                        "skipped": drafts.skipped.len()
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", drafts.drafts.len());
        }
        OutputFormat::Human => {
            println!("EduVerse Status");
            println!("===============");
            println!();
            println!("Server:");
            println!("  URL:     {}", config.api_url);
            println!("  Timeout: {}s", config.timeout_secs);
            println!();
            println!("Session:");
            match &session {
                None => println!("  Not logged in"),
                Some(_) => {
                    match user {
                        Some(user) => println!("  User:    {} <{}>", user.username, user.email),
                        None => println!("  User:    (profile not cached)"),
                    }
                    if let Some(ref claims) = claims {
                        if let Some(ref sub) = claims.sub {
                            println!("  Subject: {}", sub);
                        }
                        if let Some(expires) = claims.expires_at() {
                            let state = if claims.is_expired() { " (expired)" } else { "" };
                            println!(
                                "  Expires: {}{}",
                                expires.format("%Y-%m-%d %H:%M UTC"),
                                state
                            );
                        }
                    }
                }
            }
            println!();
            println!("Local:");
            println!("  Config:   {}", config_file.display());
            println!("  Data dir: {}", config.data_dir.display());
            println!("  Drafts:   {}", drafts.drafts.len());
            if !drafts.skipped.is_empty() {
                println!("  Unreadable draft records: {}", drafts.skipped.len());
            }
        }
    }

    Ok(())
}
