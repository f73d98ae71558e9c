//! Login, logout and registration handlers

use anyhow::{Context as _, Result};

use eduverse_core::models::Registration;
use eduverse_core::{Session, User};

use super::Context;
use crate::editor::prompt_line;
use crate::output::{Output, OutputFormat};

/// Log in and store the token
pub async fn login(
    ctx: &Context,
    username: Option<String>,
    password: Option<String>,
    output: &Output,
) -> Result<()> {
    let username = match username {
        Some(u) => u,
        None => prompt_line("Username: ")?,
    };
    let password = match password {
        Some(p) => p,
        None => prompt_line("Password: ")?,
    };

    let session = Session::login(ctx.api(), ctx.store().as_ref(), &username, &password)
        .await
        .context("Login failed")?;

    match output.format {
        OutputFormat::Json => output.json(&serde_json::json!({
            "status": "success",
            "username": username,
            "user": session.user(),
        })),
        OutputFormat::Quiet => {}
        OutputFormat::Human => {
            println!("✓ Logged in as {}", username);
            if session.user().is_none() {
                println!("  (profile could not be fetched; try `eduverse status` later)");
            }
        }
    }

    Ok(())
}

/// Forget the stored token and profile
pub async fn logout(ctx: &Context, output: &Output) -> Result<()> {
    Session::logout(ctx.store().as_ref())
        .await
        .context("Failed to clear session")?;
    output.success("Logged out");
    Ok(())
}

/// Create an account
pub async fn register(
    ctx: &Context,
    email: String,
    username: String,
    password: Option<String>,
    full_name: Option<String>,
    output: &Output,
) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => prompt_line("Password: ")?,
    };

    let registration = Registration {
        email,
        username,
        password,
        full_name,
    };

    let user = ctx
        .api()
        .register(&registration)
        .await
        .context("Registration failed")?;

    print_user(&user, output);
    if output.should_prompt() {
        println!();
        println!("Log in with: eduverse login {}", user.username);
    }
    Ok(())
}

fn print_user(user: &User, output: &Output) {
    match output.format {
        OutputFormat::Json => output.json(user),
        OutputFormat::Quiet => println!("{}", user.id),
        OutputFormat::Human => {
            println!("✓ Registered {} <{}>", user.username, user.email);
            if let Some(ref name) = user.full_name {
                println!("  Name: {}", name);
            }
        }
    }
}
