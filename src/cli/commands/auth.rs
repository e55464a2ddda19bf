//! Account command handlers

use std::io::Write;

use crate::services::AuthError;
use crate::state::AppState;

fn read_password(password: Option<String>) -> anyhow::Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    print!("Password: ");
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn cmd_register(
    state: &AppState,
    email: &str,
    name: &str,
    password: Option<String>,
) -> anyhow::Result<()> {
    let password = read_password(password)?;

    match state.auth.register(email, &password, name).await {
        Ok(user_id) => {
            println!("✓ Registered {name} <{email}>");
            println!("  User ID: {user_id}");
            Ok(())
        }
        Err(AuthError::Validation(reason)) => {
            println!("Cannot register: {reason}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn cmd_login(
    state: &AppState,
    email: &str,
    password: Option<String>,
) -> anyhow::Result<()> {
    let password = read_password(password)?;

    match state.auth.login(email, &password).await {
        Ok(session) => {
            println!("✓ Signed in as {email}");
            println!("  User ID: {}", session.user_id);
            Ok(())
        }
        Err(AuthError::InvalidCredentials) => {
            println!("Invalid email or password.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn cmd_logout(state: &AppState) -> anyhow::Result<()> {
    match state.auth.logout().await {
        Ok(()) => println!("✓ Signed out"),
        Err(AuthError::NotSignedIn) => println!("Not signed in."),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub async fn cmd_whoami(state: &AppState) -> anyhow::Result<()> {
    let Some(profile) = state.auth.current_profile().await? else {
        println!("Not signed in.");
        println!();
        println!("Sign in with: dramatracker login --email <email>");
        return Ok(());
    };

    println!("Signed-in User");
    println!("{:-<60}", "");
    println!("Name:    {}", profile.name);
    println!("Email:   {}", profile.email);
    println!("User ID: {}", profile.user_id);
    println!("Avatar:  {}", profile.avatar_url);
    if profile.document_id.is_none() {
        println!();
        println!("⚠ No user document found for this account.");
    }

    Ok(())
}
