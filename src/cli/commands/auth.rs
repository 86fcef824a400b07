use chrono::Utc;
use clap::Subcommand;
use serde_json::json;

use crate::cli::config::connect_console;
use crate::cli::utils::{fail, output_json, output_success, prompt_line};
use crate::cli::OutputFormat;
use crate::session::peek_claims;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login and load permissions and routes")]
    Login {
        #[arg(help = "Username")]
        username: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Logout and clear all local state")]
    Logout {
        #[arg(long, short, help = "Skip the confirmation prompt")]
        yes: bool,
    },

    #[command(about = "Show current authentication status")]
    Status,

    #[command(about = "Refresh authentication token")]
    Refresh,

    #[command(about = "Show current user information")]
    Whoami,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let console = connect_console()?;

    match cmd {
        AuthCommands::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt_line("Password: ")?,
            };

            if !console.login(&username, &password).await {
                return fail(&output_format, "Login failed", "LOGIN_FAILED");
            }

            let routes = console.registrar().dynamic_route_names();
            output_success(
                &output_format,
                &format!("Logged in as {} ({} routes)", username, routes.len()),
                Some(json!({ "username": username, "routes": routes })),
            )
        }

        AuthCommands::Logout { yes } => {
            if !console.session().logged_in() {
                return output_success(&output_format, "Not logged in", None);
            }

            let skip_confirm = yes || !console.config().session.confirm_logout;
            if console.logout(true, skip_confirm).await {
                output_success(&output_format, "Logged out", None)
            } else {
                output_success(&output_format, "Logout cancelled", Some(json!({ "cancelled": true })))
            }
        }

        AuthCommands::Status => {
            let session = console.session().snapshot();
            let claims = peek_claims(&session.access_token);
            let expires_at = claims.as_ref().and_then(|c| c.expires_at());
            let expired = claims.as_ref().map(|c| c.is_expired_at(Utc::now()));

            match output_format {
                OutputFormat::Json => output_json(&json!({
                    "logged_in": session.logged_in(),
                    "username": session.username,
                    "updated_at": session.updated_at,
                    "expires_at": expires_at,
                    "expired": expired,
                })),
                OutputFormat::Text => {
                    if !session.logged_in() {
                        println!("Not logged in");
                        return Ok(());
                    }
                    println!("Logged in as {}", session.username.as_deref().unwrap_or("<unknown>"));
                    if let Some(updated_at) = session.updated_at {
                        println!("Token issued: {}", updated_at.to_rfc3339());
                    }
                    match (expires_at, expired) {
                        (Some(at), Some(true)) => println!("Access token expired at {}", at.to_rfc3339()),
                        (Some(at), _) => println!("Access token expires at {}", at.to_rfc3339()),
                        _ => println!("Access token expiry unknown"),
                    }
                    Ok(())
                }
            }
        }

        AuthCommands::Refresh => {
            if !console.session().logged_in() {
                return fail(&output_format, "Not logged in", "NOT_AUTHENTICATED");
            }
            if !console.refresh_auth().await {
                return fail(&output_format, "Token refresh failed; session cleared", "REFRESH_FAILED");
            }
            output_success(&output_format, "Token refreshed", None)
        }

        AuthCommands::Whoami => {
            if !console.session().logged_in() {
                return fail(&output_format, "Not logged in", "NOT_AUTHENTICATED");
            }
            if !console.user().fetch_profile().await {
                return fail(&output_format, "Could not load user profile", "PROFILE_UNAVAILABLE");
            }

            let Some(profile) = console.user().profile() else {
                return fail(&output_format, "Could not load user profile", "PROFILE_UNAVAILABLE");
            };
            match output_format {
                OutputFormat::Json => output_json(&serde_json::to_value(&profile)?),
                OutputFormat::Text => {
                    println!("{} ({})", profile.name, profile.username);
                    let roles: Vec<&str> = profile.roles.iter().map(|r| r.name.as_str()).collect();
                    if !roles.is_empty() {
                        println!("Roles: {}", roles.join(", "));
                    }
                    if let Some(signature) = profile.signature.as_deref() {
                        println!("{}", signature);
                    }
                    Ok(())
                }
            }
        }
    }
}
