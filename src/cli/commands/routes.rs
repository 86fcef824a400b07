use clap::Subcommand;
use serde_json::json;

use crate::cli::config::connect_console;
use crate::cli::utils::{fail, output_empty_collection, output_json, output_success};
use crate::cli::OutputFormat;
use crate::router::RouteRecord;

#[derive(Subcommand)]
pub enum RoutesCommands {
    #[command(about = "List registered routes, loading them if needed")]
    List {
        #[arg(long, help = "Only show routes built from the permission tree")]
        dynamic: bool,
    },

    #[command(about = "Drop dynamic routes and load them again from the backend")]
    Reload,
}

fn flag(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "yes",
        Some(false) => "no",
        None => "-",
    }
}

pub async fn handle(cmd: RoutesCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let console = connect_console()?;
    if !console.session().logged_in() {
        return fail(&output_format, "Not logged in", "NOT_AUTHENTICATED");
    }

    match cmd {
        RoutesCommands::List { dynamic } => {
            if !console.registrar().ensure_routes_loaded().await {
                tracing::warn!("Dynamic routes unavailable; listing static routes only");
            }

            let names = console.registrar().dynamic_route_names();
            let routes: Vec<RouteRecord> = console
                .router()
                .get_routes()
                .into_iter()
                .filter(|route| !dynamic || names.contains(&route.name))
                .collect();

            if routes.is_empty() {
                return output_empty_collection(&output_format, "routes", "No routes registered");
            }

            match output_format {
                OutputFormat::Json => output_json(&json!({ "routes": routes })),
                OutputFormat::Text => {
                    println!("{:<20} {:<28} {:<6} {:<6} COMPONENT", "NAME", "PATH", "PERM", "VALID");
                    for route in &routes {
                        println!(
                            "{:<20} {:<28} {:<6} {:<6} {}",
                            route.name,
                            route.path,
                            flag(route.meta.has_permission),
                            flag(route.meta.is_valid),
                            route.component.as_deref().unwrap_or("-"),
                        );
                    }
                    Ok(())
                }
            }
        }

        RoutesCommands::Reload => {
            if !console.registrar().reload_routes().await {
                return fail(&output_format, "Route reload failed", "ROUTE_LOAD_FAILED");
            }
            let names = console.registrar().dynamic_route_names();
            output_success(
                &output_format,
                &format!("Reloaded {} dynamic routes", names.len()),
                Some(json!({ "routes": names })),
            )
        }
    }
}
