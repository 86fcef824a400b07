use clap::Subcommand;
use serde_json::json;

use crate::cli::config::connect_console;
use crate::cli::utils::{fail, output_empty_collection, output_json, output_success};
use crate::cli::OutputFormat;
use crate::tabs::TabManager;

#[derive(Subcommand)]
pub enum TabsCommands {
    #[command(about = "List open tabs")]
    List,

    #[command(about = "Close a tab and drop its page cache")]
    Close {
        #[arg(help = "Path of the tab to close")]
        path: String,
    },

    #[command(about = "Close every tab except Home")]
    Clear {
        #[arg(long, help = "Close Home as well")]
        all: bool,
    },
}

pub async fn handle(cmd: TabsCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let console = connect_console()?;

    match cmd {
        TabsCommands::List => {
            let tabs = console.tabs();
            if tabs.is_empty() {
                return output_empty_collection(&output_format, "tabs", "No open tabs");
            }

            let active = console.active_tab();
            match output_format {
                OutputFormat::Json => {
                    let cached: Vec<&str> = tabs
                        .iter()
                        .filter(|tab| console.cached(&tab.path).is_some())
                        .map(|tab| tab.path.as_str())
                        .collect();
                    output_json(&json!({ "tabs": tabs, "active_tab": active, "cached": cached }))
                }
                OutputFormat::Text => {
                    for tab in &tabs {
                        let marker = if active.as_deref() == Some(tab.path.as_str()) { "*" } else { " " };
                        let cache = if console.cached(&tab.path).is_some() { "cached" } else { "" };
                        println!("{} {:<24} {:<20} {}", marker, tab.path, tab.title, cache);
                    }
                    Ok(())
                }
            }
        }

        TabsCommands::Close { path } => {
            if path == console.config().routes.home_path {
                return fail(&output_format, "The Home tab cannot be closed", "HOME_TAB_PINNED");
            }
            if !console.tabs().iter().any(|tab| tab.path == path) {
                return fail(&output_format, &format!("No open tab for {}", path), "TAB_NOT_FOUND");
            }

            let next = console.close_tab(&path).await?;
            let location = next.map(|navigation| navigation.location);
            output_success(
                &output_format,
                &format!("Closed {}", path),
                Some(json!({ "active_tab": console.active_tab(), "location": location })),
            )
        }

        TabsCommands::Clear { all } => {
            if all {
                console.with_tabs(TabManager::clear_all_tabs);
                return output_success(&output_format, "Closed all tabs", None);
            }

            let navigation = console.clear_tabs().await?;
            output_success(
                &output_format,
                "Closed all tabs except Home",
                Some(json!({ "location": navigation.location })),
            )
        }
    }
}
