use serde_json::json;

use crate::cli::config::connect_console;
use crate::cli::utils::{fail, output_json};
use crate::cli::OutputFormat;

pub async fn handle(path: String, output_format: OutputFormat) -> anyhow::Result<()> {
    let console = connect_console()?;

    let navigation = match console.navigate(&path).await {
        Ok(navigation) => navigation,
        Err(e) => return fail(&output_format, &e.to_string(), "TOO_MANY_REDIRECTS"),
    };

    match output_format {
        OutputFormat::Json => output_json(&json!({
            "navigation": navigation,
            "tabs": console.tabs(),
            "active_tab": console.active_tab(),
        })),
        OutputFormat::Text => {
            for redirect in &navigation.redirects {
                println!("→ {} redirected to {} ({:?})", redirect.from, redirect.to, redirect.reason);
            }
            println!("At {}", navigation.location);

            let active = console.active_tab();
            for tab in console.tabs() {
                let marker = if active.as_deref() == Some(tab.path.as_str()) { "*" } else { " " };
                println!("{} {:<24} {}", marker, tab.path, tab.title);
            }
            Ok(())
        }
    }
}
