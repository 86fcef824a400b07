use clap::Subcommand;
use serde_json::json;

use crate::cli::config::open_persistence;
use crate::cli::utils::{fail, output_json, output_success};
use crate::cli::OutputFormat;
use crate::theme::{self, ThemeConfig, CUSTOM_THEME_ID, PRIMARY_PREFIX, THEME_PRESETS};

#[derive(Subcommand)]
pub enum ThemeCommands {
    #[command(about = "List preset theme colors")]
    Presets,

    #[command(about = "Print the CSS color variants of a theme")]
    Variants {
        #[arg(help = "Theme id (defaults to the saved theme)")]
        id: Option<String>,
        #[arg(long, help = "Color used when the id is 'custom'")]
        custom: Option<String>,
        #[arg(long, help = "Generate dark-mode variants")]
        dark: bool,
    },

    #[command(about = "Save the theme preference")]
    Set {
        #[arg(help = "Theme id, or 'custom'")]
        id: String,
        #[arg(long, help = "Custom color, e.g. #7B2CBF")]
        custom: Option<String>,
        #[arg(long, conflicts_with = "light", help = "Use dark mode")]
        dark: bool,
        #[arg(long, help = "Use light mode")]
        light: bool,
    },
}

pub async fn handle(cmd: ThemeCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = crate::config::config();
    let persistence = open_persistence(config)?;
    let saved = ThemeConfig::load(&persistence);

    match cmd {
        ThemeCommands::Presets => match output_format {
            OutputFormat::Json => {
                let presets: Vec<_> = THEME_PRESETS
                    .iter()
                    .map(|p| json!({ "id": p.id, "name": p.name, "color": p.color }))
                    .collect();
                output_json(&json!({ "presets": presets, "current": saved.theme_color }))
            }
            OutputFormat::Text => {
                for preset in THEME_PRESETS.iter() {
                    let marker = if preset.id == saved.theme_color { "*" } else { " " };
                    println!("{} {:<16} {:<16} {}", marker, preset.id, preset.name, preset.color);
                }
                Ok(())
            }
        },

        ThemeCommands::Variants { id, custom, dark } => {
            let id = id.unwrap_or_else(|| saved.theme_color.clone());
            let custom = custom.unwrap_or_else(|| saved.custom_color.clone());
            let dark = dark || saved.is_dark;

            let variants = match theme::variants_for_theme(&id, &custom, dark) {
                Ok(variants) => variants,
                Err(e) => return fail(&output_format, &e.to_string(), "INVALID_COLOR"),
            };

            match output_format {
                OutputFormat::Json => output_json(&json!({ "theme": id, "dark": dark, "variants": variants })),
                OutputFormat::Text => {
                    for (name, value) in variants.css_variables(PRIMARY_PREFIX) {
                        println!("{}: {};", name, value);
                    }
                    Ok(())
                }
            }
        }

        ThemeCommands::Set { id, custom, dark, light } => {
            if id != CUSTOM_THEME_ID && theme::preset(&id).is_none() {
                return fail(&output_format, &format!("Unknown theme '{}'", id), "UNKNOWN_THEME");
            }

            let mut updated = saved.clone();
            updated.theme_color = id;
            if let Some(custom) = custom {
                updated.custom_color = custom;
            }
            if dark {
                updated.is_dark = true;
            } else if light {
                updated.is_dark = false;
            }

            if let Err(e) = updated.variants() {
                return fail(&output_format, &e.to_string(), "INVALID_COLOR");
            }
            updated.save(&persistence);

            output_success(
                &output_format,
                &format!("Theme set to {}", updated.theme_color),
                Some(json!({ "theme": updated })),
            )
        }
    }
}
