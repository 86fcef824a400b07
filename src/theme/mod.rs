//! Theme colors and their derived variants

use serde::{Deserialize, Serialize};

use crate::error::ThemeError;
use crate::persistence::{Persistence, StorageClass};

pub const CUSTOM_THEME_ID: &str = "custom";
pub const DEFAULT_THEME_ID: &str = "stellar-purple";
pub const DEFAULT_CUSTOM_COLOR: &str = "#7B2CBF";
pub const PRIMARY_PREFIX: &str = "--am-primary";

const THEME_CONFIG_KEY: &str = "theme-config";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemePreset {
    pub id: &'static str,
    pub name: &'static str,
    pub color: &'static str,
}

pub const THEME_PRESETS: [ThemePreset; 5] = [
    ThemePreset { id: "stellar-purple", name: "Stellar Purple", color: "#9266f9" },
    ThemePreset { id: "ocean-blue", name: "Ocean Blue", color: "#32a2d4" },
    ThemePreset { id: "golden-dawn", name: "Golden Dawn", color: "#faad14" },
    ThemePreset { id: "emerald-forest", name: "Emerald Forest", color: "#27AE60" },
    ThemePreset { id: "rose-bloom", name: "Rose Bloom", color: "#E74C3C" },
];

pub fn preset(id: &str) -> Option<&'static ThemePreset> {
    THEME_PRESETS.iter().find(|preset| preset.id == id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogoPosition {
    Sidebar,
    Header,
}

/// User theme preference, kept in durable storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeConfig {
    pub is_dark: bool,
    pub theme_color: String,
    pub custom_color: String,
    pub logo_position: LogoPosition,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            is_dark: false,
            theme_color: DEFAULT_THEME_ID.to_string(),
            custom_color: DEFAULT_CUSTOM_COLOR.to_string(),
            logo_position: LogoPosition::Sidebar,
        }
    }
}

impl ThemeConfig {
    pub fn load(persistence: &Persistence) -> Self {
        persistence
            .read(StorageClass::Durable, THEME_CONFIG_KEY)
            .unwrap_or_default()
    }

    pub fn save(&self, persistence: &Persistence) {
        persistence.write(StorageClass::Durable, THEME_CONFIG_KEY, self);
    }

    /// Base color of the selected theme
    pub fn base_color(&self) -> &str {
        theme_color(&self.theme_color, &self.custom_color)
    }

    pub fn variants(&self) -> Result<ThemeColorVariants, ThemeError> {
        generate_variants(self.base_color(), self.is_dark)
    }
}

/// `custom` selects `custom_color`; unknown ids fall back to the default custom color
pub fn theme_color<'a>(theme_id: &str, custom_color: &'a str) -> &'a str {
    if theme_id == CUSTOM_THEME_ID {
        return custom_color;
    }
    preset(theme_id)
        .map(|preset| preset.color)
        .unwrap_or(DEFAULT_CUSTOM_COLOR)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeColorVariants {
    pub primary: String,
    pub light3: String,
    pub light5: String,
    pub light7: String,
    pub light8: String,
    pub light9: String,
    pub dark2: String,
}

impl ThemeColorVariants {
    /// CSS custom properties, in declaration order
    pub fn css_variables(&self, prefix: &str) -> Vec<(String, String)> {
        vec![
            (prefix.to_string(), self.primary.clone()),
            (format!("{}-light-3", prefix), self.light3.clone()),
            (format!("{}-light-5", prefix), self.light5.clone()),
            (format!("{}-light-7", prefix), self.light7.clone()),
            (format!("{}-light-8", prefix), self.light8.clone()),
            (format!("{}-light-9", prefix), self.light9.clone()),
            (format!("{}-dark-2", prefix), self.dark2.clone()),
        ]
    }
}

pub fn generate_variants(color: &str, dark: bool) -> Result<ThemeColorVariants, ThemeError> {
    let base = Rgb::parse(color)?;
    let (toward, steps) = if dark {
        (Rgb::BLACK, [15.0, 30.0, 50.0, 70.0, 80.0])
    } else {
        (Rgb::WHITE, [15.0, 30.0, 50.0, 70.0, 85.0])
    };
    let [l3, l5, l7, l8, l9] = steps.map(|amount| base.mix(toward, amount).to_hex());

    Ok(ThemeColorVariants {
        primary: base.to_hex(),
        light3: l3,
        light5: l5,
        light7: l7,
        light8: l8,
        light9: l9,
        dark2: base.darken(5.0).to_hex(),
    })
}

/// Variants for a theme id, as the console applies them
pub fn variants_for_theme(
    theme_id: &str,
    custom_color: &str,
    dark: bool,
) -> Result<ThemeColorVariants, ThemeError> {
    generate_variants(theme_color(theme_id, custom_color), dark)
}

/// CSS variables for every preset, each under `--am-<id>`
pub fn preset_css_variables(dark: bool) -> Vec<(String, String)> {
    THEME_PRESETS
        .iter()
        .filter_map(|preset| {
            generate_variants(preset.color, dark)
                .ok()
                .map(|variants| variants.css_variables(&format!("--am-{}", preset.id)))
        })
        .flatten()
        .collect()
}

// Channels stay fractional until formatted, then round half-up
#[derive(Debug, Clone, Copy, PartialEq)]
struct Rgb {
    r: f64,
    g: f64,
    b: f64,
}

impl Rgb {
    const WHITE: Rgb = Rgb { r: 255.0, g: 255.0, b: 255.0 };
    const BLACK: Rgb = Rgb { r: 0.0, g: 0.0, b: 0.0 };

    fn parse(input: &str) -> Result<Self, ThemeError> {
        let invalid = || ThemeError::InvalidColor(input.to_string());
        let hex = input.trim().trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return Err(invalid()),
        };

        let channel = |i: usize| {
            u8::from_str_radix(&expanded[i..i + 2], 16)
                .map(f64::from)
                .map_err(|_| invalid())
        };
        Ok(Rgb {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    /// Linear mix toward `other` by `amount` percent
    fn mix(self, other: Rgb, amount: f64) -> Rgb {
        let p = amount / 100.0;
        Rgb {
            r: (other.r - self.r) * p + self.r,
            g: (other.g - self.g) * p + self.g,
            b: (other.b - self.b) * p + self.b,
        }
    }

    /// Lower HSL lightness by `amount` percentage points
    fn darken(self, amount: f64) -> Rgb {
        let (h, s, l) = self.to_hsl();
        let l = (l - amount / 100.0).clamp(0.0, 1.0);
        Rgb::from_hsl(h, s, l)
    }

    fn to_hsl(self) -> (f64, f64, f64) {
        let (r, g, b) = (self.r / 255.0, self.g / 255.0, self.b / 255.0);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;

        if max == min {
            return (0.0, 0.0, l);
        }

        let d = max - min;
        let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
        let h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        (h / 6.0, s, l)
    }

    fn from_hsl(h: f64, s: f64, l: f64) -> Rgb {
        if s == 0.0 {
            let v = l * 255.0;
            return Rgb { r: v, g: v, b: v };
        }

        fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
            if t < 0.0 {
                t += 1.0;
            }
            if t > 1.0 {
                t -= 1.0;
            }
            if t < 1.0 / 6.0 {
                p + (q - p) * 6.0 * t
            } else if t < 0.5 {
                q
            } else if t < 2.0 / 3.0 {
                p + (q - p) * (2.0 / 3.0 - t) * 6.0
            } else {
                p
            }
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        Rgb {
            r: hue_to_rgb(p, q, h + 1.0 / 3.0) * 255.0,
            g: hue_to_rgb(p, q, h) * 255.0,
            b: hue_to_rgb(p, q, h - 1.0 / 3.0) * 255.0,
        }
    }

    fn to_hex(self) -> String {
        let round = |v: f64| (v + 0.5).floor().clamp(0.0, 255.0) as u8;
        format!("#{:02x}{:02x}{:02x}", round(self.r), round(self.g), round(self.b))
    }
}
