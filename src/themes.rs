//! Built-in color themes and banners.

use colored::{ColoredString, Colorize};
use std::io::Write;
use std::time::Duration;

use crate::utils::fuzzy_match;

pub const DEFAULT_THEME: &str = "cyberpunk";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeColors {
    pub primary: &'static str,
    pub secondary: &'static str,
    pub accent: &'static str,
    pub background: &'static str,
    pub text: &'static str,
}

/// Which color of the palette to paint with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Primary,
    Secondary,
    Accent,
    Background,
    Text,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    pub colors: ThemeColors,
    pub banner: &'static str,
}

static THEMES: [Theme; 4] = [
    Theme {
        name: "cyberpunk",
        colors: ThemeColors {
            primary: "#ff00ff",
            secondary: "#00ffff",
            accent: "#ffff00",
            background: "#0a0a0a",
            text: "#ffffff",
        },
        banner: r"
  ▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄
  ██ ▄▄▀██ ▄▄▄ ██ ▀██ █▄▄ ▄▄██ ▄▄▄█▄▀█▀▄
  ██ █████ ███ ██ █ █ ███ ████ ▄▄▄███ ██
  ██ ▀▀▄██ ▀▀▀ ██ ██▄ ███ ████ ▀▀▀█▀▄█▄▀
  ▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀
     CONTEXT7 AI :: NEON TERMINAL ONLINE",
    },
    Theme {
        name: "ocean",
        colors: ThemeColors {
            primary: "#0077be",
            secondary: "#00cccc",
            accent: "#ffd700",
            background: "#001a33",
            text: "#e6f3ff",
        },
        banner: r"
  ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
   ~ ~  ~ ~  ~ ~  ~ ~  ~ ~  ~ ~  ~ ~
  ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
     CONTEXT7 AI :: DEEP DOCS DIVE",
    },
    Theme {
        name: "forest",
        colors: ThemeColors {
            primary: "#228b22",
            secondary: "#90ee90",
            accent: "#ffd700",
            background: "#0f1f0f",
            text: "#f5f5dc",
        },
        banner: r"
  ╔══════════════════════════════════╗
  ║  /\    /\    /\    /\    /\    /\ ║
  ║   CONTEXT7 AI :: FOREST RANGER   ║
  ║ /  \  /  \  /  \  /  \  /  \  /  ║
  ╚══════════════════════════════════╝",
    },
    Theme {
        name: "sunset",
        colors: ThemeColors {
            primary: "#ff4500",
            secondary: "#ff8c00",
            accent: "#ffd700",
            background: "#2f1b14",
            text: "#fff8dc",
        },
        banner: r"
  . * . * . * . * . * . * . * . * . *
       \  |  /      CONTEXT7 AI
     -- ( O ) --    :: SUNSET SESSION
  ___________________________________",
    },
];

/// Parse `#rrggbb` into its components.
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

impl Theme {
    /// Look a theme up by name, falling back to the default theme.
    pub fn named(name: &str) -> &'static Theme {
        Self::find(name).unwrap_or(&THEMES[0])
    }

    fn find(name: &str) -> Option<&'static Theme> {
        THEMES
            .iter()
            .find(|theme| theme.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn color(&self, slot: Slot) -> &'static str {
        match slot {
            Slot::Primary => self.colors.primary,
            Slot::Secondary => self.colors.secondary,
            Slot::Accent => self.colors.accent,
            Slot::Background => self.colors.background,
            Slot::Text => self.colors.text,
        }
    }

    pub fn paint(&self, slot: Slot, text: &str) -> ColoredString {
        match hex_to_rgb(self.color(slot)) {
            Some((r, g, b)) => text.truecolor(r, g, b),
            None => text.normal(),
        }
    }

    pub fn print_banner(&self) {
        println!("{}\n", self.paint(Slot::Primary, self.banner));
    }

    /// Print `text` one character at a time.
    pub async fn print_typing_effect(&self, text: &str, chars_per_sec: u32) {
        let delay = Duration::from_millis(1000 / u64::from(chars_per_sec.max(1)));
        let mut stdout = std::io::stdout();
        for ch in text.chars() {
            print!("{}", self.paint(Slot::Text, ch.encode_utf8(&mut [0; 4])));
            let _ = stdout.flush();
            tokio::time::sleep(delay).await;
        }
        println!();
    }
}

/// Tracks the active theme for the session
pub struct ThemeManager {
    current: &'static Theme,
}

impl ThemeManager {
    pub fn new(initial: &str) -> Self {
        if Theme::find(initial).is_none() {
            tracing::warn!("Unknown theme '{}', using {}", initial, DEFAULT_THEME);
        }
        Self {
            current: Theme::named(initial),
        }
    }

    /// Switch themes; unknown names leave the current theme in place.
    pub fn set_theme(&mut self, name: &str) -> bool {
        match Theme::find(name) {
            Some(theme) => {
                self.current = theme;
                true
            }
            None => false,
        }
    }

    pub fn current(&self) -> &'static Theme {
        self.current
    }

    pub fn list_themes(&self) -> Vec<&'static str> {
        THEMES.iter().map(|theme| theme.name).collect()
    }

    /// Closest theme name for a mistyped one, if any overlaps.
    pub fn suggest(&self, name: &str) -> Option<&'static str> {
        THEMES
            .iter()
            .map(|theme| {
                let score = fuzzy_match(name, theme.name).max(fuzzy_match(theme.name, name));
                (theme.name, score)
            })
            .filter(|(_, score)| *score > 0.0)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(name, _)| name)
    }
}

impl Default for ThemeManager {
    fn default() -> Self {
        Self::new(DEFAULT_THEME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_themes_in_order() {
        let manager = ThemeManager::default();
        assert_eq!(
            manager.list_themes(),
            vec!["cyberpunk", "ocean", "forest", "sunset"]
        );
        assert_eq!(manager.current().name, "cyberpunk");
    }

    #[test]
    fn test_set_theme() {
        let mut manager = ThemeManager::default();
        assert!(manager.set_theme("Ocean"));
        assert_eq!(manager.current().name, "ocean");

        assert!(!manager.set_theme("vaporwave"));
        assert_eq!(manager.current().name, "ocean");
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        assert_eq!(Theme::named("missing").name, DEFAULT_THEME);
        assert_eq!(ThemeManager::new("missing").current().name, DEFAULT_THEME);
    }

    #[test]
    fn test_all_palette_colors_parse() {
        let slots = [
            Slot::Primary,
            Slot::Secondary,
            Slot::Accent,
            Slot::Background,
            Slot::Text,
        ];
        for theme in THEMES.iter() {
            for slot in slots {
                assert!(
                    hex_to_rgb(theme.color(slot)).is_some(),
                    "{} {:?}",
                    theme.name,
                    slot
                );
            }
            assert!(theme.banner.contains("CONTEXT7 AI"));
        }
    }

    #[test]
    fn test_hex_to_rgb() {
        assert_eq!(hex_to_rgb("#ff4500"), Some((255, 69, 0)));
        assert_eq!(hex_to_rgb("ff4500"), None);
        assert_eq!(hex_to_rgb("#ff45"), None);
        assert_eq!(hex_to_rgb("#gg0000"), None);
    }

    #[test]
    fn test_suggest_close_theme_names() {
        let themes = ThemeManager::default();
        assert_eq!(themes.suggest("oce"), Some("ocean"));
        assert_eq!(themes.suggest("Forest-Dark"), Some("forest"));
        assert_eq!(themes.suggest("SUNSET2"), Some("sunset"));
        assert_eq!(themes.suggest("vaporwave"), None);
    }
}
