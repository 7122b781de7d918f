//! Theme colors, with optional overrides from the `[theme]` table of the page layout

use ratatui::style::Color;

use crate::config::ThemeConfig;

/// Theme colors for the UI
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub accent: Color,           // Active borders, selected control
    pub accent_bright: Color,    // Emphasized quick-adjust control
    pub danger: Color,           // Alerts, negative steps
    pub success: Color,          // Positive steps, flash messages
    pub warning: Color,          // Notices
    pub text: Color,
    pub text_dim: Color,
    pub bg_selected: Color,      // Selected card
    pub inactive: Color,         // Inactive borders
    pub header: Color,           // Category headers
    pub low_stock: Color,        // Low-stock card tint
    pub low_stock_alt: Color,    // Alternate tint for the blink
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Rgb(250, 179, 135),
            accent_bright: Color::Rgb(245, 194, 231),
            danger: Color::Rgb(243, 139, 168),
            success: Color::Rgb(166, 218, 149),
            warning: Color::Rgb(249, 226, 175),
            text: Color::Rgb(205, 214, 244),
            text_dim: Color::Rgb(147, 153, 178),
            bg_selected: Color::Rgb(69, 71, 90),
            inactive: Color::Rgb(88, 91, 112),
            header: Color::Rgb(137, 180, 250),
            low_stock: Color::Rgb(64, 36, 44),
            low_stock_alt: Color::Rgb(92, 44, 56),
        }
    }
}

impl Theme {
    /// Built-in palette with any valid overrides applied
    pub fn from_config(config: &ThemeConfig) -> Self {
        let mut theme = Self::default();

        let overrides = [
            (&config.accent, &mut theme.accent),
            (&config.danger, &mut theme.danger),
            (&config.warning, &mut theme.warning),
            (&config.text, &mut theme.text),
            (&config.text_dim, &mut theme.text_dim),
            (&config.bg_selected, &mut theme.bg_selected),
            (&config.low_stock, &mut theme.low_stock),
        ];

        for (value, slot) in overrides {
            let Some(value) = value else { continue };
            match Self::parse_hex_color(value) {
                Some(color) => *slot = color,
                None => tracing::warn!("Ignoring invalid theme color: {}", value),
            }
        }

        theme
    }

    /// Parse a hex color string (#RRGGBB or #RGB)
    fn parse_hex_color(s: &str) -> Option<Color> {
        let s = s.trim().trim_start_matches('#');
        if !s.is_ascii() {
            return None;
        }

        if s.len() == 6 {
            let r = u8::from_str_radix(&s[0..2], 16).ok()?;
            let g = u8::from_str_radix(&s[2..4], 16).ok()?;
            let b = u8::from_str_radix(&s[4..6], 16).ok()?;
            Some(Color::Rgb(r, g, b))
        } else if s.len() == 3 {
            let r = u8::from_str_radix(&s[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&s[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&s[2..3], 16).ok()? * 17;
            Some(Color::Rgb(r, g, b))
        } else {
            None
        }
    }
}
