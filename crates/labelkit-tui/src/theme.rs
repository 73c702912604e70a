use ratatui::style::Color;

/// Semantic color theme for the dashboard.
///
/// View code references these fields instead of hardcoding `Color::*`
/// constants. The default palette carries over the desktop dashboard's
/// dark scheme.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Window background.
    pub background: Color,
    /// Sidebar background.
    pub sidebar: Color,
    /// Header bar background.
    pub header: Color,
    /// Launch action, focused borders, titles.
    pub accent: Color,
    /// Launch action while disabled.
    pub accent_disabled: Color,
    /// Split/convert action.
    pub action: Color,
    /// Primary text.
    pub text: Color,
    /// Hints, paths, inactive entries.
    pub text_muted: Color,
    /// Warning lines in the activity log.
    pub warning: Color,
    /// Error lines and failure banners.
    pub error: Color,
    /// Success banners and the progress gauge.
    pub success: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::Rgb(0x1e, 0x1e, 0x2e),
            sidebar: Color::Rgb(0x21, 0x22, 0x2c),
            header: Color::Rgb(0x28, 0x2c, 0x34),
            accent: Color::Rgb(0x8e, 0x8e, 0xe5),
            accent_disabled: Color::Rgb(0x6b, 0x6b, 0xb5),
            action: Color::Rgb(0x26, 0xc6, 0xda),
            text: Color::White,
            text_muted: Color::Gray,
            warning: Color::Yellow,
            error: Color::Red,
            success: Color::Green,
        }
    }
}
