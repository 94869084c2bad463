use ratatui::style::Color;

use super::Theme;

pub const fn hex_to_color(hex: u32) -> Color {
    Color::Rgb(
        ((hex >> 16) & 0xff) as u8,
        ((hex >> 8) & 0xff) as u8,
        (hex & 0xff) as u8,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPalette {
    pub background: Color,
    pub foreground: Color,
    pub foreground_dim: Color,
    pub surface: Color,
    pub border: Color,
    pub selection: Color,
    pub accent: Color,
    pub accent_secondary: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
}

impl ColorPalette {
    /// Colors in the order: background, foreground, dim foreground, surface,
    /// border, selection, accent, secondary accent, success, warning, error,
    /// info.
    pub const fn from_hex(hex: [u32; 12]) -> Self {
        Self {
            background: hex_to_color(hex[0]),
            foreground: hex_to_color(hex[1]),
            foreground_dim: hex_to_color(hex[2]),
            surface: hex_to_color(hex[3]),
            border: hex_to_color(hex[4]),
            selection: hex_to_color(hex[5]),
            accent: hex_to_color(hex[6]),
            accent_secondary: hex_to_color(hex[7]),
            success: hex_to_color(hex[8]),
            warning: hex_to_color(hex[9]),
            error: hex_to_color(hex[10]),
            info: hex_to_color(hex[11]),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PaletteTheme {
    name: &'static str,
    palette: ColorPalette,
}

impl Theme for PaletteTheme {
    fn name(&self) -> &'static str {
        self.name
    }

    fn palette(&self) -> &ColorPalette {
        &self.palette
    }
}

pub const TOKYO_NIGHT: PaletteTheme = PaletteTheme {
    name: "Tokyo Night",
    palette: ColorPalette::from_hex([
        0x1a1b26, 0xc0caf5, 0x565f89, 0x24283b, 0x414868, 0x364a82, 0x7aa2f7, 0xbb9af7,
        0x9ece6a, 0xe0af68, 0xf7768e, 0x7dcfff,
    ]),
};

pub const CATPPUCCIN_MOCHA: PaletteTheme = PaletteTheme {
    name: "Catppuccin Mocha",
    palette: ColorPalette::from_hex([
        0x1e1e2e, 0xcdd6f4, 0x6c7086, 0x313244, 0x45475a, 0x585b70, 0xcba6f7, 0xf5c2e7,
        0xa6e3a1, 0xf9e2af, 0xf38ba8, 0x89b4fa,
    ]),
};

pub const DRACULA: PaletteTheme = PaletteTheme {
    name: "Dracula",
    palette: ColorPalette::from_hex([
        0x282a36, 0xf8f8f2, 0x6272a4, 0x44475a, 0x6272a4, 0x44475a, 0xbd93f9, 0xff79c6,
        0x50fa7b, 0xf1fa8c, 0xff5555, 0x8be9fd,
    ]),
};

pub const NORD: PaletteTheme = PaletteTheme {
    name: "Nord",
    palette: ColorPalette::from_hex([
        0x2e3440, 0xeceff4, 0x4c566a, 0x3b4252, 0x4c566a, 0x434c5e, 0x88c0d0, 0x81a1c1,
        0xa3be8c, 0xebcb8b, 0xbf616a, 0x5e81ac,
    ]),
};

pub const GRUVBOX_DARK: PaletteTheme = PaletteTheme {
    name: "Gruvbox Dark",
    palette: ColorPalette::from_hex([
        0x282828, 0xebdbb2, 0x928374, 0x3c3836, 0x504945, 0x504945, 0xfe8019, 0xd3869b,
        0xb8bb26, 0xfabd2f, 0xfb4934, 0x83a598,
    ]),
};

pub const ALL: [PaletteTheme; 5] = [TOKYO_NIGHT, CATPPUCCIN_MOCHA, DRACULA, NORD, GRUVBOX_DARK];
