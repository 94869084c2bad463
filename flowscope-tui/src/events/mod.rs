mod commands;
mod handler;
mod keybinds;

pub use commands::{Command, CommandKind, CommandPalette, CommandPaletteState};
pub use handler::{Action, EventHandler, InputMode};
pub use keybinds::{
    KeyBinding, KeybindConfig, Keybinds, SerializableKeyCode, SerializableKeyModifiers,
};
