use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use serde::{Deserialize, Serialize};

use super::handler::Action;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyBinding {
    pub code: SerializableKeyCode,
    #[serde(default)]
    pub modifiers: SerializableKeyModifiers,
}

impl KeyBinding {
    pub fn new(code: KeyCode) -> Self {
        Self {
            code: SerializableKeyCode(code),
            modifiers: SerializableKeyModifiers::default(),
        }
    }

    pub fn with_ctrl(code: KeyCode) -> Self {
        Self {
            code: SerializableKeyCode(code),
            modifiers: SerializableKeyModifiers(KeyModifiers::CONTROL),
        }
    }

    fn key(&self) -> (KeyCode, KeyModifiers) {
        normalize(self.code.0, self.modifiers.0)
    }
}

/// Terminals disagree on whether `+`, `?` or `:` carry SHIFT, so it is
/// ignored for character keys.
fn normalize(code: KeyCode, modifiers: KeyModifiers) -> (KeyCode, KeyModifiers) {
    match code {
        KeyCode::Char(_) => (code, modifiers.difference(KeyModifiers::SHIFT)),
        _ => (code, modifiers),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SerializableKeyCode(pub KeyCode);

impl Serialize for SerializableKeyCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let s = match self.0 {
            KeyCode::Char(' ') => "Space".to_string(),
            KeyCode::Char(c) => format!("Char({})", c),
            KeyCode::F(n) => format!("F{}", n),
            other => format!("{:?}", other),
        };
        serializer.serialize_str(&s)
    }
}

impl<'de> Deserialize<'de> for SerializableKeyCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_key_code(&s)
            .map(SerializableKeyCode)
            .ok_or_else(|| serde::de::Error::custom(format!("Invalid key code: {}", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SerializableKeyModifiers(pub KeyModifiers);

impl Default for SerializableKeyModifiers {
    fn default() -> Self {
        Self(KeyModifiers::NONE)
    }
}

impl Serialize for SerializableKeyModifiers {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&modifiers_to_string(self.0).unwrap_or_else(|| "None".into()))
    }
}

impl<'de> Deserialize<'de> for SerializableKeyModifiers {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(SerializableKeyModifiers(parse_modifiers(&s)))
    }
}

fn parse_key_code(s: &str) -> Option<KeyCode> {
    let s = s.trim();
    if let Some(inner) = s.strip_prefix("Char(").and_then(|r| r.strip_suffix(')')) {
        return inner.chars().next().map(KeyCode::Char);
    }
    if let Some(n) = s.strip_prefix('F').and_then(|n| n.parse::<u8>().ok()) {
        return Some(KeyCode::F(n));
    }
    match s {
        "Space" => Some(KeyCode::Char(' ')),
        "Tab" => Some(KeyCode::Tab),
        "BackTab" => Some(KeyCode::BackTab),
        "Enter" => Some(KeyCode::Enter),
        "Esc" | "Escape" => Some(KeyCode::Esc),
        "Up" => Some(KeyCode::Up),
        "Down" => Some(KeyCode::Down),
        "Left" => Some(KeyCode::Left),
        "Right" => Some(KeyCode::Right),
        "PageUp" => Some(KeyCode::PageUp),
        "PageDown" => Some(KeyCode::PageDown),
        "Home" => Some(KeyCode::Home),
        "End" => Some(KeyCode::End),
        "Delete" => Some(KeyCode::Delete),
        "Backspace" => Some(KeyCode::Backspace),
        _ => None,
    }
}

fn parse_modifiers(s: &str) -> KeyModifiers {
    s.split('+')
        .fold(KeyModifiers::NONE, |acc, part| match part.trim() {
            "Ctrl" | "Control" => acc | KeyModifiers::CONTROL,
            "Alt" => acc | KeyModifiers::ALT,
            "Shift" => acc | KeyModifiers::SHIFT,
            _ => acc,
        })
}

fn modifiers_to_string(modifiers: KeyModifiers) -> Option<String> {
    let parts: Vec<&str> = [
        (KeyModifiers::CONTROL, "Ctrl"),
        (KeyModifiers::ALT, "Alt"),
        (KeyModifiers::SHIFT, "Shift"),
    ]
    .iter()
    .filter(|(m, _)| modifiers.contains(*m))
    .map(|(_, name)| *name)
    .collect();

    (!parts.is_empty()).then(|| parts.join("+"))
}

/// Contents of `keybinds.toml`. Missing entries fall back to the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeybindConfig {
    pub quit: Vec<KeyBinding>,
    pub back: Vec<KeyBinding>,
    pub help: Vec<KeyBinding>,
    pub toggle_theme: Vec<KeyBinding>,
    pub command: Vec<KeyBinding>,
    pub up: Vec<KeyBinding>,
    pub down: Vec<KeyBinding>,
    pub select: Vec<KeyBinding>,
    pub next_step: Vec<KeyBinding>,
    pub prev_step: Vec<KeyBinding>,
    pub autoplay: Vec<KeyBinding>,
    pub speed_up: Vec<KeyBinding>,
    pub speed_down: Vec<KeyBinding>,
    pub toggle_dependency: Vec<KeyBinding>,
    pub lag_up: Vec<KeyBinding>,
    pub lag_down: Vec<KeyBinding>,
}

impl Default for KeybindConfig {
    fn default() -> Self {
        let keys = |codes: &[KeyCode]| -> Vec<KeyBinding> {
            codes.iter().copied().map(KeyBinding::new).collect()
        };

        Self {
            quit: vec![
                KeyBinding::new(KeyCode::Char('q')),
                KeyBinding::with_ctrl(KeyCode::Char('c')),
            ],
            back: keys(&[KeyCode::Esc]),
            help: keys(&[KeyCode::Char('?')]),
            toggle_theme: keys(&[KeyCode::Char('t')]),
            command: vec![
                KeyBinding::new(KeyCode::Char(':')),
                KeyBinding::with_ctrl(KeyCode::Char('k')),
            ],
            up: keys(&[KeyCode::Up, KeyCode::Char('k')]),
            down: keys(&[KeyCode::Down, KeyCode::Char('j')]),
            select: keys(&[KeyCode::Enter]),
            next_step: keys(&[KeyCode::Char('n'), KeyCode::Right]),
            prev_step: keys(&[KeyCode::Char('p'), KeyCode::Left]),
            autoplay: keys(&[KeyCode::Char(' ')]),
            speed_up: keys(&[KeyCode::Char('+'), KeyCode::Char('=')]),
            speed_down: keys(&[KeyCode::Char('-')]),
            toggle_dependency: keys(&[KeyCode::Char('x')]),
            lag_up: keys(&[KeyCode::Char(']')]),
            lag_down: keys(&[KeyCode::Char('[')]),
        }
    }
}

impl KeybindConfig {
    /// `(name, description, bindings, action)` for every configurable action.
    fn entries(&self) -> Vec<(&'static str, &'static str, &Vec<KeyBinding>, Action)> {
        vec![
            ("next_step", "Next step", &self.next_step, Action::NextStep),
            ("prev_step", "Previous step", &self.prev_step, Action::PrevStep),
            ("autoplay", "Toggle autoplay", &self.autoplay, Action::ToggleAutoplay),
            ("speed_up", "Faster", &self.speed_up, Action::SpeedUp),
            ("speed_down", "Slower", &self.speed_down, Action::SpeedDown),
            (
                "toggle_dependency",
                "Toggle dependency up/down",
                &self.toggle_dependency,
                Action::ToggleDependency,
            ),
            ("lag_up", "Consumer lag +500ms", &self.lag_up, Action::LagUp),
            ("lag_down", "Consumer lag -500ms", &self.lag_down, Action::LagDown),
            ("up", "Move up", &self.up, Action::Up),
            ("down", "Move down", &self.down, Action::Down),
            ("select", "Open pattern", &self.select, Action::Select),
            ("back", "Back / close", &self.back, Action::Back),
            ("command", "Quick switcher", &self.command, Action::OpenCommandPalette),
            ("toggle_theme", "Cycle theme", &self.toggle_theme, Action::ToggleTheme),
            ("help", "Help", &self.help, Action::Help),
            ("quit", "Quit", &self.quit, Action::Quit),
        ]
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut Vec<KeyBinding>> {
        let slot = match name {
            "quit" => &mut self.quit,
            "back" => &mut self.back,
            "help" => &mut self.help,
            "toggle_theme" => &mut self.toggle_theme,
            "command" => &mut self.command,
            "up" => &mut self.up,
            "down" => &mut self.down,
            "select" => &mut self.select,
            "next_step" => &mut self.next_step,
            "prev_step" => &mut self.prev_step,
            "autoplay" => &mut self.autoplay,
            "speed_up" => &mut self.speed_up,
            "speed_down" => &mut self.speed_down,
            "toggle_dependency" => &mut self.toggle_dependency,
            "lag_up" => &mut self.lag_up,
            "lag_down" => &mut self.lag_down,
            _ => return None,
        };
        Some(slot)
    }
}

pub struct Keybinds {
    config: KeybindConfig,
    bindings: HashMap<(KeyCode, KeyModifiers), Action>,
}

impl Default for Keybinds {
    fn default() -> Self {
        Self::new()
    }
}

impl Keybinds {
    pub fn new() -> Self {
        Self::from_config(KeybindConfig::default())
    }

    pub fn from_config(config: KeybindConfig) -> Self {
        let mut keybinds = Self {
            config,
            bindings: HashMap::new(),
        };
        keybinds.rebuild_bindings();
        keybinds
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: KeybindConfig = toml::from_str(&content)?;
        Ok(Self::from_config(config))
    }

    pub fn load_or_default() -> Self {
        let config_path = Self::config_path();
        if !config_path.exists() {
            return Self::new();
        }
        Self::load_from_file(&config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load keybinds config: {}. Using defaults.", e);
            Self::new()
        })
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(&self.config)?)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("flowscope")
            .join("keybinds.toml")
    }

    fn rebuild_bindings(&mut self) {
        self.bindings.clear();

        for (_, _, keys, action) in self.config.entries() {
            for kb in keys {
                self.bindings.insert(kb.key(), action.clone());
            }
        }

        for digit in 1..=9u8 {
            let c = char::from(b'0' + digit);
            self.bindings.insert(
                (KeyCode::Char(c), KeyModifiers::NONE),
                Action::TriggerScenario(usize::from(digit - 1)),
            );
        }
    }

    pub fn get(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<&Action> {
        self.bindings.get(&normalize(code, modifiers))
    }

    pub fn config(&self) -> &KeybindConfig {
        &self.config
    }

    pub fn set_binding(&mut self, action_name: &str, bindings: Vec<KeyBinding>) -> bool {
        let Some(slot) = self.config.slot_mut(action_name) else {
            return false;
        };
        *slot = bindings;
        self.rebuild_bindings();
        true
    }

    /// Key labels for the first binding of an action, for the footer.
    pub fn hint(&self, action: &Action) -> Option<String> {
        self.config
            .entries()
            .into_iter()
            .find(|(_, _, _, a)| a == action)
            .and_then(|(_, _, keys, _)| keys.first().map(keybinding_to_string))
    }

    pub fn all_bindings(&self) -> Vec<(String, &'static str)> {
        let mut rows: Vec<(String, &'static str)> = self
            .config
            .entries()
            .into_iter()
            .map(|(_, description, keys, _)| (keybindings_to_string(keys), description))
            .collect();
        rows.insert(8, ("1-9".to_string(), "Trigger scenario"));
        rows
    }
}

fn keybinding_to_string(kb: &KeyBinding) -> String {
    let key = match kb.code.0 {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Up => "↑".to_string(),
        KeyCode::Down => "↓".to_string(),
        KeyCode::Left => "←".to_string(),
        KeyCode::Right => "→".to_string(),
        KeyCode::PageUp => "PgUp".to_string(),
        KeyCode::PageDown => "PgDn".to_string(),
        KeyCode::F(n) => format!("F{}", n),
        other => format!("{:?}", other),
    };
    match modifiers_to_string(kb.modifiers.0) {
        Some(mods) => format!("{}+{}", mods, key),
        None => key,
    }
}

fn keybindings_to_string(bindings: &[KeyBinding]) -> String {
    bindings
        .iter()
        .map(keybinding_to_string)
        .collect::<Vec<_>>()
        .join(" / ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_keybinds() {
        let keybinds = Keybinds::new();

        assert_eq!(
            keybinds.get(KeyCode::Char('q'), KeyModifiers::NONE),
            Some(&Action::Quit)
        );
        assert_eq!(
            keybinds.get(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Some(&Action::Quit)
        );
        assert_eq!(
            keybinds.get(KeyCode::Right, KeyModifiers::NONE),
            Some(&Action::NextStep)
        );
        assert_eq!(
            keybinds.get(KeyCode::Char(' '), KeyModifiers::NONE),
            Some(&Action::ToggleAutoplay)
        );
        assert_eq!(
            keybinds.get(KeyCode::Char('k'), KeyModifiers::CONTROL),
            Some(&Action::OpenCommandPalette)
        );
        assert_eq!(
            keybinds.get(KeyCode::Char('3'), KeyModifiers::NONE),
            Some(&Action::TriggerScenario(2))
        );
    }

    #[test]
    fn test_shift_ignored_for_characters() {
        let keybinds = Keybinds::new();

        assert_eq!(
            keybinds.get(KeyCode::Char('+'), KeyModifiers::SHIFT),
            Some(&Action::SpeedUp)
        );
        assert_eq!(
            keybinds.get(KeyCode::Char('?'), KeyModifiers::SHIFT),
            Some(&Action::Help)
        );
        assert_eq!(keybinds.get(KeyCode::Tab, KeyModifiers::SHIFT), None);
    }

    #[test]
    fn test_set_binding() {
        let mut keybinds = Keybinds::new();

        assert!(keybinds.set_binding("next_step", vec![KeyBinding::new(KeyCode::Char('l'))]));
        assert_eq!(
            keybinds.get(KeyCode::Char('l'), KeyModifiers::NONE),
            Some(&Action::NextStep)
        );
        assert_eq!(keybinds.get(KeyCode::Char('n'), KeyModifiers::NONE), None);

        assert!(!keybinds.set_binding("warp_drive", vec![]));
    }

    #[test]
    fn test_keybind_string_round_trip() {
        let binding = KeyBinding::with_ctrl(KeyCode::Char('k'));
        let toml_str = toml::to_string(&binding).unwrap();
        assert!(toml_str.contains("Char(k)"));
        assert!(toml_str.contains("Ctrl"));

        let parsed: KeyBinding = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, binding);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keybinds.toml");
        std::fs::write(
            &path,
            "[[autoplay]]\ncode = \"Char(a)\"\nmodifiers = \"None\"\n",
        )
        .unwrap();

        let keybinds = Keybinds::load_from_file(&path).unwrap();
        assert_eq!(
            keybinds.get(KeyCode::Char('a'), KeyModifiers::NONE),
            Some(&Action::ToggleAutoplay)
        );
        assert_eq!(
            keybinds.get(KeyCode::Char('q'), KeyModifiers::NONE),
            Some(&Action::Quit)
        );
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("keybinds.toml");

        let mut keybinds = Keybinds::new();
        keybinds.set_binding("toggle_dependency", vec![KeyBinding::new(KeyCode::F(2))]);
        keybinds.save_to_file(&path).unwrap();

        let loaded = Keybinds::load_from_file(&path).unwrap();
        assert_eq!(
            loaded.get(KeyCode::F(2), KeyModifiers::NONE),
            Some(&Action::ToggleDependency)
        );
    }

    #[test]
    fn test_hints_and_listing() {
        let keybinds = Keybinds::new();
        assert_eq!(keybinds.hint(&Action::NextStep).as_deref(), Some("n"));
        assert_eq!(
            keybinds.hint(&Action::OpenCommandPalette).as_deref(),
            Some(":")
        );

        let all = keybinds.all_bindings();
        assert!(all.iter().any(|(keys, desc)| keys == "1-9" && *desc == "Trigger scenario"));
        assert!(all.iter().any(|(keys, _)| keys == "Space"));
    }
}
