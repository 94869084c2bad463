use flowscope_core::catalog;

use super::handler::Action;

const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Pattern,
    Command,
}

#[derive(Debug, Clone)]
pub struct Command {
    pub name: String,
    pub aliases: Vec<String>,
    pub keywords: Vec<String>,
    pub description: String,
    pub kind: CommandKind,
    pub action: Action,
}

impl Command {
    pub fn new(name: &str, description: &str, action: Action) -> Self {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            keywords: Vec::new(),
            description: description.to_string(),
            kind: CommandKind::Command,
            action,
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&query)
            || self.aliases.iter().any(|a| a.to_lowercase().starts_with(&query))
            || self.keywords.iter().any(|k| k.contains(&query))
    }

    fn is_exact(&self, query: &str) -> bool {
        let query = query.trim();
        self.name.eq_ignore_ascii_case(query)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(query))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandPaletteState {
    Hidden,
    Open,
}

/// Quick switcher over the pattern catalog and the app commands.
pub struct CommandPalette {
    state: CommandPaletteState,
    input: String,
    cursor_position: usize,
    commands: Vec<Command>,
    filtered_commands: Vec<usize>,
    selected_index: usize,
    history: Vec<String>,
    history_index: Option<usize>,
}

impl Default for CommandPalette {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandPalette {
    pub fn new() -> Self {
        let commands = Self::default_commands();
        let filtered_commands = (0..commands.len()).collect();

        Self {
            state: CommandPaletteState::Hidden,
            input: String::new(),
            cursor_position: 0,
            commands,
            filtered_commands,
            selected_index: 0,
            history: Vec::new(),
            history_index: None,
        }
    }

    fn default_commands() -> Vec<Command> {
        let patterns = catalog().iter().map(|info| Command {
            name: info.name.to_string(),
            aliases: vec![info.id.slug().to_string()],
            keywords: info.tags.iter().map(|t| t.to_string()).collect(),
            description: info.description.to_string(),
            kind: CommandKind::Pattern,
            action: Action::OpenPattern(info.id),
        });

        let commands = [
            Command::new("catalog", "Back to the pattern catalog", Action::ShowCatalog)
                .with_aliases(&["home", "patterns"]),
            Command::new("autoplay", "Start or stop autoplay", Action::ToggleAutoplay)
                .with_aliases(&["play", "pause"]),
            Command::new("next", "Run the next step", Action::NextStep).with_aliases(&["n"]),
            Command::new("previous", "Move the cursor back one step", Action::PrevStep)
                .with_aliases(&["prev", "back"]),
            Command::new("faster", "Increase playback speed", Action::SpeedUp)
                .with_aliases(&["+"]),
            Command::new("slower", "Decrease playback speed", Action::SpeedDown)
                .with_aliases(&["-"]),
            Command::new(
                "toggle dependency",
                "Bring the pattern's dependency down or back up",
                Action::ToggleDependency,
            )
            .with_aliases(&["x", "kafka", "down"]),
            Command::new("theme", "Cycle the color theme", Action::ToggleTheme)
                .with_aliases(&["t", "colors"]),
            Command::new("help", "Show key bindings", Action::Help).with_aliases(&["?", "keys"]),
            Command::new("quit", "Exit Flowscope", Action::Quit).with_aliases(&["q", "exit"]),
        ];

        patterns.chain(commands).collect()
    }

    pub fn state(&self) -> CommandPaletteState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == CommandPaletteState::Open
    }

    pub fn open(&mut self) {
        self.state = CommandPaletteState::Open;
        self.input.clear();
        self.cursor_position = 0;
        self.selected_index = 0;
        self.history_index = None;
        self.update_filtered_commands();
    }

    pub fn close(&mut self) {
        self.state = CommandPaletteState::Hidden;
        self.input.clear();
        self.cursor_position = 0;
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn cursor_position(&self) -> usize {
        self.cursor_position
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    pub fn filtered_commands(&self) -> Vec<&Command> {
        self.filtered_commands
            .iter()
            .map(|&i| &self.commands[i])
            .collect()
    }

    pub fn insert_char(&mut self, c: char) {
        let byte_index = self.byte_index();
        self.input.insert(byte_index, c);
        self.cursor_position += 1;
        self.input_changed();
    }

    pub fn delete_char(&mut self) {
        if self.cursor_position == 0 {
            return;
        }
        self.cursor_position -= 1;
        let byte_index = self.byte_index();
        self.input.remove(byte_index);
        self.input_changed();
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor_position = (self.cursor_position + 1).min(self.input.chars().count());
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
        self.cursor_position = 0;
        self.input_changed();
    }

    pub fn select_next(&mut self) {
        if !self.filtered_commands.is_empty() {
            self.selected_index = (self.selected_index + 1) % self.filtered_commands.len();
        }
    }

    pub fn select_prev(&mut self) {
        if self.filtered_commands.is_empty() {
            return;
        }
        self.selected_index = self
            .selected_index
            .checked_sub(1)
            .unwrap_or(self.filtered_commands.len() - 1);
    }

    pub fn history_prev(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let index = match self.history_index {
            None => self.history.len() - 1,
            Some(0) => return,
            Some(i) => i - 1,
        };
        self.recall(Some(index));
    }

    pub fn history_next(&mut self) {
        match self.history_index {
            None => {}
            Some(i) if i + 1 < self.history.len() => self.recall(Some(i + 1)),
            Some(_) => self.recall(None),
        }
    }

    fn recall(&mut self, index: Option<usize>) {
        self.history_index = index;
        self.input = index
            .map(|i| self.history[i].clone())
            .unwrap_or_default();
        self.cursor_position = self.input.chars().count();
        self.update_filtered_commands();
    }

    /// Runs the exact match for the typed text if there is one, otherwise
    /// the highlighted entry.
    pub fn execute(&mut self) -> Option<Action> {
        let action = self
            .commands
            .iter()
            .find(|c| c.is_exact(&self.input))
            .or_else(|| {
                self.filtered_commands
                    .get(self.selected_index)
                    .map(|&i| &self.commands[i])
            })
            .map(|c| c.action.clone());

        if action.is_some() && !self.input.trim().is_empty() {
            self.history.push(self.input.clone());
            if self.history.len() > HISTORY_LIMIT {
                self.history.remove(0);
            }
        }

        self.close();
        action
    }

    fn input_changed(&mut self) {
        self.update_filtered_commands();
        self.selected_index = 0;
    }

    fn update_filtered_commands(&mut self) {
        self.filtered_commands = self
            .commands
            .iter()
            .enumerate()
            .filter(|(_, cmd)| cmd.matches(&self.input))
            .map(|(i, _)| i)
            .collect();
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor_position)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }
}
