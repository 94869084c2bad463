use flowscope_core::PatternId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    Back,
    Help,
    ToggleTheme,
    OpenCommandPalette,
    Up,
    Down,
    Select,
    NextStep,
    PrevStep,
    ToggleAutoplay,
    SpeedUp,
    SpeedDown,
    TriggerScenario(usize),
    ToggleDependency,
    LagUp,
    LagDown,
    OpenPattern(PatternId),
    ShowCatalog,
    None,
}

impl Action {
    /// Whether the action only makes sense while a pattern is open.
    pub fn needs_pattern(&self) -> bool {
        matches!(
            self,
            Action::NextStep
                | Action::PrevStep
                | Action::ToggleAutoplay
                | Action::TriggerScenario(_)
                | Action::ToggleDependency
                | Action::LagUp
                | Action::LagDown
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Command,
}

pub struct EventHandler {
    input_mode: InputMode,
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler {
    pub fn new() -> Self {
        Self {
            input_mode: InputMode::Normal,
        }
    }

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    pub fn set_input_mode(&mut self, mode: InputMode) {
        self.input_mode = mode;
    }

    pub fn is_command_mode(&self) -> bool {
        self.input_mode == InputMode::Command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_actions_need_pattern() {
        assert!(Action::NextStep.needs_pattern());
        assert!(Action::TriggerScenario(0).needs_pattern());
        assert!(Action::LagUp.needs_pattern());
        assert!(!Action::Quit.needs_pattern());
        assert!(!Action::SpeedUp.needs_pattern());
        assert!(!Action::OpenPattern(PatternId::Saga).needs_pattern());
    }

    #[test]
    fn test_input_mode_switch() {
        let mut handler = EventHandler::new();
        assert_eq!(handler.input_mode(), InputMode::Normal);

        handler.set_input_mode(InputMode::Command);
        assert!(handler.is_command_mode());
    }
}
