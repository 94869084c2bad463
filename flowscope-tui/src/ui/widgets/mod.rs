mod controls_panel;
mod diagram;
mod footer;
mod header;
mod ledger_table;
mod log_viewer;
mod modal;
mod progress_bar;
mod spinner;
mod timeline;
mod toast;

pub use controls_panel::ControlsPanel;
pub use diagram::Diagram;
pub use footer::Footer;
pub use header::{Header, VERSION};
pub use ledger_table::LedgerView;
pub use log_viewer::LogViewer;
pub use modal::{CommandPaletteOverlay, HelpModal, Modal, ModalSize};
pub use progress_bar::StepProgress;
pub use spinner::Spinner;
pub use timeline::TimelineView;
pub use toast::{Toast, ToastLevel, ToastManager};
