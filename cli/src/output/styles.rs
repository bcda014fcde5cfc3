//! Terminal palette for rescue progress, status tables and failure reports.

use owo_colors::Style;

/// Styles applied to terminal output.
///
/// The default palette is plain: every style renders text unchanged, which
/// is what pipes, `--no-color` and `NO_COLOR` get.
#[derive(Default, Clone)]
pub struct Styles {
    /// Completed workflow steps.
    pub success: Style,
    /// Non-fatal problems, e.g. a rescue disk left behind after restore.
    pub warning: Style,
    /// Workflow failures on stderr.
    pub error: Style,
    /// In-flight steps and operator hints.
    pub info: Style,
    /// Steps that never ran and key labels.
    pub dim: Style,
    pub bold: Style,
    /// Section titles above status tables.
    pub header: Style,
    /// The boot disk row in a disk table.
    pub boot: Style,
}

impl Styles {
    /// Palette for a color-capable terminal.
    #[must_use]
    pub fn colored() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().yellow(),
            error: Style::new().red(),
            info: Style::new().blue(),
            dim: Style::new().dimmed(),
            bold: Style::new().bold(),
            header: Style::new().bold().cyan(),
            boot: Style::new().bold().green(),
        }
    }

    /// Colored palette when `colors` is set, plain otherwise.
    #[must_use]
    pub fn for_terminal(colors: bool) -> Self {
        if colors { Self::colored() } else { Self::default() }
    }
}
