use crate::io::Key;
use crate::registry::Feature;

/// Printed at startup and on `m`.
pub const CONTROLS: &str = "Controls:

\tLeft / Right arrows: Prev / next image
\tm: Print this menu again
\tq: Quit
\t----------------------------------------
\tt: Toggle thresholding (adaptive)
\tc: Toggle contour detection
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Previous,
    Next,
    Toggle(Feature),
    Menu,
    Quit,
}

/// Maps a key to the command it triggers. Unbound keys yield `None`.
pub fn classify(key: Key) -> Option<Command> {
    match key {
        Key::Left => Some(Command::Previous),
        Key::Right => Some(Command::Next),
        Key::Char('t') => Some(Command::Toggle(Feature::Threshold)),
        Key::Char('c') => Some(Command::Toggle(Feature::Contour)),
        Key::Char('m') => Some(Command::Menu),
        Key::Char('q') => Some(Command::Quit),
        Key::Char(_) => None,
    }
}
