use crate::filter::FilterMode;

/// User intent, decoupled from whichever window toolkit produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Write the current frame to `capture_<timestamp>.jpg`
    SaveFull,
    /// Re-detect on the current frame and write each crop
    SaveFaces,
    SelectFilter(FilterMode),
    /// Window closed
    Quit,
}

impl Command {
    /// Map a typed key; unassigned keys have no command
    pub fn from_char(key: char) -> Option<Self> {
        match key {
            ' ' => Some(Command::SaveFull),
            'f' | 'F' => Some(Command::SaveFaces),
            digit => FilterMode::from_digit(digit).map(Command::SelectFilter),
        }
    }
}
