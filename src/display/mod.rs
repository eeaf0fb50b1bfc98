pub mod display;

use thiserror::Error;

use crate::capture::Frame;

pub use display::Sdl2Display;

#[derive(Debug, Error)]
pub enum DisplayError {
    /// The windowing library could not be loaded or initialised
    #[error("failed to initialise display: {0}")]
    Init(String),

    #[error("failed to render frame: {0}")]
    Render(String),
}

/// A window the loop can paint frames into and pull user input from.
///
/// `pump_events` must not block: it forwards whatever input has arrived since
/// the last call into the command queue the surface was built with.
pub trait Surface {
    fn present(&mut self, frame: &Frame) -> Result<(), DisplayError>;

    fn pump_events(&mut self);
}
