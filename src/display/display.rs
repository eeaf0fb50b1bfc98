//! SDL2 Window Display Module
//! Creates a fixed-size window, paints processed frames into it and turns
//! keyboard and window events into [`Command`]s.

use std::time::Instant;

use flume::Sender;
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{Canvas, TextureCreator};
use sdl2::video::{Window, WindowContext};
use sdl2::EventPump;
use tracing::{debug, info};

use super::{DisplayError, Surface};
use crate::capture::Frame;
use crate::session::Command;
use crate::DisplayConfig;

/// SDL2 Window Display
/// Owns the window, its canvas and the event pump. Must live on the thread
/// that initialised SDL.
pub struct Sdl2Display {
    canvas: Canvas<Window>,
    texture_creator: TextureCreator<WindowContext>,
    event_pump: EventPump,
    commands: Sender<Command>,
}

impl Sdl2Display {
    pub fn new(
        sdl_context: &sdl2::Sdl,
        config: &DisplayConfig,
        commands: Sender<Command>,
    ) -> Result<Self, DisplayError> {
        let video_subsystem = sdl_context.video().map_err(DisplayError::Init)?;

        let window = video_subsystem
            .window(&config.title, config.width, config.height)
            .position_centered()
            .build()
            .map_err(|e| DisplayError::Init(e.to_string()))?;

        let mut canvas = window
            .into_canvas()
            .present_vsync()
            .build()
            .map_err(|e| DisplayError::Init(e.to_string()))?;
        canvas.window_mut().raise();

        let texture_creator = canvas.texture_creator();
        let event_pump = sdl_context.event_pump().map_err(DisplayError::Init)?;

        info!("Opened {}x{} window", config.width, config.height);
        Ok(Self {
            canvas,
            texture_creator,
            event_pump,
            commands,
        })
    }

    fn send(&self, command: Command) {
        // The receiver lives in the loop that owns this surface
        if self.commands.send(command).is_err() {
            debug!("Command queue closed, dropping {:?}", command);
        }
    }
}

impl Surface for Sdl2Display {
    fn present(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        let render_start = Instant::now();
        let rgb = frame.to_rgb();
        let (width, height) = rgb.dimensions();

        let mut texture = self
            .texture_creator
            .create_texture_streaming(PixelFormatEnum::RGB24, width, height)
            .map_err(|e| DisplayError::Render(e.to_string()))?;

        texture
            .update(None, rgb.as_raw(), (width * 3) as usize)
            .map_err(|e| DisplayError::Render(e.to_string()))?;

        self.canvas.clear();
        self.canvas
            .copy(&texture, None, None)
            .map_err(DisplayError::Render)?;

        self.canvas.present();
        metrics::histogram!("render_time_us").record(render_start.elapsed().as_micros() as f64);
        Ok(())
    }

    fn pump_events(&mut self) {
        let events: Vec<Event> = self.event_pump.poll_iter().collect();
        for event in events {
            let command = match event {
                Event::Quit { .. } => {
                    info!("Quit event received");
                    Some(Command::Quit)
                }
                Event::KeyDown {
                    keycode: Some(key),
                    repeat: false,
                    ..
                } => command_for_key(key),
                _ => None,
            };

            if let Some(command) = command {
                self.send(command);
            }
        }
    }
}

/// Keys are matched by SDL's key name so the mapping is shared with
/// [`Command::from_char`]
fn command_for_key(key: Keycode) -> Option<Command> {
    key_char(&key.name()).and_then(Command::from_char)
}

fn key_char(name: &str) -> Option<char> {
    let name = name.strip_prefix("Keypad ").unwrap_or(name);
    if name == "Space" {
        return Some(' ');
    }

    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterMode;
    use rstest::rstest;

    #[rstest]
    #[case("Space", Some(Command::SaveFull))]
    #[case("F", Some(Command::SaveFaces))]
    #[case("1", Some(Command::SelectFilter(FilterMode::None)))]
    #[case("Keypad 3", Some(Command::SelectFilter(FilterMode::Blur)))]
    #[case("4", Some(Command::SelectFilter(FilterMode::EdgeDetect)))]
    #[case("Q", None)]
    #[case("5", None)]
    #[case("Escape", None)]
    #[case("Return", None)]
    fn key_names_map_to_commands(#[case] name: &str, #[case] expected: Option<Command>) {
        assert_eq!(key_char(name).and_then(Command::from_char), expected);
    }
}
