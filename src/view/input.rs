//! Input events and the sources that produce them.
//!
//! The preview polls its [`InputSource`] once per frame. [`LineInput`] reads
//! text commands on a background thread and forwards them over a channel,
//! so the render loop never blocks on input.

use std::collections::VecDeque;
use std::io::BufRead;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};

use glam::{Vec2, Vec3};

/// Keys the preview reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Escape,
    P,
    O,
    W,
    A,
    S,
    D,
    Space,
    C,
}

impl Key {
    /// Camera-space movement bound to this key (x right, y up, z forward).
    pub fn movement(self) -> Option<Vec3> {
        match self {
            Key::W => Some(Vec3::Z),
            Key::S => Some(Vec3::NEG_Z),
            Key::D => Some(Vec3::X),
            Key::A => Some(Vec3::NEG_X),
            Key::Space => Some(Vec3::Y),
            Key::C => Some(Vec3::NEG_Y),
            _ => None,
        }
    }
}

/// Raw input event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyDown(Key),
    KeyUp(Key),
    /// Pointer motion in pixels (+x right, +y down).
    PointerMotion(Vec2),
    /// Window closed or input stream ended.
    Quit,
}

/// Per-frame event provider.
pub trait InputSource {
    /// Events that arrived since the previous poll, oldest first.
    fn poll(&mut self) -> Vec<InputEvent>;
}

/// Replays a fixed list of per-frame event batches.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    frames: VecDeque<Vec<InputEvent>>,
    quit_when_done: bool,
}

impl ScriptedInput {
    pub fn new(frames: impl IntoIterator<Item = Vec<InputEvent>>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            quit_when_done: false,
        }
    }

    /// Emit [`InputEvent::Quit`] once the script runs out.
    pub fn then_quit(mut self) -> Self {
        self.quit_when_done = true;
        self
    }

    /// Press and release of one key within the same frame.
    pub fn tap(key: Key) -> Vec<InputEvent> {
        vec![InputEvent::KeyDown(key), InputEvent::KeyUp(key)]
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> Vec<InputEvent> {
        match self.frames.pop_front() {
            Some(events) => events,
            None if self.quit_when_done => vec![InputEvent::Quit],
            None => Vec::new(),
        }
    }
}

/// Parse one text command into events.
///
/// Commands: `p`/`picture`, `o`/`oneshot`, `q`/`quit`/`exit`, the movement
/// keys `w a s d space c`, and `look <dx> <dy>`. Blank lines yield nothing.
pub fn parse_command(line: &str) -> Result<Vec<InputEvent>, String> {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return Ok(Vec::new());
    };

    let key = match cmd.to_ascii_lowercase().as_str() {
        "p" | "picture" => Key::P,
        "o" | "oneshot" => Key::O,
        "q" | "quit" | "exit" => Key::Escape,
        "w" => Key::W,
        "a" => Key::A,
        "s" => Key::S,
        "d" => Key::D,
        "space" | "up" => Key::Space,
        "c" | "down" => Key::C,
        "look" => {
            let mut axis = || -> Result<f32, String> {
                words
                    .next()
                    .ok_or_else(|| "look needs <dx> <dy>".to_string())?
                    .parse::<f32>()
                    .map_err(|e| format!("look: {e}"))
            };
            let dx = axis()?;
            let dy = axis()?;
            return Ok(vec![InputEvent::PointerMotion(Vec2::new(dx, dy))]);
        }
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(vec![InputEvent::KeyDown(key), InputEvent::KeyUp(key)])
}

/// Text commands read line by line on a background thread.
pub struct LineInput {
    rx: Receiver<InputEvent>,
    _reader: JoinHandle<()>,
}

impl LineInput {
    /// Read commands from standard input.
    pub fn stdin() -> Self {
        Self::spawn(std::io::BufReader::new(std::io::stdin()))
    }

    /// Read commands from any buffered reader.
    pub fn spawn<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (tx, rx) = channel();
        let handle = thread::spawn(move || reader_loop(reader, tx));
        Self { rx, _reader: handle }
    }
}

impl InputSource for LineInput {
    fn poll(&mut self) -> Vec<InputEvent> {
        self.rx.try_iter().collect()
    }
}

fn reader_loop<R: BufRead>(reader: R, tx: Sender<InputEvent>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("input read failed: {e}");
                break;
            }
        };
        match parse_command(&line) {
            Ok(events) => {
                for event in events {
                    if tx.send(event).is_err() {
                        return; // preview gone
                    }
                }
            }
            Err(msg) => tracing::warn!("{msg}"),
        }
    }
    // End of input behaves like closing the window
    let _ = tx.send(InputEvent::Quit);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("p").unwrap(), ScriptedInput::tap(Key::P));
        assert_eq!(parse_command("  OneShot ").unwrap(), ScriptedInput::tap(Key::O));
        assert_eq!(parse_command("quit").unwrap(), ScriptedInput::tap(Key::Escape));
        assert_eq!(
            parse_command("look 4 -2.5").unwrap(),
            vec![InputEvent::PointerMotion(Vec2::new(4.0, -2.5))]
        );
        assert!(parse_command("").unwrap().is_empty());
        assert!(parse_command("jump").is_err());
        assert!(parse_command("look 1").is_err());
    }

    #[test]
    fn test_scripted_input() {
        let mut input = ScriptedInput::new([ScriptedInput::tap(Key::P), vec![]]).then_quit();
        assert_eq!(input.poll(), ScriptedInput::tap(Key::P));
        assert!(input.poll().is_empty());
        assert_eq!(input.poll(), vec![InputEvent::Quit]);
    }

    #[test]
    fn test_line_input_ends_with_quit() {
        let mut input = LineInput::spawn(Cursor::new("p\nbogus\no\n"));
        let mut events = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while !events.contains(&InputEvent::Quit) && Instant::now() < deadline {
            events.extend(input.poll());
            std::thread::sleep(Duration::from_millis(1));
        }

        let mut expected = ScriptedInput::tap(Key::P);
        expected.extend(ScriptedInput::tap(Key::O));
        expected.push(InputEvent::Quit);
        assert_eq!(events, expected);
    }

    #[test]
    fn test_stdin_input_polls_without_blocking() {
        // The reader thread owns stdin; polling only drains the channel
        let mut input: Box<dyn InputSource> = Box::new(LineInput::stdin());
        let started = Instant::now();
        input.poll();
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_movement_keys() {
        assert_eq!(Key::W.movement(), Some(Vec3::Z));
        assert_eq!(Key::P.movement(), None);
    }
}
