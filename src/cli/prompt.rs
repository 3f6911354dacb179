//! Line-oriented prompting over any reader/writer pair.

use std::io::{self, BufRead, Write};
use std::iter;
use std::ops::RangeInclusive;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

use crate::error::Result;

pub struct Prompter<R, W> {
    input: R,
    output: W,
    raw_terminal: bool,
    color: bool,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            raw_terminal: false,
            color: false,
        }
    }

    /// Read keys from the terminal instead of `input`.
    ///
    /// Answers are echoed by hand (passwords are not) and Ctrl+C cancels the
    /// current question with `Interrupted` instead of killing the process.
    #[must_use]
    pub const fn raw_terminal(mut self, raw: bool) -> Self {
        self.raw_terminal = raw;
        self
    }

    #[must_use]
    pub const fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub const fn use_color(&self) -> bool {
        self.color
    }

    /// Give back the output sink.
    pub fn into_output(self) -> W {
        self.output
    }

    /// Write a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    pub fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{text}")?;
        Ok(())
    }

    /// Ask for a line of text. End of input is `UnexpectedEof`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error on end of input or a failed read/write;
    /// Ctrl+C on a raw terminal is `Interrupted`.
    pub fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}: ")?;
        self.output.flush()?;
        self.read_line(true)
    }

    /// Ask for a secret. Not echoed on a raw terminal.
    ///
    /// # Errors
    ///
    /// Same as [`Prompter::ask`].
    pub fn ask_password(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}: ")?;
        self.output.flush()?;
        self.read_line(false)
    }

    /// Ask until the answer is a number inside `choices`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error on end of input or a failed read/write.
    pub fn ask_choice(&mut self, prompt: &str, choices: RangeInclusive<usize>) -> Result<usize> {
        loop {
            let answer = self.ask(prompt)?;
            match answer.trim().parse::<usize>() {
                Ok(n) if choices.contains(&n) => return Ok(n),
                _ => self.say("Please select one of the available options")?,
            }
        }
    }

    /// Yes/no question; an empty answer takes the default.
    ///
    /// # Errors
    ///
    /// Returns an I/O error on end of input or a failed read/write.
    pub fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        let hint = if default { "[y/n] (y)" } else { "[y/n] (n)" };
        loop {
            let answer = self.ask(&format!("{prompt} {hint}"))?;
            match answer.trim().to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.say("Please enter Y or N")?,
            }
        }
    }

    fn read_line(&mut self, echo: bool) -> Result<String> {
        if self.raw_terminal {
            return Ok(read_raw_line(&mut self.output, echo)?);
        }

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

fn read_raw_line<W: Write>(output: &mut W, echo: bool) -> io::Result<String> {
    terminal::enable_raw_mode()?;
    let events = iter::from_fn(|| Some(event::read()));
    let result = collect_line(events, output, echo);
    terminal::disable_raw_mode()?;
    writeln!(output)?;
    result
}

/// Turn key presses into a line. Ctrl+C is `Interrupted`; Ctrl+D on an
/// empty line is `UnexpectedEof`.
fn collect_line<I, W>(events: I, output: &mut W, echo: bool) -> io::Result<String>
where
    I: IntoIterator<Item = io::Result<Event>>,
    W: Write,
{
    let mut line = String::new();
    for event in events {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event?
        else {
            continue;
        };
        let ctrl = modifiers.contains(KeyModifiers::CONTROL);
        match code {
            KeyCode::Enter => return Ok(line),
            KeyCode::Char('c') if ctrl => return Err(io::ErrorKind::Interrupted.into()),
            KeyCode::Char('d') if ctrl && line.is_empty() => {
                return Err(io::ErrorKind::UnexpectedEof.into());
            }
            KeyCode::Backspace => {
                if line.pop().is_some() && echo {
                    output.write_all(b"\x08 \x08")?;
                    output.flush()?;
                }
            }
            KeyCode::Char(c) if !ctrl => {
                line.push(c);
                if echo {
                    write!(output, "{c}")?;
                    output.flush()?;
                }
            }
            _ => {}
        }
    }
    Err(io::ErrorKind::UnexpectedEof.into())
}
