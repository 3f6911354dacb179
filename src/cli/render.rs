//! Task line formatting.

use crossterm::style::Stylize;

use crate::model::{Status, Task};
use crate::util::time::format_due_date;

/// One task as a listing line, optionally numbered from 1.
#[must_use]
pub fn task_line(position: Option<usize>, task: &Task, color: bool) -> String {
    let glyph = task.status.glyph();
    let glyph = if color && task.status == Status::Done {
        glyph.green().to_string()
    } else {
        glyph.to_string()
    };
    let due = task.due_date.map(format_due_date).unwrap_or_default();

    match position {
        Some(n) => format!("{n} - {glyph} {}\t{due}", task.description),
        None => format!("{glyph} {}\t{due}", task.description),
    }
}
