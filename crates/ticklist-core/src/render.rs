use std::io::{self, IsTerminal, Write};

use chrono::NaiveDate;
use ticklist_shared::Task;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::controller::{Notice, Summary};
use crate::datetime::format_due;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    date_format: String,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: io::stdout().is_terminal(),
            date_format: cfg.date_format.clone(),
        }
    }

    pub fn plain(cfg: &Config) -> Self {
        Self {
            color: false,
            date_format: cfg.date_format.clone(),
        }
    }

    #[tracing::instrument(skip(self, writer, tasks))]
    pub fn write_task_table<W: Write>(
        &self,
        writer: W,
        tasks: &[Task],
        summary: Summary,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Done".to_string(),
            "Due".to_string(),
            "Title".to_string(),
        ];

        let rows = tasks
            .iter()
            .map(|task| {
                let id = self.paint(&task.id.to_string(), "33");
                let done = if task.is_completed { "[x]" } else { "[ ]" }.to_string();
                let due = task
                    .due_date
                    .map(|date| format_due(date, &self.date_format))
                    .unwrap_or_default();
                let due = if task.is_overdue(today) {
                    self.paint(&due, "31")
                } else {
                    due
                };
                vec![id, done, due, task.title.clone()]
            })
            .collect();

        let mut writer = writer;
        write_table(&mut writer, headers, rows)?;
        writeln!(
            writer,
            "{} tasks, {} done, {} remaining",
            summary.total, summary.completed, summary.remaining
        )?;
        Ok(())
    }

    pub fn print_task_table(
        &self,
        tasks: &[Task],
        summary: Summary,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        self.write_task_table(io::stdout().lock(), tasks, summary, today)
    }

    pub fn print_notices(&self, notices: &[Notice]) -> anyhow::Result<()> {
        let mut err = io::stderr().lock();
        for notice in notices {
            let label = self.paint("error:", "31");
            writeln!(err, "{label} {}", notice.message)?;
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    writer: &mut W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|header| UnicodeWidthStr::width(header.as_str()))
        .collect();

    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(visible_width(cell));
        }
    }

    for (header, width) in headers.iter().zip(&widths) {
        write!(writer, "{header:width$} ")?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "")?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(&widths) {
            let padding = width.saturating_sub(visible_width(cell));
            write!(writer, "{cell}{} ", " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn visible_width(cell: &str) -> usize {
    UnicodeWidthStr::width(strip_ansi(cell).as_str())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use ticklist_shared::{Task, TaskId};

    use super::{Renderer, strip_ansi};
    use crate::config::Config;
    use crate::controller::Summary;

    #[test]
    fn table_aligns_wide_titles_and_formats_dates() {
        let tasks = vec![
            Task {
                id: TaskId(12),
                title: "買い物".to_string(),
                is_completed: false,
                due_date: NaiveDate::from_ymd_opt(2025, 3, 10),
                created_at: None,
            },
            Task {
                id: TaskId(3),
                title: "walk".to_string(),
                is_completed: true,
                due_date: None,
                created_at: None,
            },
        ];
        let summary = Summary {
            total: 2,
            completed: 1,
            remaining: 1,
        };
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date");

        let mut out = Vec::new();
        Renderer::plain(&Config::default())
            .write_task_table(&mut out, &tasks, summary, today)
            .expect("render");
        let text = String::from_utf8(out).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "ID Done Due        Title  ");
        assert_eq!(lines[2], "12 [ ]  10/03/2025 買い物 ");
        assert_eq!(lines[3], "3  [x]             walk   ");
        assert_eq!(lines[4], "2 tasks, 1 done, 1 remaining");
    }

    #[test]
    fn strips_color_codes() {
        assert_eq!(strip_ansi("\x1b[31m10/03/2025\x1b[0m"), "10/03/2025");
    }
}
