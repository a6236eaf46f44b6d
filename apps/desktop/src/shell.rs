//! Line-oriented front end: parses user commands, forwards them to the list
//! controller and renders the list and summary views.

use std::{io::Write, sync::Arc};

use anyhow::{Context, Result};
use client_core::{
    ControllerUpdate, DeleteChoice, Notification, ScreenView, SessionIdentity,
    TodoListController, TodoListView,
};
use shared::domain::TodoId;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    List,
    Json,
    Add(String),
    Toggle(usize),
    Delete(usize),
    Confirm,
    Abandon,
    Edit(usize),
    Draft(String),
    Save,
    Cancel,
    Login(String),
    Logout,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShellError {
    #[error("unknown command '{0}'; type 'help'")]
    Unknown(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
    #[error("'{0}' is not a row number")]
    BadRow(String),
    #[error("no row {0}")]
    NoSuchRow(usize),
}

pub const HELP: &str = "\
commands:
  list | json              show the list (json: machine-readable)
  add <text>               add a todo
  toggle <n>               flip completion of row n
  delete <n>               delete row n (asks for confirmation)
  yes | no                 answer the pending confirmation
  edit <n>                 edit row n inline
  draft <text>             replace the edit buffer
  save | cancel            commit or discard the edit
  login <user> | logout    switch the signed-in user
  quit";

impl ShellCommand {
    pub fn parse(input: &str) -> Result<Option<Self>, ShellError> {
        let line = input.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "list" | "ls" => Self::List,
            "json" => Self::Json,
            // Raw text; the controller does the trimming.
            "add" => Self::Add(required(rest, "add")?.to_string()),
            "toggle" => Self::Toggle(row_number(rest, "toggle")?),
            "delete" | "rm" => Self::Delete(row_number(rest, "delete")?),
            "yes" | "y" => Self::Confirm,
            "no" | "n" => Self::Abandon,
            "edit" => Self::Edit(row_number(rest, "edit")?),
            "draft" => Self::Draft(draft_text(input.trim_start(), word.len())),
            "save" => Self::Save,
            "cancel" => Self::Cancel,
            "login" => Self::Login(required(rest, "login")?.to_string()),
            "logout" => Self::Logout,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(ShellError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

fn required<'a>(rest: &'a str, command: &'static str) -> Result<&'a str, ShellError> {
    if rest.is_empty() {
        Err(ShellError::MissingArgument(command))
    } else {
        Ok(rest)
    }
}

fn row_number(rest: &str, command: &'static str) -> Result<usize, ShellError> {
    let raw = required(rest, command)?;
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ShellError::BadRow(raw.to_string())),
    }
}

/// Everything after the command word and one separating space, verbatim, so
/// surrounding whitespace reaches the edit buffer untouched.
fn draft_text(line: &str, word_len: usize) -> String {
    let text = line.get(word_len..).unwrap_or_default();
    text.strip_prefix(' ').unwrap_or(text).to_string()
}

pub fn render_view(view: &ScreenView) -> String {
    match view {
        ScreenView::Loading => "loading...".to_string(),
        ScreenView::SignedOut => {
            "You are signed out. Sign in with 'login <user>' to see your todos.".to_string()
        }
        ScreenView::Todos(list) => render_list(list),
    }
}

fn render_list(list: &TodoListView) -> String {
    let progress = &list.progress;
    let mut out = format!(
        "{} ({}%)\n",
        progress.summary_label(),
        progress.rounded_percentage()
    );
    out.push_str(&progress_bar(progress.percentage, 20));
    out.push('\n');

    if list.rows.is_empty() {
        out.push_str("No todos yet! Add your first todo above.");
        return out;
    }

    for (index, row) in list.rows.iter().enumerate() {
        let mark = if row.record.is_completed { "x" } else { " " };
        let text = match &row.draft {
            Some(draft) => format!("[editing] {draft}"),
            None => row.record.text.clone(),
        };
        out.push_str(&format!("{:>3}. [{mark}] {text}\n", index + 1));
    }
    out.pop();
    out
}

fn progress_bar(percentage: f64, width: usize) -> String {
    let filled = ((percentage / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

fn view_json(view: &ScreenView) -> serde_json::Result<String> {
    match view {
        ScreenView::Todos(list) => serde_json::to_string_pretty(list),
        other => serde_json::to_string(&render_view(other)),
    }
}

pub fn render_notification(notification: &Notification) -> String {
    format!("{}: {}", notification.title(), notification.message())
}

pub struct Shell<W: Write> {
    controller: TodoListController,
    identity: Arc<SessionIdentity>,
    out: W,
    json: bool,
}

impl<W: Write> Shell<W> {
    pub fn new(controller: TodoListController, identity: Arc<SessionIdentity>, out: W) -> Self {
        Self {
            controller,
            identity,
            out,
            json: false,
        }
    }

    /// Renders every view as JSON instead of text.
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    #[cfg(test)]
    fn controller(&self) -> &TodoListController {
        &self.controller
    }

    #[cfg(test)]
    fn output(&self) -> &W {
        &self.out
    }

    fn row_id(&self, row: usize) -> Result<TodoId, ShellError> {
        self.controller
            .records()
            .get(row - 1)
            .map(|record| record.id.clone())
            .ok_or(ShellError::NoSuchRow(row))
    }

    /// Handles one input line. Returns `false` once the user quits.
    pub fn handle_line(&mut self, line: &str) -> Result<bool> {
        let command = match ShellCommand::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(true),
            Err(err) => {
                writeln!(self.out, "{err}")?;
                return Ok(true);
            }
        };
        debug!(?command, "shell command");

        if let Err(err) = self.execute(command.clone()) {
            writeln!(self.out, "{err}")?;
        }
        Ok(command != ShellCommand::Quit)
    }

    fn execute(&mut self, command: ShellCommand) -> Result<()> {
        match command {
            ShellCommand::List => self.print_view()?,
            ShellCommand::Json => {
                let json = view_json(&self.controller.view())?;
                writeln!(self.out, "{json}")?;
            }
            ShellCommand::Add(text) => {
                if self.controller.create_todo(&text).is_none() {
                    writeln!(self.out, "nothing to add")?;
                }
            }
            ShellCommand::Toggle(row) => {
                let id = self.row_id(row)?;
                self.controller.toggle_completion(&id);
            }
            ShellCommand::Delete(row) => {
                let id = self.row_id(row)?;
                let prompt = self.controller.request_delete(&id);
                writeln!(self.out, "{}: {} [yes/no]", prompt.title, prompt.message)?;
            }
            ShellCommand::Confirm => {
                if self.controller.resolve_delete(DeleteChoice::Confirm).is_none() {
                    writeln!(self.out, "nothing to confirm")?;
                }
            }
            ShellCommand::Abandon => {
                self.controller.resolve_delete(DeleteChoice::Abandon);
            }
            ShellCommand::Edit(row) => {
                let id = self.row_id(row)?;
                self.controller.begin_edit_by_id(&id);
                self.print_view()?;
            }
            ShellCommand::Draft(text) => {
                if !self.controller.update_draft(text) {
                    writeln!(self.out, "not editing; use 'edit <n>' first")?;
                }
            }
            ShellCommand::Save => {
                if self.controller.commit_edit().is_none() {
                    writeln!(self.out, "nothing to save")?;
                }
            }
            ShellCommand::Cancel => {
                self.controller.cancel_edit();
                self.print_view()?;
            }
            ShellCommand::Login(user) => {
                self.identity.sign_in(user.as_str());
                self.controller.sync_auth();
                self.print_view()?;
            }
            ShellCommand::Logout => {
                self.identity.sign_out();
                self.controller.sync_auth();
                self.print_view()?;
            }
            ShellCommand::Help => writeln!(self.out, "{HELP}")?,
            ShellCommand::Quit => {}
        }
        Ok(())
    }

    pub fn print_view(&mut self) -> Result<()> {
        let view = self.controller.view();
        let rendered = if self.json {
            view_json(&view)?
        } else {
            render_view(&view)
        };
        writeln!(self.out, "{rendered}")?;
        Ok(())
    }

    fn handle_update(&mut self, update: ControllerUpdate) -> Result<()> {
        match update {
            ControllerUpdate::Snapshot => self.print_view()?,
            ControllerUpdate::Outcome(outcome) => {
                debug!(
                    ticket = outcome.ticket.0,
                    success = outcome.is_success(),
                    "mutation settled"
                );
            }
        }
        for notification in self.controller.take_notifications() {
            writeln!(self.out, "{}", render_notification(&notification))?;
        }
        Ok(())
    }

    /// Reads commands from stdin while applying backend pushes and mutation
    /// outcomes as they arrive.
    pub async fn run(mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        writeln!(self.out, "{HELP}")?;
        self.print_view()?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("failed to read command")? else {
                        break;
                    };
                    if !self.handle_line(&line)? {
                        break;
                    }
                }
                Some(update) = self.controller.next_update() => self.handle_update(update)?,
            }
        }

        // Let in-flight requests settle so their failures are still reported.
        while let Some(outcome) = self.controller.next_outcome().await {
            self.handle_update(ControllerUpdate::Outcome(outcome))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/shell_tests.rs"]
mod tests;
