//! Script materializer.
//!
//! Turns a sequence of [`CommitEvent`]s into a shell script that binds the
//! committer identity once, then for every event binds the author and
//! committer dates and creates an empty commit. The written file is owned by a
//! [`GeneratedScript`] guard which deletes it when dropped.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::event::CommitEvent;
use crate::obs;

/// Author and committer identity stamped on every synthesized commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Target interpreter of the generated script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptFormat {
    /// POSIX `sh`.
    #[default]
    Sh,
    /// Windows `cmd.exe` batch file.
    Cmd,
}

impl ScriptFormat {
    /// Lines emitted before the identity bindings.
    ///
    /// The `sh` script stops at the first failing command so a rejected
    /// commit surfaces as the script's exit status.
    pub fn header(&self) -> &'static [&'static str] {
        match self {
            ScriptFormat::Sh => &["#!/bin/sh", "set -e"],
            ScriptFormat::Cmd => &["@echo off"],
        }
    }

    /// Conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            ScriptFormat::Sh => "sh",
            ScriptFormat::Cmd => "bat",
        }
    }

    fn newline(&self) -> &'static str {
        match self {
            ScriptFormat::Sh => "\n",
            ScriptFormat::Cmd => "\r\n",
        }
    }

    fn binding(&self, var: &str, value: &str) -> String {
        match self {
            ScriptFormat::Sh => format!("export {var}={}", sh_quote(value)),
            ScriptFormat::Cmd => {
                format!("set \"{var}={}\"", cmd_escape(&value.replace('"', "'")))
            }
        }
    }

    fn commit(&self, message: &str) -> String {
        match self {
            ScriptFormat::Sh => format!("git commit --allow-empty -m {}", sh_quote(message)),
            // batch files keep going after a failure unless told otherwise
            ScriptFormat::Cmd => format!(
                "git commit --allow-empty -m \"{}\"{}if errorlevel 1 exit /b 1",
                cmd_escape(&message.replace('"', "'")),
                self.newline()
            ),
        }
    }
}

impl std::str::FromStr for ScriptFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sh" => Ok(ScriptFormat::Sh),
            "cmd" | "bat" => Ok(ScriptFormat::Cmd),
            other => Err(format!("unknown script format: {other}")),
        }
    }
}

fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn cmd_escape(value: &str) -> String {
    value
        .replace('\r', " ")
        .replace('\n', " ")
        .replace('%', "%%")
}

/// Builds script text and writes it next to the repository.
#[derive(Debug, Clone)]
pub struct ScriptMaterializer {
    format: ScriptFormat,
    file_name: String,
}

impl ScriptMaterializer {
    pub fn new(format: ScriptFormat, file_name: impl Into<String>) -> Self {
        Self {
            format,
            file_name: file_name.into(),
        }
    }

    pub fn format(&self) -> ScriptFormat {
        self.format
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Render the script text without touching the filesystem.
    pub fn render(&self, events: &[CommitEvent], identity: &Identity) -> String {
        let nl = self.format.newline();
        let mut out = String::new();

        for line in self.format.header() {
            out.push_str(line);
            out.push_str(nl);
        }

        for (var, value) in [
            ("GIT_AUTHOR_NAME", &identity.name),
            ("GIT_AUTHOR_EMAIL", &identity.email),
            ("GIT_COMMITTER_NAME", &identity.name),
            ("GIT_COMMITTER_EMAIL", &identity.email),
        ] {
            let _ = write!(out, "{}{nl}", self.format.binding(var, value));
        }

        for event in events {
            let date = event.git_date();
            let _ = write!(out, "{}{nl}", self.format.binding("GIT_AUTHOR_DATE", &date));
            let _ = write!(out, "{}{nl}", self.format.binding("GIT_COMMITTER_DATE", &date));
            let _ = write!(out, "{}{nl}", self.format.commit(&event.message));
        }

        out
    }

    /// Write the script into `dir`, replacing any leftover from an earlier run.
    pub fn materialize(
        &self,
        dir: &Path,
        events: &[CommitEvent],
        identity: &Identity,
    ) -> Result<GeneratedScript> {
        let path = dir.join(&self.file_name);
        std::fs::write(&path, self.render(events, identity))?;
        obs::emit_script_materialized(&path, events.len());

        Ok(GeneratedScript {
            path,
            commit_count: events.len(),
            format: self.format,
        })
    }
}

/// A script written to disk. Deleted when the guard goes out of scope.
#[derive(Debug)]
pub struct GeneratedScript {
    path: PathBuf,
    commit_count: usize,
    format: ScriptFormat,
}

impl GeneratedScript {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of commit instructions in the script.
    pub fn commit_count(&self) -> usize {
        self.commit_count
    }

    pub fn format(&self) -> ScriptFormat {
        self.format
    }
}

impl Drop for GeneratedScript {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => obs::emit_script_removed(&self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => obs::emit_script_remove_failed(&self.path, &e),
        }
    }
}
