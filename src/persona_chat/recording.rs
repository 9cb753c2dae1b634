//! Append-only log of accepted completions for offline analysis.
//!
//! Recording is a fire-and-forget side effect: the scheduler hands every accepted
//! (non-denied) completion to the configured [`RecordingSink`] and only logs a failed write.

use std::error::Error;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;

/// Prefix of every recording file name.
pub const RECORD_FILE_PREFIX: &str = "PersonalityOutput";
/// Timestamp layout appended to the prefix (`yy-MM-dd-HH-mm-ss`).
pub const RECORD_DATE_FORMAT: &str = "%y-%m-%d-%H-%M-%S";

#[derive(Debug)]
pub struct RecordingError(pub io::Error);

impl fmt::Display for RecordingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Recording failed: {}", self.0)
    }
}

impl Error for RecordingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

impl From<io::Error> for RecordingError {
    fn from(err: io::Error) -> Self {
        RecordingError(err)
    }
}

/// One accepted exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRecord {
    /// `"You are <backstory>. <summary>"` of the speaking character.
    pub agent_summary: String,
    /// The prompt as the character perceived it, without the reply instructions.
    pub prompt: String,
    pub reply: String,
}

impl ConversationRecord {
    /// Render as three lines: summary, capitalised prompt with a question, raw reply.
    pub fn render(&self) -> String {
        format!(
            "{}\n{} What is your response?\n{}",
            self.agent_summary,
            capitalize_first(&self.prompt),
            self.reply
        )
    }
}

/// Build the summary line stored with each record.
pub fn agent_summary(backstory: &str, trait_summary: &str) -> String {
    format!("You are {}. {}", backstory, trait_summary)
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Destination for accepted completions.
pub trait RecordingSink: Send + Sync {
    fn record(&self, record: &ConversationRecord) -> Result<(), RecordingError>;
}

/// Writes records to `PersonalityOutput_<timestamp>.txt` inside a directory.
pub struct FileRecorder {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileRecorder {
    /// Create the directory if needed and open a fresh, timestamped file in append mode.
    pub fn create(dir: &Path) -> Result<Self, RecordingError> {
        fs::create_dir_all(dir)?;
        let name = format!(
            "{}_{}.txt",
            RECORD_FILE_PREFIX,
            Local::now().format(RECORD_DATE_FORMAT)
        );
        let path = dir.join(name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        log::info!("Opened file for recording data at: {}", path.display());
        Ok(FileRecorder {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordingSink for FileRecorder {
    fn record(&self, record: &ConversationRecord) -> Result<(), RecordingError> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "recording file lock poisoned"))?;
        writeln!(file, "{}", record.render())?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> ConversationRecord {
        ConversationRecord {
            agent_summary: agent_summary("a baker from Dover", "You are very open."),
            prompt: "a smith named Bo who is looking at you has just said \"Hi\". ".into(),
            reply: "\"Morning, Bo.\"".into(),
        }
    }

    #[test]
    fn render_capitalises_prompt_and_keeps_reply_raw() {
        assert_eq!(
            sample().render(),
            "You are a baker from Dover. You are very open.\n\
             A smith named Bo who is looking at you has just said \"Hi\".  What is your response?\n\
             \"Morning, Bo.\""
        );
    }

    #[test]
    fn file_recorder_appends_records() {
        let tmp = TempDir::new().unwrap();
        let recorder = FileRecorder::create(&tmp.path().join("records")).unwrap();
        let name = recorder.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("PersonalityOutput_"));
        assert!(name.ends_with(".txt"));

        recorder.record(&sample()).unwrap();
        recorder.record(&sample()).unwrap();
        let contents = fs::read_to_string(recorder.path()).unwrap();
        assert_eq!(contents.lines().count(), 6);
        assert!(contents.starts_with("You are a baker from Dover."));
    }
}
