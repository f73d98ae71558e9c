//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use chrono::{DateTime, Utc};
use serde::Serialize;

use eduverse_core::api::{Ack, ModelCatalog};
use eduverse_core::models::{FileRecord, Participant};
use eduverse_core::sync::SyncSummary;
use eduverse_core::{
    AiReply, DraftListing, DraftRecord, DraftSyncReport, Note, NoteContent, NoteEntry, NoteListing,
    Room, SkippedDraft, SyncOutcome,
};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print any serializable value as pretty JSON
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to encode output: {}", e),
        }
    }

    /// Print the merged drafts + published listing
    pub fn print_listing(&self, listing: &NoteListing) {
        match self.format {
            OutputFormat::Human => {
                if listing.entries.is_empty() {
                    println!("No notes found.");
                } else {
                    for entry in &listing.entries {
                        let note = entry.note();
                        let reference = match entry {
                            NoteEntry::Draft(draft) => draft.key.clone(),
                            NoteEntry::Published(note) => note_ref(note),
                        };
                        println!(
                            "{:<30} | {:<7} | {} | {}",
                            reference,
                            note.kind.as_str(),
                            format_time(Some(entry.sort_timestamp())),
                            truncate(&note.title, 40)
                        );
                    }
                    println!(
                        "\n{} note(s): {} draft(s), {} published",
                        listing.entries.len(),
                        listing.draft_count(),
                        listing.published_count()
                    );
                }
                self.warn_skipped(&listing.skipped);
            }
            OutputFormat::Json => self.json(listing),
            OutputFormat::Quiet => {
                for entry in &listing.entries {
                    match entry {
                        NoteEntry::Draft(draft) => println!("{}", draft.key),
                        NoteEntry::Published(note) => println!("{}", note_ref(note)),
                    }
                }
            }
        }
    }

    /// Print local drafts
    pub fn print_drafts(&self, listing: &DraftListing) {
        match self.format {
            OutputFormat::Human => {
                if listing.drafts.is_empty() {
                    println!("No drafts.");
                } else {
                    for draft in &listing.drafts {
                        println!(
                            "{} | {:<7} | {} | {}",
                            draft.key,
                            draft.note.kind.as_str(),
                            draft.saved_at.format("%Y-%m-%d %H:%M"),
                            truncate(&draft.note.title, 40)
                        );
                    }
                    println!("\n{} draft(s)", listing.drafts.len());
                }
                self.warn_skipped(&listing.skipped);
            }
            OutputFormat::Json => self.json(listing),
            OutputFormat::Quiet => {
                for draft in &listing.drafts {
                    println!("{}", draft.key);
                }
            }
        }
    }

    /// Print a saved draft
    pub fn print_draft(&self, draft: &DraftRecord) {
        match self.format {
            OutputFormat::Human => {
                println!("✓ Saved draft {}", draft.key);
                println!("  Title: {}", draft.note.title);
                println!("  Kind:  {}", draft.note.kind);
            }
            OutputFormat::Json => self.json(draft),
            OutputFormat::Quiet => println!("{}", draft.key),
        }
    }

    /// Print a single note with its content
    pub fn print_note(&self, note: &Note) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", note_ref(note));
                println!("Title:    {}", note.title);
                println!("Kind:     {}", note.kind);
                println!("Status:   {}", note.status);
                println!("Public:   {}", if note.is_public { "yes" } else { "no" });
                println!("Created:  {}", format_time(note.created_at));
                println!("Updated:  {}", format_time(note.updated_at));
                println!();
                match note.decode_content() {
                    Ok(NoteContent::Text(text)) | Ok(NoteContent::Mixed(text)) => {
                        println!("{}", text)
                    }
                    Ok(content) => println!("[{}]", content.summary()),
                    Err(e) => println!("[unreadable content: {}]", e),
                }
            }
            OutputFormat::Json => self.json(note),
            OutputFormat::Quiet => println!("{}", note_ref(note)),
        }
    }

    /// Print per-draft sync results
    pub fn print_sync_reports(&self, reports: &[DraftSyncReport]) {
        let summary = SyncSummary::from_reports(reports);
        match self.format {
            OutputFormat::Human => {
                if reports.is_empty() {
                    println!("No drafts to sync.");
                    return;
                }
                for report in reports {
                    let mark = match report.outcome {
                        SyncOutcome::Published { .. } => "✓",
                        SyncOutcome::Retained { .. } => "!",
                        SyncOutcome::Failed { .. } => "✗",
                    };
                    println!("{} {} - {}", mark, truncate(&report.title, 40), report.outcome);
                }
                println!(
                    "\n{} published, {} kept locally, {} failed",
                    summary.published, summary.retained, summary.failed
                );
            }
            OutputFormat::Json => self.json(&serde_json::json!({
                "reports": reports,
                "summary": summary,
            })),
            OutputFormat::Quiet => {
                for report in reports.iter().filter(|r| !r.is_published()) {
                    println!("{}", report.key);
                }
            }
        }
    }

    /// Print an AI reply
    pub fn print_ai_reply(&self, reply: &AiReply) {
        match self.format {
            OutputFormat::Human | OutputFormat::Quiet => println!("{}", reply.text()),
            OutputFormat::Json => self.json(&serde_json::json!({
                "reply": reply,
                "text": reply.text(),
            })),
        }
    }

    /// Print the AI model catalog
    pub fn print_models(&self, catalog: &ModelCatalog) {
        match self.format {
            OutputFormat::Human => {
                for (id, name) in &catalog.models {
                    let default = if catalog.default.as_deref() == Some(id.as_str()) {
                        " (server default)"
                    } else {
                        ""
                    };
                    println!("{:<40} {}{}", id, name, default);
                }
                println!("\n{} model(s)", catalog.models.len());
            }
            OutputFormat::Json => self.json(catalog),
            OutputFormat::Quiet => {
                for id in catalog.models.keys() {
                    println!("{}", id);
                }
            }
        }
    }

    /// Print a list of rooms
    pub fn print_rooms(&self, rooms: &[Room]) {
        match self.format {
            OutputFormat::Human => {
                if rooms.is_empty() {
                    println!("No rooms found.");
                    return;
                }
                for room in rooms {
                    println!(
                        "{:>4} | {:<30} | {:<8} | {}/{}",
                        room.id,
                        truncate(&room.name, 30),
                        room.room_type,
                        room.participant_count,
                        room.max_participants
                    );
                }
                println!("\n{} room(s)", rooms.len());
            }
            OutputFormat::Json => self.json(rooms),
            OutputFormat::Quiet => {
                for room in rooms {
                    println!("{}", room.id);
                }
            }
        }
    }

    /// Print a single room
    pub fn print_room(&self, room: &Room) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:           {}", room.id);
                println!("Name:         {}", room.name);
                if let Some(ref description) = room.description {
                    println!("Description:  {}", description);
                }
                println!("Type:         {}", room.room_type);
                println!(
                    "Participants: {}/{}",
                    room.participant_count, room.max_participants
                );
                println!("Active:       {}", if room.is_active { "yes" } else { "no" });
                println!("Created:      {}", format_time(room.created_at));
            }
            OutputFormat::Json => self.json(room),
            OutputFormat::Quiet => println!("{}", room.id),
        }
    }

    /// Print room participants
    pub fn print_participants(&self, participants: &[Participant]) {
        match self.format {
            OutputFormat::Human => {
                if participants.is_empty() {
                    println!("No participants.");
                    return;
                }
                for participant in participants {
                    let name = participant
                        .username
                        .clone()
                        .unwrap_or_else(|| format!("user {}", participant.user_id));
                    println!(
                        "{:<24} {:<12} joined {}",
                        name,
                        participant.role,
                        format_time(participant.joined_at)
                    );
                }
                println!("\n{} participant(s)", participants.len());
            }
            OutputFormat::Json => self.json(participants),
            OutputFormat::Quiet => {
                for participant in participants {
                    println!("{}", participant.user_id);
                }
            }
        }
    }

    /// Print a server acknowledgement
    pub fn print_ack(&self, ack: &Ack) {
        match self.format {
            OutputFormat::Json => self.json(ack),
            _ => self.success(&ack.message),
        }
    }

    /// Print uploaded files
    pub fn print_files(&self, files: &[FileRecord]) {
        match self.format {
            OutputFormat::Human => {
                if files.is_empty() {
                    println!("No files.");
                    return;
                }
                for file in files {
                    let note = file
                        .note_id
                        .map(|id| format!("note #{}", id))
                        .unwrap_or_default();
                    println!(
                        "{:>4} | {:<32} | {:>10} | {:<6} | {}",
                        file.id,
                        truncate(&file.original_filename, 32),
                        human_size(file.file_size),
                        file.file_type,
                        note
                    );
                }
                println!("\n{} file(s)", files.len());
            }
            OutputFormat::Json => self.json(files),
            OutputFormat::Quiet => {
                for file in files {
                    println!("{}", file.id);
                }
            }
        }
    }

    /// Print a single uploaded file
    pub fn print_file(&self, file: &FileRecord) {
        match self.format {
            OutputFormat::Human => {
                println!("✓ Uploaded {} as file #{}", file.original_filename, file.id);
                println!("  Size: {}", human_size(file.file_size));
                println!("  Type: {}", file.mime_type);
            }
            OutputFormat::Json => self.json(file),
            OutputFormat::Quiet => println!("{}", file.id),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }

    fn warn_skipped(&self, skipped: &[SkippedDraft]) {
        if skipped.is_empty() {
            return;
        }
        eprintln!();
        eprintln!("⚠ {} unreadable draft(s) skipped:", skipped.len());
        for entry in skipped {
            eprintln!("  {}: {}", entry.key, entry.reason);
        }
    }
}

/// Short reference for a published note
fn note_ref(note: &Note) -> String {
    note.id
        .map(|id| format!("#{}", id))
        .unwrap_or_else(|| "-".to_string())
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Size in B / KB / MB
pub fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
