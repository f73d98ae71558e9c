//! Room command handlers

use anyhow::{bail, Context as _, Result};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use eduverse_core::models::NewRoom;
use eduverse_core::rooms::{RoomStatus, RoomTaskEvent};
use eduverse_core::{connect_room, ChatMessage, RoomEvent};

use super::Context;
use crate::output::{Output, OutputFormat};

const QUIT: &str = "/quit";

pub async fn list(ctx: &Context, output: &Output) -> Result<()> {
    let session = ctx.session().await?;
    let rooms = session.client().list_rooms().await?;
    output.print_rooms(&rooms);
    Ok(())
}

pub async fn create(
    ctx: &Context,
    name: String,
    description: Option<String>,
    max_participants: Option<u32>,
    output: &Output,
) -> Result<()> {
    let session = ctx.session().await?;
    let mut room = NewRoom::new(name);
    room.description = description;
    if let Some(max) = max_participants {
        if max == 0 {
            bail!("A room needs room for at least one participant");
        }
        room.max_participants = max;
    }

    let created = session
        .client()
        .create_room(&room)
        .await
        .context("Failed to create room")?;
    output.print_room(&created);
    Ok(())
}

pub async fn show(ctx: &Context, id: i64, output: &Output) -> Result<()> {
    let session = ctx.session().await?;
    let room = session.client().get_room(id).await?;
    output.print_room(&room);
    Ok(())
}

pub async fn participants(ctx: &Context, id: i64, output: &Output) -> Result<()> {
    let session = ctx.session().await?;
    let participants = session.client().room_participants(id).await?;
    output.print_participants(&participants);
    Ok(())
}

pub async fn join(ctx: &Context, id: i64, output: &Output) -> Result<()> {
    let session = ctx.session().await?;
    let ack = session.client().join_room(id).await?;
    output.print_ack(&ack);
    Ok(())
}

pub async fn leave(ctx: &Context, id: i64, output: &Output) -> Result<()> {
    let session = ctx.session().await?;
    let ack = session.client().leave_room(id).await?;
    output.print_ack(&ack);
    Ok(())
}

/// Chat in a room: stdin lines are sent, room events are printed
///
/// Ends on `/quit`, end of input, or when the server closes the socket.
pub async fn chat(ctx: &Context, id: i64, output: &Output) -> Result<()> {
    let session = ctx.session().await?;
    let client = session.client();
    let token = client
        .token()
        .context("Stored session has no token")?
        .to_string();

    let mut handle = connect_room(client.config(), id, &token)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut failed = None;

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                match line.context("Failed to read from stdin")? {
                    Some(line) => {
                        let text = line.trim();
                        if text.is_empty() {
                            continue;
                        }
                        if text == QUIT {
                            stdin_open = false;
                            handle.close().await;
                        } else if handle.send(ChatMessage::text(text)).await.is_err() {
                            stdin_open = false;
                        }
                    }
                    None => {
                        debug!("stdin closed, leaving room {}", id);
                        stdin_open = false;
                        handle.close().await;
                    }
                }
            }
            event = handle.next_event() => {
                match event {
                    Some(RoomTaskEvent::Event(event)) => print_event(&event, output),
                    Some(RoomTaskEvent::StatusChanged(RoomStatus::Connected)) => {
                        if output.should_prompt() {
                            eprintln!("Connected to room {}. Type a message, {} to leave.", id, QUIT);
                        }
                    }
                    Some(RoomTaskEvent::StatusChanged(_)) => {}
                    Some(RoomTaskEvent::Error(e)) => failed = Some(e),
                    None => break,
                }
            }
        }
    }

    match failed {
        Some(e) => bail!("Room {} connection failed: {}", id, e),
        None => {
            if output.should_prompt() {
                eprintln!("Left room {}.", id);
            }
            Ok(())
        }
    }
}

fn print_event(event: &RoomEvent, output: &Output) {
    match output.format {
        OutputFormat::Json => match event.encode() {
            Ok(frame) => println!("{}", frame),
            Err(e) => eprintln!("Failed to encode room event: {}", e),
        },
        OutputFormat::Quiet => {
            if let RoomEvent::Message(message) = event {
                println!("{}", message.content);
            }
        }
        OutputFormat::Human => println!("{}", describe(event)),
    }
}

/// One line of chat transcript
fn describe(event: &RoomEvent) -> String {
    match event {
        RoomEvent::Message(message) => {
            let time = message
                .timestamp
                .map(|t| t.format("%H:%M").to_string())
                .unwrap_or_else(|| "--:--".to_string());
            let who = message.user.as_deref().unwrap_or("someone");
            format!("[{}] {}: {}", time, who, message.content)
        }
        RoomEvent::ParticipantJoined(who) => format!("* {} joined", participant_name(who)),
        RoomEvent::ParticipantLeft(who) => format!("* {} left", participant_name(who)),
        RoomEvent::System { message, .. } => format!("* {}", message),
        RoomEvent::Unknown { event, data } => format!("? {} {}", event, data),
    }
}

fn participant_name(payload: &Value) -> String {
    payload
        .get("username")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            payload
                .get("user_id")
                .and_then(Value::as_i64)
                .map(|id| format!("user {}", id))
        })
        .unwrap_or_else(|| "someone".to_string())
}
