use anyhow::{Result, anyhow};
use tokio::task::JoinHandle;
use tracing::warn;
use uuid::Uuid;
use crate::client::ChatClient;
use crate::config::Config;

/// Greeting seeded as the first assistant message of every session.
pub const GREETING: &str = "Hi! I’m the Invictus Mini Agent. Ask me something.";

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

pub struct App {
    // Core state
    pub should_quit: bool,

    // Conversation state
    pub session_id: String,
    pub messages: Vec<ChatMessage>,

    // Input state
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Turn state
    pub loading: bool,
    pub turn_task: Option<JoinHandle<Result<String>>>,

    // Transcript state
    pub chat_scroll: u16,
    pub chat_height: u16, // inner height of the transcript area, set during render
    pub chat_width: u16,  // inner width of the transcript area, set during render
    pub total_chat_lines: u16,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Backend health (None until the startup probe settles)
    pub backend_online: Option<bool>,
    pub health_task: Option<JoinHandle<bool>>,

    pub client: ChatClient,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let session_id = Uuid::new_v4().to_string();
        let client = ChatClient::new(config.endpoint());

        Self {
            should_quit: false,
            session_id,
            messages: vec![ChatMessage {
                role: ChatRole::Assistant,
                content: GREETING.to_string(),
            }],
            input: String::new(),
            cursor: 0,
            loading: false,
            turn_task: None,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            total_chat_lines: 0,
            animation_frame: 0,
            backend_online: None,
            health_task: None,
            client,
        }
    }

    /// Submit the input buffer as a chat turn.
    ///
    /// A no-op when the trimmed input is empty or a turn is already in
    /// flight; the dropped submission is not an error.
    pub fn submit(&mut self) {
        let text = self.input.trim().to_string();
        if text.is_empty() || self.loading {
            return;
        }

        self.messages.push(ChatMessage {
            role: ChatRole::User,
            content: text.clone(),
        });
        self.input.clear();
        self.cursor = 0;
        self.loading = true;

        let client = self.client.clone();
        let session_id = self.session_id.clone();
        self.turn_task = Some(tokio::spawn(async move {
            client.send(&session_id, &text).await
        }));

        // Scroll to bottom so "Thinking..." is visible
        self.scroll_chat_to_bottom();
    }

    /// Collect the turn result once the background task has finished.
    ///
    /// Every settle path appends one assistant message and clears the
    /// loading flag, so the UI never stays disabled after a turn.
    pub async fn poll_turn(&mut self) {
        let finished = self.turn_task.as_ref().is_some_and(|task| task.is_finished());
        if !finished {
            return;
        }
        let Some(task) = self.turn_task.take() else {
            return;
        };

        match task.await {
            Ok(outcome) => self.finish_turn(outcome),
            Err(err) => {
                warn!(error = %err, "turn task did not complete");
                self.finish_turn(Err(anyhow!("unknown")));
            }
        }
    }

    fn finish_turn(&mut self, outcome: Result<String>) {
        let content = match outcome {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "chat turn failed");
                let reason = err.to_string();
                if reason.is_empty() {
                    "Error: unknown".to_string()
                } else {
                    format!("Error: {}", reason)
                }
            }
        };

        self.messages.push(ChatMessage {
            role: ChatRole::Assistant,
            content,
        });
        self.loading = false;
        self.scroll_chat_to_bottom();
    }

    /// Probe the backend once in the background; the header shows the result.
    pub fn spawn_health_check(&mut self) {
        let client = self.client.clone();
        self.health_task = Some(tokio::spawn(async move { client.health().await }));
    }

    pub async fn poll_health(&mut self) {
        let finished = self.health_task.as_ref().is_some_and(|task| task.is_finished());
        if !finished {
            return;
        }
        let Some(task) = self.health_task.take() else {
            return;
        };

        self.backend_online = Some(task.await.unwrap_or(false));
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Transcript scrolling
    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max_scroll = self.total_chat_lines.saturating_sub(self.chat_height);
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max_scroll);
    }

    /// Scroll the transcript so the newest message (or "Thinking...") is visible.
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in &self.messages {
            total_lines += 1; // role label line
            for line in msg.content.lines() {
                // Character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // blank line after message
        }

        if self.loading {
            total_lines += 2; // "ASSISTANT" label + "Thinking..."
        }

        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }
}
