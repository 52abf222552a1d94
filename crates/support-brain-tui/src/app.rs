use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use support_brain_core::{
    ChatClient, ChatMessage, ChatRole, ConversationHandle, Rejection, RequestCoordinator, Resolution, Source,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Chat,
    Sources,
    Input,
}

/// Result of the `/health` probe shown in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceHealth {
    Checking,
    Online,
    Offline,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Query input
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Conversation
    pub coordinator: RequestCoordinator<ChatClient>,
    pub query_task: Option<JoinHandle<Resolution>>,
    seen_messages: usize,

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16,      // inner height of the chat area
    pub chat_total_lines: u16, // wrapped line count from the last render
    pub follow_tail: bool,

    // Citations panel
    pub sources_state: ListState,
    pub show_source_detail: bool,

    // Service status
    client: ChatClient,
    pub health: ServiceHealth,
    health_task: Option<JoinHandle<bool>>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub sources_area: Option<Rect>,
}

impl App {
    pub fn new(client: ChatClient) -> Self {
        let coordinator = RequestCoordinator::new(
            std::sync::Arc::new(client.clone()),
            ConversationHandle::default(),
        );
        let seen_messages = coordinator.conversation().len();

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Input,

            input: String::new(),
            cursor: 0,

            coordinator,
            query_task: None,
            seen_messages,

            chat_scroll: 0,
            chat_height: 0,
            chat_total_lines: 0,
            follow_tail: true,

            sources_state: ListState::default(),
            show_source_detail: false,

            client,
            health: ServiceHealth::Checking,
            health_task: None,

            animation_frame: 0,

            chat_area: None,
            sources_area: None,
        }
    }

    pub fn conversation(&self) -> &ConversationHandle {
        self.coordinator.conversation()
    }

    pub fn endpoint(&self) -> &str {
        self.client.base_url()
    }

    pub fn is_loading(&self) -> bool {
        self.conversation().is_pending()
    }

    /// Submit the input box. A refused submission leaves the input as typed.
    pub fn submit_query(&mut self) {
        match self.coordinator.spawn_submit(&self.input) {
            Ok(task) => {
                self.query_task = Some(task);
                self.input.clear();
                self.cursor = 0;
                self.follow_tail = true;
            }
            Err(Rejection::AlreadyPending) => debug!("submission refused, a request is pending"),
            Err(Rejection::EmptyInput) => {}
        }
    }

    pub fn start_health_check(&mut self) {
        let client = self.client.clone();
        self.health = ServiceHealth::Checking;
        self.health_task = Some(tokio::spawn(async move {
            match client.health().await {
                Ok(status) => {
                    info!(service = %status.service, status = %status.status, "answer service reachable");
                    status.is_ok()
                }
                Err(err) => {
                    warn!(error = %err, "answer service health check failed");
                    false
                }
            }
        }));
    }

    /// Called on every Tick event
    pub async fn on_tick(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.poll_tasks().await;
    }

    async fn poll_tasks(&mut self) {
        if self.query_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.query_task.take() {
                match task.await {
                    Ok(resolution) => debug!(?resolution, "query task finished"),
                    Err(err) => warn!(error = %err, "query task did not complete"),
                }
            }
        }

        if self.health_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.health_task.take() {
                self.health = match task.await {
                    Ok(true) => ServiceHealth::Online,
                    _ => ServiceHealth::Offline,
                };
            }
        }
    }

    /// React to messages appended since the last frame
    pub fn sync_with_conversation(&mut self) {
        let len = self.conversation().len();
        if len == self.seen_messages {
            return;
        }
        self.seen_messages = len;
        self.follow_tail = true;

        let latest = self.cited_sources();
        self.sources_state.select(if latest.is_empty() { None } else { Some(0) });
        self.show_source_detail = false;
        if latest.is_empty() && self.focus == FocusPane::Sources {
            self.focus = FocusPane::Chat;
        }
    }

    /// Citations of the latest assistant message
    pub fn cited_sources(&self) -> Vec<Source> {
        self.conversation().read(|conv| latest_citations(conv.messages()))
    }

    pub fn selected_source(&self) -> Option<Source> {
        let i = self.sources_state.selected()?;
        self.cited_sources().into_iter().nth(i)
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.conversation().snapshot()
    }

    // Focus
    pub fn cycle_focus(&mut self) {
        let has_sources = !self.cited_sources().is_empty();
        self.focus = match self.focus {
            FocusPane::Input => FocusPane::Chat,
            FocusPane::Chat if has_sources => FocusPane::Sources,
            FocusPane::Chat | FocusPane::Sources => FocusPane::Input,
        };
        self.input_mode = if self.focus == FocusPane::Input {
            InputMode::Editing
        } else {
            InputMode::Normal
        };
    }

    // Chat scrolling
    fn max_scroll(&self) -> u16 {
        self.chat_total_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_scroll());
        self.follow_tail = self.chat_scroll >= self.max_scroll();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_tail = false;
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }

    pub fn scroll_to_top(&mut self) {
        self.chat_scroll = 0;
        self.follow_tail = false;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow_tail = true;
        self.chat_scroll = self.max_scroll();
    }

    /// Record the rendered chat height and pin the view to the bottom when following
    pub fn update_chat_metrics(&mut self, total_lines: u16, visible_height: u16) {
        self.chat_total_lines = total_lines;
        self.chat_height = visible_height;
        if self.follow_tail {
            self.chat_scroll = self.max_scroll();
        } else {
            self.chat_scroll = self.chat_scroll.min(self.max_scroll());
        }
    }

    // Citations navigation
    pub fn sources_nav_down(&mut self) {
        let len = self.cited_sources().len();
        if len > 0 {
            let i = self.sources_state.selected().unwrap_or(0);
            self.sources_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn sources_nav_up(&mut self) {
        let i = self.sources_state.selected().unwrap_or(0);
        self.sources_state.select(Some(i.saturating_sub(1)));
    }

    pub fn toggle_source_detail(&mut self) {
        self.show_source_detail = !self.show_source_detail && self.selected_source().is_some();
    }

    /// Tick animation frame
    pub fn thinking_dots(&self) -> String {
        ".".repeat(self.animation_frame as usize + 1)
    }
}

/// Sources of the latest assistant message only. An uncited answer or a
/// fallback empties the panel instead of leaving older citations up.
fn latest_citations(messages: &[ChatMessage]) -> Vec<Source> {
    messages
        .iter()
        .rev()
        .find(|msg| msg.role() == ChatRole::Assistant)
        .map(|msg| msg.sources().to_vec())
        .unwrap_or_default()
}
