use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use support_brain_core::{ChatMessage, Source};
use unicode_width::UnicodeWidthChar;
use crate::app::{App, FocusPane, InputMode, ServiceHealth};
use crate::markdown::render_markdown;

const PLACEHOLDER: &str = "Ex: How to fix an overheating error?";
const DISCLAIMER: &str = "GENERATIVE AI CAN MAKE MISTAKES. ALWAYS CROSS CHECK WITH THE MANUALS.";

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer (hints + disclaimer)
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(2),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat_screen(app, frame, body_area);
    render_footer(app, frame, footer_area);

    if app.show_source_detail {
        if let Some(source) = app.selected_source() {
            render_source_detail(&source, frame, area);
        }
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let (status_text, status_color) = match app.health {
        ServiceHealth::Checking => ("○ connecting", Color::Gray),
        ServiceHealth::Online => ("● RAG Active", Color::Green),
        ServiceHealth::Offline => ("● Offline", Color::Red),
    };

    let title = Line::from(vec![
        Span::styled(" Support Brain AI ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw(" "),
        Span::styled(app.endpoint().to_string(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let [hints_area, disclaimer_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).areas(area);

    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " CHAT ",
        InputMode::Editing => " ASK ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = match (app.input_mode, app.focus) {
        (InputMode::Editing, _) => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        (InputMode::Normal, FocusPane::Sources) => vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" nav ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" excerpt ", label_style),
        ],
        (InputMode::Normal, _) => vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" g/G ", key_style),
            Span::styled(" top/bottom ", label_style),
            Span::styled(" i ", key_style),
            Span::styled(" ask ", label_style),
            Span::styled(" r ", key_style),
            Span::styled(" recheck ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };
    hints.extend(vec![
        Span::styled(" Tab ", key_style),
        Span::styled(" focus ", label_style),
    ]);

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );
    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, hints_area);

    let disclaimer = Paragraph::new(Line::from(Span::styled(
        DISCLAIMER,
        Style::default().fg(Color::DarkGray),
    )))
    .centered();
    frame.render_widget(disclaimer, disclaimer_area);
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let sources = app.cited_sources();
    let sources_height = if sources.is_empty() {
        0
    } else {
        (sources.len().min(5) + 2) as u16 // +2 for borders
    };

    let [chat_area, sources_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(sources_height),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store areas for mouse hit-testing
    app.chat_area = Some(chat_area);
    app.sources_area = if sources_height > 0 { Some(sources_area) } else { None };

    render_chat(app, frame, chat_area);
    if sources_height > 0 {
        render_sources(app, &sources, frame, sources_area);
    }
    render_input(app, frame, input_area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Chat;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Conversation ");

    let mut lines: Vec<Line> = Vec::new();
    for msg in &app.messages() {
        lines.extend(message_lines(msg));
    }

    if app.is_loading() {
        lines.push(role_line("AI:", Color::Yellow));
        // Animated ellipsis: cycles through ".", "..", "..."
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", app.thinking_dots()),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    let chat = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    app.update_chat_metrics(rendered_height(&chat, inner_width), inner_height);

    let chat = chat.block(block).scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

fn role_line(label: &'static str, color: Color) -> Line<'static> {
    Line::from(Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

/// Lines for one message: role label, body, citation chips, spacer
fn message_lines(msg: &ChatMessage) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    match msg {
        ChatMessage::User { content } => {
            lines.push(role_line("You:", Color::Cyan));
            // User text is plain, shown as typed
            lines.extend(content.lines().map(|l| Line::from(l.to_string())));
        }
        ChatMessage::Assistant { content, .. } => {
            lines.push(role_line("AI:", Color::Yellow));
            lines.extend(render_markdown(content));
            if msg.has_sources() {
                lines.push(Line::default());
                lines.push(Line::from(Span::styled(
                    "SOURCES USED",
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
                )));
                lines.push(source_chips(msg.sources()));
            }
        }
    }
    lines.push(Line::default());
    lines
}

fn source_chips(sources: &[Source]) -> Line<'static> {
    let chip_style = Style::default().fg(Color::LightBlue).bg(Color::Black);
    let mut spans = Vec::new();
    for (i, source) in sources.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(format!("[{}]", source.label()), chip_style));
    }
    Line::from(spans)
}

/// Rows the paragraph occupies once wrapped to `width`, borders excluded
fn rendered_height(paragraph: &Paragraph, width: u16) -> u16 {
    paragraph.line_count(width).min(u16::MAX as usize) as u16
}

fn render_sources(app: &mut App, sources: &[Source], frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Sources;
    let border_color = if focused { Color::Cyan } else { Color::Magenta };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Sources Used (Tab to focus, Enter to inspect) ");

    let items: Vec<ListItem> = sources
        .iter()
        .enumerate()
        .map(|(i, source)| ListItem::new(format!(" {}. {} ", i + 1, source.label())))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Magenta)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.sources_state);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let loading = app.is_loading();
    let border_color = if loading {
        Color::DarkGray
    } else if editing || app.focus == FocusPane::Input {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let title = if loading {
        " Waiting for the answer... "
    } else {
        " Ask (Enter to send) "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) = input_viewport(&app.input, app.cursor, inner_width);

    let input = if app.input.is_empty() {
        Paragraph::new(PLACEHOLDER).style(Style::default().fg(Color::DarkGray))
    } else {
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    };
    frame.render_widget(input.block(block), area);

    // Show cursor when editing
    if editing {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

/// Horizontal window over the input that keeps the cursor visible.
///
/// Returns the visible text and the cursor column inside it, both measured in
/// terminal cells so wide (CJK) characters take two columns.
fn input_viewport(input: &str, cursor: usize, width: usize) -> (String, u16) {
    let chars: Vec<char> = input.chars().collect();
    let cursor = cursor.min(chars.len());
    let cell_width = |c: &char| c.width().unwrap_or(0);

    // Drop leading chars until the cursor cell fits inside the box
    let mut start = 0;
    let mut before: usize = chars[..cursor].iter().map(cell_width).sum();
    while start < cursor && before >= width {
        before -= cell_width(&chars[start]);
        start += 1;
    }

    let mut used = 0;
    let visible = chars[start..]
        .iter()
        .take_while(|c| {
            used += cell_width(*c);
            used <= width
        })
        .collect();
    (visible, before.min(u16::MAX as usize) as u16)
}

fn render_source_detail(source: &Source, frame: &mut Frame, area: Rect) {
    let popup = centered_rect(70, 50, area);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(format!(" {} ", source.label()))
        .title_bottom(" Esc to close ");

    let excerpt = Paragraph::new(source.content.as_str())
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(excerpt, popup);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let [_, middle, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(area);
    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(middle);
    center
}
