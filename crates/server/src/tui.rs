use std::collections::VecDeque;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};

use karma::ClientId;

use crate::server::ServerStats;

const MAX_LOG_LINES: usize = 500;

#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub client_id: ClientId,
    pub addr: String,
    pub name: Option<String>,
    pub alive: bool,
    pub connected_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
}

#[derive(Debug, Clone)]
struct LogEntry {
    level: LogLevel,
    message: String,
}

#[derive(Debug, Default)]
pub struct TuiState {
    logs: VecDeque<LogEntry>,
    scroll_offset: usize,
    selected: usize,
    pending_kick: Option<ClientId>,
}

impl TuiState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        if self.logs.len() == MAX_LOG_LINES {
            self.logs.pop_front();
        }
        self.logs.push_back(LogEntry {
            level,
            message: message.into(),
        });
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn log_warn(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = (self.scroll_offset + 5).min(self.logs.len());
    }

    pub fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(5);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }

    pub fn select_next(&mut self, client_count: usize) {
        if client_count > 0 {
            self.selected = (self.selected + 1) % client_count;
        }
    }

    pub fn select_prev(&mut self, client_count: usize) {
        if client_count > 0 {
            self.selected = (self.selected + client_count - 1) % client_count;
        }
    }

    pub fn request_kick(&mut self, clients: &[ClientInfo]) {
        if let Some(client) = clients.get(self.selected.min(clients.len().saturating_sub(1))) {
            self.pending_kick = Some(client.client_id);
        }
    }

    pub fn take_pending_kick(&mut self) -> Option<ClientId> {
        self.pending_kick.take()
    }
}

pub fn render(frame: &mut Frame, state: &TuiState, stats: &ServerStats, clients: &[ClientInfo]) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Percentage(40),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_header(frame, chunks[0], stats);
    render_capacity(frame, chunks[1], stats);
    render_clients(frame, chunks[2], state, clients);
    render_log(frame, chunks[3], state);
    render_help(frame, chunks[4]);
}

fn render_header(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let title = format!(" KARMA Server - Uptime: {} ", format_duration(stats.uptime_secs));

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let text = format!(
        "Tick: {}  |  Players: {}  |  Shots: {}",
        stats.tick, stats.player_count, stats.live_shots
    );

    let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(paragraph, area);
}

fn render_capacity(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let block = Block::default()
        .title(" Clients ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let ratio = stats.client_count as f64 / stats.max_clients.max(1) as f64;
    let gauge = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(ratio.min(1.0))
        .label(format!("{}/{} clients", stats.client_count, stats.max_clients));

    frame.render_widget(gauge, area);
}

fn render_clients(frame: &mut Frame, area: Rect, state: &TuiState, clients: &[ClientInfo]) {
    let block = Block::default()
        .title(" Connections ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    if clients.is_empty() {
        let paragraph = Paragraph::new("No clients connected")
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, area);
        return;
    }

    let selected = state.selected.min(clients.len() - 1);
    let lines: Vec<Line> = clients
        .iter()
        .enumerate()
        .map(|(index, client)| {
            let style = if index == selected {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            let name = client.name.as_deref().unwrap_or("<joining>");
            let status = if client.alive { "alive" } else { "dead" };
            Line::from(Span::styled(
                format!(
                    "#{:<4} {:<16} {:<22} {:<6} {}",
                    client.client_id,
                    name,
                    client.addr,
                    status,
                    format_duration(client.connected_secs)
                ),
                style,
            ))
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_log(frame: &mut Frame, area: Rect, state: &TuiState) {
    let block = Block::default()
        .title(" Log ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    let visible = area.height.saturating_sub(2) as usize;
    let end = state.logs.len().saturating_sub(state.scroll_offset);
    let start = end.saturating_sub(visible);

    let lines: Vec<Line> = state
        .logs
        .range(start..end)
        .map(|entry| {
            let (tag, color) = match entry.level {
                LogLevel::Info => ("INFO", Color::Green),
                LogLevel::Warn => ("WARN", Color::Yellow),
            };
            Line::from(vec![
                Span::styled(tag, Style::default().fg(color)),
                Span::raw(" "),
                Span::raw(entry.message.clone()),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Controls ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let text = Paragraph::new("Up/Down select  |  k kick  |  PgUp/PgDn/End scroll log  |  q quit")
        .block(block)
        .style(
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        );

    frame.render_widget(text, area);
}

fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(client_id: ClientId) -> ClientInfo {
        ClientInfo {
            client_id,
            addr: "127.0.0.1:40001".to_string(),
            name: None,
            alive: false,
            connected_secs: 0,
        }
    }

    #[test]
    fn test_log_is_bounded() {
        let mut state = TuiState::new();
        for n in 0..MAX_LOG_LINES + 10 {
            state.log_info(format!("line {}", n));
        }
        assert_eq!(state.logs.len(), MAX_LOG_LINES);
        assert_eq!(state.logs.front().map(|e| e.message.as_str()), Some("line 10"));
    }

    #[test]
    fn test_selection_wraps_and_kick_targets_selected() {
        let clients = vec![client(1), client(3), client(4)];
        let mut state = TuiState::new();

        state.select_prev(clients.len());
        state.request_kick(&clients);
        assert_eq!(state.take_pending_kick(), Some(4));
        assert_eq!(state.take_pending_kick(), None);

        state.select_next(clients.len());
        state.select_next(clients.len());
        state.request_kick(&clients);
        assert_eq!(state.take_pending_kick(), Some(3));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(3725), "01:02:05");
    }
}
