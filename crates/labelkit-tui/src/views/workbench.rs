use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
};

use crate::app::{App, AppState, LogKind};
use crate::theme::Theme;

/// Render the labels workbench: dataset paths, the two actions, live
/// status with progress, and the activity log.
pub fn draw(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let [paths_area, actions_area, status_area, log_area] = Layout::vertical([
        Constraint::Length(4),
        Constraint::Length(4),
        Constraint::Length(4),
        Constraint::Min(0),
    ])
    .areas(area);

    draw_paths(frame, paths_area, app, theme);
    draw_actions(frame, actions_area, app, theme);
    draw_status(frame, status_area, app, theme);
    draw_log(frame, log_area, app, theme);
}

fn path_line<'a>(label: &'a str, value: Option<String>, theme: &Theme) -> Line<'a> {
    let (text, style) = match value {
        Some(path) => (path, Style::default().fg(theme.text)),
        None => ("not set".to_string(), Style::default().fg(theme.text_muted)),
    };
    Line::from(vec![
        Span::styled(format!("{label:<10}"), Style::default().fg(theme.text_muted)),
        Span::styled(text, style),
    ])
}

fn draw_paths(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let lines = vec![
        path_line(
            "source",
            app.split_source.as_ref().map(|p| p.display().to_string()),
            theme,
        ),
        path_line(
            "output",
            app.split_output.as_ref().map(|p| p.display().to_string()),
            theme,
        ),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Dataset ")
        .border_style(Style::default().fg(theme.accent));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_actions(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let launch_style = if app.can_launch() {
        Style::default()
            .fg(theme.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.accent_disabled)
    };
    let split_style = if app.state == AppState::Idle {
        Style::default()
            .fg(theme.action)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text_muted)
    };

    let lines = vec![
        Line::styled(
            format!("[l] Launch {}", app.config.tool.executable),
            launch_style,
        ),
        Line::styled("[s] Convert val/train", split_style),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Actions ")
        .border_style(Style::default().fg(theme.accent));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_status(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let border = match app.last_success {
        Some(true) => theme.success,
        Some(false) => theme.error,
        None => theme.accent,
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Status ")
        .border_style(Style::default().fg(border));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [text_area, gauge_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).areas(inner);

    frame.render_widget(
        Paragraph::new(Line::styled(
            app.status_text.clone(),
            Style::default().fg(theme.text),
        )),
        text_area,
    );

    if let Some((completed, total)) = app.progress {
        let ratio = if total == 0 {
            0.0
        } else {
            (completed as f64 / total as f64).clamp(0.0, 1.0)
        };
        let gauge = Gauge::default()
            .ratio(ratio)
            .label(format!("{completed}/{total}"))
            .gauge_style(Style::default().fg(theme.success));
        frame.render_widget(gauge, gauge_area);
    }
}

fn draw_log(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Activity ")
        .border_style(Style::default().fg(theme.accent));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let visible = inner.height as usize;
    let end = app.log.len().saturating_sub(app.log_scroll);
    let start = end.saturating_sub(visible);
    let lines: Vec<Line> = app.log[start..end]
        .iter()
        .map(|entry| {
            let style = match entry.kind {
                LogKind::Info => Style::default().fg(theme.text),
                LogKind::Warning => Style::default().fg(theme.warning),
                LogKind::Error => Style::default().fg(theme.error),
            };
            Line::styled(entry.text.clone(), style)
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}
