use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph},
};

use crate::app::{App, AppState, View};
use crate::theme::Theme;
use crate::views;

/// Render the entire UI for the current frame.
pub fn draw(frame: &mut Frame, app: &App, theme: &Theme) {
    let area = frame.area();
    frame.render_widget(
        Block::default().style(Style::default().bg(theme.background)),
        area,
    );

    // Three-row layout: header (1), body (fill), footer (1).
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    draw_header(frame, header_area, app, theme);
    draw_body(frame, body_area, app, theme);
    draw_footer(frame, footer_area, app, theme);
}

/// Render the header bar with the app directory.
fn draw_header(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let header = Line::from(vec![
        Span::styled(
            " labelkit ",
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("| "),
        Span::styled(
            app.app_dir.display().to_string(),
            Style::default().fg(theme.text_muted),
        ),
    ]);
    frame.render_widget(
        Paragraph::new(header).style(Style::default().bg(theme.header)),
        area,
    );
}

/// Render the sidebar plus the selected view.
fn draw_body(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let [sidebar_area, main_area] =
        Layout::horizontal([Constraint::Length(20), Constraint::Min(0)]).areas(area);

    draw_sidebar(frame, sidebar_area, app, theme);
    match app.view {
        View::Home => views::home::draw(frame, main_area, app, theme),
        View::Workbench => views::workbench::draw(frame, main_area, app, theme),
    }
}

fn draw_sidebar(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let entry = |label: &str, selected: bool| -> Line<'static> {
        let style = if selected {
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.text_muted)
        };
        Line::styled(format!(" {label}"), style)
    };

    let lines = vec![
        Line::raw(""),
        entry("Home", app.view == View::Home),
        entry("Labels Workbench", app.view == View::Workbench),
    ];
    frame.render_widget(
        Paragraph::new(lines).style(Style::default().bg(theme.sidebar)),
        area,
    );
}

/// Render the footer bar with context-sensitive keybindings.
fn draw_footer(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let keys = match app.state {
        AppState::Idle => "q:quit  h:home  w:workbench  l:launch tool  s:split dataset",
        AppState::Running => "q:quit  ↑/↓:scroll log",
    };
    let footer = Line::from(Span::styled(
        format!(" {keys}"),
        Style::default().fg(theme.text_muted),
    ));
    frame.render_widget(
        Paragraph::new(footer).style(Style::default().bg(theme.header)),
        area,
    );
}
