use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Padding, Paragraph},
};

use crate::app::App;
use crate::theme::Theme;

/// Render the welcome screen.
pub fn draw(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let lines = vec![
        Line::raw(""),
        Line::styled(
            "Welcome to the labelkit dashboard",
            Style::default()
                .fg(theme.text)
                .add_modifier(Modifier::BOLD),
        ),
        Line::raw(""),
        Line::styled(
            format!(
                "Launches {} and reorganizes labeled datasets.",
                app.config.tool.executable
            ),
            Style::default().fg(theme.text_muted),
        ),
        Line::styled(
            "Press 'w' to open the labels workbench.",
            Style::default().fg(theme.text_muted),
        ),
    ];

    let body = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Home ")
            .border_style(Style::default().fg(theme.accent))
            .padding(Padding::new(2, 2, 1, 1)),
    );
    frame.render_widget(body, area);
}
