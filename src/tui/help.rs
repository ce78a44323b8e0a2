use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

fn keybind(keys: &'static str, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("{keys:<10}"), Style::default().fg(Color::Magenta)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Anywhere:"),
        keybind("Esc", "Quit (Ctrl-C works too)"),
        keybind("Tab", "Switch between wizard and help"),
        keybind("F1", "Show this help"),
        Line::from(""),
        Line::from("1. Upload:"),
        keybind("type", "Path to a .docx template"),
        keybind("Enter", "Upload and start"),
        keybind("Ctrl-U", "Clear the field"),
        Line::from(""),
        Line::from("2. Fill:"),
        keybind("type", "Answer the current question"),
        keybind("Enter", "Next question, or generate after the last one"),
        keybind("↑", "Go back to the previous question"),
        keybind("Ctrl-U", "Clear the answer"),
        Line::from(""),
        Line::from("3. Download:"),
        keybind("y, Ctrl-Y", "Copy the download link to the clipboard"),
        keybind("n", "Start over with another template"),
        keybind("q", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("Templates: ", Style::default().fg(Color::Gray)),
            Span::raw("placeholders are written as "),
            Span::styled("{{ NAME }}", Style::default().fg(Color::Cyan)),
            Span::raw(" inside the document."),
        ]),
    ])
    .wrap(Wrap { trim: false })
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
