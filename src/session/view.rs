//! Rendering of the session screens.

use super::{Controller, LoginField, Menu};
use crate::report::TestRunReport;
use crate::state::State;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Wrap},
    Frame,
};

pub fn render(frame: &mut Frame, controller: &Controller) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Screen
            Constraint::Length(1), // Status or error
            Constraint::Length(1), // Key help
        ])
        .split(frame.area());

    render_header(frame, controller, chunks[0]);
    match controller.state() {
        State::RefreshingToken => render_message(frame, chunks[1], "Signing in..."),
        State::Login => render_login(frame, controller, chunks[1]),
        State::MainMenu => render_menu(frame, chunks[1], " Main menu ", controller.main_menu()),
        State::ProjectNameMenu | State::TestProjectNameMenu => {
            render_name_menu(frame, controller, chunks[1])
        }
        State::ProjectVariantMenu | State::TestProjectVariantMenu => {
            render_variant_menu(frame, controller, chunks[1])
        }
        State::TestProject => render_results(frame, controller, chunks[1]),
    }
    render_status(frame, controller, chunks[2]);
    render_footer(frame, controller.state(), chunks[3]);
}

fn render_header(frame: &mut Frame, controller: &Controller, area: Rect) {
    let mut spans = vec![Span::styled(
        controller.state().title(),
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(project) = &controller.session().selected_project {
        spans.push(Span::styled(
            format!("  {}", project.name),
            Style::default().fg(Color::White),
        ));
        if let Some(variant) = &controller.session().selected_variant {
            spans.push(Span::styled(
                format!(" ({})", variant),
                Style::default().fg(Color::DarkGray),
            ));
        }
    }

    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title(" kata "));
    frame.render_widget(header, area);
}

fn render_message(frame: &mut Frame, area: Rect, message: &str) {
    let paragraph = Paragraph::new(message)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

fn render_login(frame: &mut Frame, controller: &Controller, area: Rect) {
    let form = controller.login_form();
    let field_style = |field: LoginField| {
        if form.focus == field {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        }
    };
    let masked = "*".repeat(form.password.chars().count());

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Email:    ", field_style(LoginField::Email)),
            Span::raw(form.email.as_str()),
        ]),
        Line::from(vec![
            Span::styled("Password: ", field_style(LoginField::Password)),
            Span::raw(masked),
        ]),
    ];
    if form.submitting {
        lines.push(Line::from(""));
        lines.push(Line::styled(
            "Logging in...",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let paragraph =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Log in "));
    frame.render_widget(paragraph, area);
}

fn menu_items<T: Clone>(menu: &Menu<T>) -> Vec<ListItem<'_>> {
    menu.labels()
        .enumerate()
        .map(|(i, label)| {
            let selected = i == menu.selected_index();
            ListItem::new(Line::from(vec![
                Span::styled(
                    if selected { "▶ " } else { "  " },
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(
                    label,
                    if selected {
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(Color::White)
                    },
                ),
            ]))
        })
        .collect()
}

fn render_menu<T: Clone>(frame: &mut Frame, area: Rect, title: &str, menu: &Menu<T>) {
    let list = List::new(menu_items(menu))
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    frame.render_widget(list, area);
}

fn render_name_menu(frame: &mut Frame, controller: &Controller, area: Rect) {
    let menu = controller.name_menu();
    if controller.catalog_loading() {
        render_message(frame, area, "Loading projects...");
    } else if menu.is_empty() {
        render_message(frame, area, "No projects available");
    } else {
        render_menu(frame, area, &format!(" Projects ({}) ", menu.len()), menu);
    }
}

fn render_variant_menu(frame: &mut Frame, controller: &Controller, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let menu = controller.variant_menu().menu();
    if menu.is_empty() {
        render_message(frame, chunks[0], "No variants available");
    } else {
        render_menu(frame, chunks[0], " Variants ", menu);
    }

    let detail_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(chunks[1]);

    let details = match controller.variant_menu().selected() {
        Some(choice) => {
            let project = &choice.project;
            vec![
                Line::styled(
                    project.name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Line::from(format!("Difficulty: {}", project.difficulty)),
                Line::from(format!("Estimated time: {}", project.estimated_duration)),
                Line::from(format!("Access: {}", project.access_tier)),
                Line::from(""),
                Line::from(project.description.clone()),
            ]
        }
        None => Vec::new(),
    };
    let paragraph = Paragraph::new(details)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Details "));
    frame.render_widget(paragraph, detail_chunks[0]);

    if controller.clone_in_flight() || controller.session().progress > 0.0 {
        let progress = controller.session().progress.clamp(0.0, 1.0);
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(" Download "))
            .gauge_style(
                Style::default()
                    .fg(Color::Green)
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            )
            .ratio(progress)
            .label(format!("{}%", (progress * 100.0) as u8));
        frame.render_widget(gauge, detail_chunks[1]);
    } else if controller.test_in_flight() {
        let last = controller
            .session()
            .test_output
            .last()
            .cloned()
            .unwrap_or_default();
        let paragraph = Paragraph::new(last)
            .style(Style::default().fg(Color::Gray))
            .block(Block::default().borders(Borders::ALL).title(" Running tests "));
        frame.render_widget(paragraph, detail_chunks[1]);
    }
}

fn results_lines(report: &TestRunReport) -> Vec<Line<'_>> {
    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!("{} passed", report.passed_tests.len()),
            Style::default().fg(Color::Green),
        ),
        Span::raw(", "),
        Span::styled(
            format!("{} failed", report.failed_tests.len()),
            if report.failed_tests.is_empty() {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::Red)
            },
        ),
        Span::styled(
            format!(" in {:.1}s", report.suite.time),
            Style::default().fg(Color::DarkGray),
        ),
    ])];

    for group in &report.groups {
        lines.push(Line::from(""));
        let color = if group.all_passed() {
            Color::Green
        } else {
            Color::Red
        };
        lines.push(Line::from(vec![
            Span::styled(
                group.name.as_str(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}/{}", group.passed, group.total()),
                Style::default().fg(Color::DarkGray),
            ),
        ]));

        for &index in &group.cases {
            let Some(case) = report.results.get(index) else {
                continue;
            };
            let (mark, style) = if case.passed {
                ("  ✓ ", Style::default().fg(Color::Green))
            } else {
                ("  ✗ ", Style::default().fg(Color::Red))
            };
            lines.push(Line::from(vec![
                Span::styled(mark, style),
                Span::raw(case.name.as_str()),
            ]));
            if let Some(message) = case.failure.as_ref().and_then(|f| f.message.as_deref()) {
                lines.push(Line::styled(
                    format!("      {}", message),
                    Style::default().fg(Color::DarkGray),
                ));
            }
        }
    }
    lines
}

fn render_results(frame: &mut Frame, controller: &Controller, area: Rect) {
    let Some(report) = &controller.session().report else {
        render_message(frame, area, "No test results yet");
        return;
    };

    let title = if report.suite.name.is_empty() {
        " Results ".to_string()
    } else {
        format!(" Results: {} ", report.suite.name)
    };
    let paragraph = Paragraph::new(results_lines(report))
        .scroll((controller.session().results_scroll, 0))
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(paragraph, area);
}

fn render_status(frame: &mut Frame, controller: &Controller, area: Rect) {
    let session = controller.session();
    let line = if let Some(error) = &session.error {
        Line::styled(format!(" {}", error), Style::default().fg(Color::Red))
    } else if let Some(status) = &session.status {
        Line::styled(format!(" {}", status), Style::default().fg(Color::Gray))
    } else {
        Line::from("")
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn render_footer(frame: &mut Frame, state: State, area: Rect) {
    let help = match state {
        State::RefreshingToken => " Ctrl+C: quit ",
        State::Login => " Tab: switch field | Enter: log in | Ctrl+C: quit ",
        State::MainMenu => " ↑↓: navigate | Enter: select | Q: quit ",
        State::ProjectNameMenu | State::TestProjectNameMenu => {
            " ↑↓: navigate | Enter: select | Esc: back | Q: quit "
        }
        State::ProjectVariantMenu => {
            " ↑↓: navigate | Enter: download | O: open folder | Esc: back | Q: quit "
        }
        State::TestProjectVariantMenu => " ↑↓: navigate | Enter: run tests | Esc: back | Q: quit ",
        State::TestProject => " ↑↓: scroll | Esc: main menu | Q: quit ",
    };
    let footer = Paragraph::new(help).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, area);
}
