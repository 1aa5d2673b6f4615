use std::collections::VecDeque;

use ratatui::layout::{Alignment, Constraint, Direction, Layout, Margin};
use ratatui::prelude::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use seed_proto::SeedRecord;

use crate::detail::{DetailRender, LoadedDetail, SectionState, SeedDetailView};
use crate::mod_info;
use crate::sections::{
    geyser_rows, rasterize_world_map, star_tiers, world_details, MapCell, SectionKind,
};
use crate::store::{FetchFailure, StoreSnapshot};
use crate::summary::SeedSummary;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const MAX_MAP_ROWS: usize = 16;

const BIOME_COLORS: [Color; 8] = [
    Color::Yellow,
    Color::Green,
    Color::Cyan,
    Color::Magenta,
    Color::Blue,
    Color::LightRed,
    Color::LightGreen,
    Color::LightBlue,
];

pub struct UiState {
    pub logs: VecDeque<String>,
    pub max_logs: usize,
    pub spinner_tick: usize,
    pub show_mod_info: bool,
    pub status: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            logs: VecDeque::new(),
            max_logs: 5,
            spinner_tick: 0,
            show_mod_info: false,
            status: None,
        }
    }
}

impl UiState {
    pub fn push_log<S: Into<String>>(&mut self, line: S) {
        let mut text: String = line.into();
        while text.ends_with('\n') || text.ends_with('\r') {
            text.pop();
        }
        if text.is_empty() {
            return;
        }
        self.logs.push_front(text);
        while self.logs.len() > self.max_logs {
            self.logs.pop_back();
        }
    }

    pub fn advance_spinner(&mut self) {
        self.spinner_tick = (self.spinner_tick + 1) % SPINNER_FRAMES.len();
    }

    pub fn set_status<S: Into<String>>(&mut self, status: S) {
        self.status = Some(status.into());
    }
}

pub fn draw_ui(frame: &mut Frame, state: &UiState, view: &SeedDetailView, snapshot: &StoreSnapshot) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(state.max_logs as u16 + 2),
            Constraint::Length(3),
        ])
        .split(frame.size());

    draw_header(frame, chunks[0], state, view);
    if state.show_mod_info {
        draw_mod_info(frame, chunks[1]);
    } else {
        match view.render(snapshot) {
            DetailRender::Spinner => draw_spinner(frame, chunks[1], state, view),
            DetailRender::Failed(failure) => draw_failure(frame, chunks[1], failure),
            DetailRender::Loaded(detail) => draw_detail(frame, chunks[1], &detail, snapshot),
        }
    }
    draw_logs(frame, chunks[2], state);
    draw_keys(frame, chunks[3], state);
}

fn inner(area: Rect) -> Rect {
    area.inner(&Margin {
        vertical: 1,
        horizontal: 1,
    })
}

fn key_style() -> Style {
    Style::default().fg(Color::Yellow)
}

fn draw_header(frame: &mut Frame, area: Rect, state: &UiState, view: &SeedDetailView) {
    let block = Block::default().borders(Borders::ALL).title("Seed Browser");
    let mut spans = vec![
        Span::raw("route "),
        Span::styled(view.params().path(), Style::default().fg(Color::Cyan)),
    ];
    if let Some(status) = &state.status {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(status.clone(), Style::default().fg(Color::Green)));
    }
    let text = Paragraph::new(Line::from(spans)).wrap(Wrap { trim: true });
    frame.render_widget(block, area);
    frame.render_widget(text, inner(area));
}

fn draw_spinner(frame: &mut Frame, area: Rect, state: &UiState, view: &SeedDetailView) {
    let glyph = SPINNER_FRAMES[state.spinner_tick % SPINNER_FRAMES.len()];
    let line = Line::from(vec![
        Span::styled(glyph, Style::default().fg(Color::Cyan)),
        Span::raw(format!(" Loading seed {}", view.request())),
    ]);
    let block = Block::default().borders(Borders::ALL);
    let body = inner(area);
    let paragraph = Paragraph::new(line).alignment(Alignment::Center);
    frame.render_widget(block, area);
    frame.render_widget(
        paragraph,
        Rect {
            y: body.y + body.height / 2,
            height: 1.min(body.height),
            ..body
        },
    );
}

fn draw_failure(frame: &mut Frame, area: Rect, failure: &FetchFailure) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Error")
        .border_style(Style::default().fg(Color::Red));
    let lines = vec![
        Line::from(Span::styled(
            "Could not load the seed",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::raw(failure.to_string())),
        Line::from(""),
        Line::from(vec![
            Span::raw("Press "),
            Span::styled("R", key_style()),
            Span::raw(" to retry"),
        ]),
    ];
    frame.render_widget(block, area);
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }),
        inner(area),
    );
}

fn draw_detail(frame: &mut Frame, area: Rect, detail: &LoadedDetail<'_>, snapshot: &StoreSnapshot) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(3)])
        .split(area);

    let summary_block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Seed {}", detail.seed.key()));
    frame.render_widget(summary_block, chunks[0]);
    frame.render_widget(
        Paragraph::new(summary_lines(&detail.summary)).wrap(Wrap { trim: false }),
        inner(chunks[0]),
    );

    let sections_block = Block::default().borders(Borders::ALL).title("Sections");
    let body = inner(chunks[1]);
    let (lines, selected_line) = section_lines(detail, snapshot, body.width as usize);
    let scroll = selected_line.saturating_sub(body.height.saturating_sub(1) as usize);
    frame.render_widget(sections_block, chunks[1]);
    frame.render_widget(
        Paragraph::new(lines).scroll((scroll.min(u16::MAX as usize) as u16, 0)),
        body,
    );
}

fn summary_lines(summary: &SeedSummary) -> Vec<Line<'static>> {
    let upgrades = if summary.upgrades.is_empty() {
        "none".to_string()
    } else {
        summary.upgrades.join(", ")
    };
    vec![
        Line::from(vec![
            Span::styled("World ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!(
                "{}x{} | game version {}",
                summary.world_width, summary.world_height, summary.game_version
            )),
        ]),
        Line::from(format!(
            "Geysers: {} ({} types) | Biomes: {} | Destinations: {}",
            summary.geyser_count,
            summary.distinct_geyser_types(),
            summary.biome_count,
            summary.destination_count
        )),
        Line::from(format!("Upgrades: {upgrades}")),
        Line::from(vec![
            Span::raw("Wrong data? Press "),
            Span::styled("r", key_style()),
            Span::raw(" to report this seed as invalid."),
        ]),
    ]
}

/// All section lines plus the index of the selected section's header line.
fn section_lines(
    detail: &LoadedDetail<'_>,
    snapshot: &StoreSnapshot,
    width: usize,
) -> (Vec<Line<'static>>, usize) {
    let mut lines = Vec::new();
    let mut selected_line = 0;
    for section in &detail.sections {
        if section.selected {
            selected_line = lines.len();
        }
        lines.push(section_header(section));
        if section.expanded {
            lines.extend(section_body(section.kind, detail.seed, snapshot, width));
        }
    }
    (lines, selected_line)
}

fn section_header(section: &SectionState) -> Line<'static> {
    let marker = if section.expanded { "▾ " } else { "▸ " };
    let mut style = Style::default().add_modifier(Modifier::BOLD);
    if section.selected {
        style = style.fg(Color::Black).bg(Color::Cyan);
    }
    Line::from(Span::styled(format!("{marker}{}", section.kind.title()), style))
}

fn section_body(
    kind: SectionKind,
    seed: &SeedRecord,
    snapshot: &StoreSnapshot,
    width: usize,
) -> Vec<Line<'static>> {
    match kind {
        SectionKind::Geysers => {
            let rows = geyser_rows(&seed.geysers, snapshot.geyser_types());
            if rows.is_empty() {
                return vec![Line::from("    no geysers recorded")];
            }
            rows.into_iter()
                .map(|row| {
                    let temperature = row
                        .temperature
                        .map(|t| format!(" | {t:.0} °C"))
                        .unwrap_or_default();
                    Line::from(vec![
                        Span::styled(format!("    {:<28}", row.name), Style::default().fg(Color::Cyan)),
                        Span::raw(format!(
                            " ({:>3}, {:>3}) | {:>8.1} g/s{temperature}",
                            row.x, row.y, row.emit_rate
                        )),
                    ])
                })
                .collect()
        }
        SectionKind::WorldDetails => {
            let details = world_details(seed, snapshot.elements());
            let mut lines = vec![Line::from("    Biomes")];
            lines.extend(details.biomes.iter().map(|row| {
                Line::from(format!(
                    "      {:<24} {:>8.0} cells {:>5.1}%",
                    row.biome,
                    row.size,
                    row.share * 100.0
                ))
            }));
            if !details.elements.is_empty() {
                lines.push(Line::from("    Elements"));
                lines.extend(details.elements.iter().map(|row| {
                    let state = row.state.map(|state| state.label()).unwrap_or("?");
                    Line::from(format!("      {:<24} {:<6} {:>14.0} kg", row.name, state, row.mass))
                }));
            }
            for (biome, rows) in &details.starting_elements {
                lines.push(Line::from(format!("    Starting {biome}")));
                lines.extend(
                    rows.iter()
                        .map(|row| Line::from(format!("      {:<24} {:>14.0} kg", row.name, row.mass))),
                );
            }
            lines
        }
        SectionKind::WorldMap => {
            let cols = width.saturating_sub(4).max(1);
            let aspect = seed.world_size.height.max(1) as f32 / seed.world_size.width.max(1) as f32;
            // Terminal cells are about twice as tall as they are wide.
            let rows = ((cols as f32 * aspect / 2.0).round() as usize).clamp(1, MAX_MAP_ROWS);
            let raster = rasterize_world_map(seed, cols, rows);
            let mut lines: Vec<Line<'static>> = (0..raster.rows)
                .map(|row| {
                    let mut spans = vec![Span::raw("    ")];
                    spans.extend((0..raster.cols).map(|col| match raster.cell(col, row) {
                        MapCell::Empty => Span::raw(" "),
                        MapCell::Geyser => {
                            Span::styled("*", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
                        }
                        MapCell::Biome(index) => Span::styled(
                            raster.legend[index].0.to_string(),
                            Style::default().fg(BIOME_COLORS[index % BIOME_COLORS.len()]),
                        ),
                    }));
                    Line::from(spans)
                })
                .collect();
            let legend = raster
                .legend
                .iter()
                .map(|(glyph, name)| format!("{glyph} {name}"))
                .chain(std::iter::once("* geyser".to_string()))
                .collect::<Vec<_>>()
                .join("  ");
            lines.push(Line::from(format!("    {legend}")));
            lines
        }
        SectionKind::Starmap => star_tiers(&seed.space_destinations, snapshot.space_destination_types())
            .into_iter()
            .map(|tier| {
                Line::from(vec![
                    Span::styled(
                        format!("    {:>6} km ", u64::from(tier.distance) * 10_000),
                        Style::default().fg(Color::Magenta),
                    ),
                    Span::raw(tier.destinations.join(", ")),
                ])
            })
            .collect(),
    }
}

fn draw_mod_info(frame: &mut Frame, area: Rect) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(Span::styled(mod_info::HEADLINE, bold)).alignment(Alignment::Center),
        Line::from(""),
        Line::from(mod_info::INTRO),
    ];
    for step in &mod_info::STEPS {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(step.title, bold)));
        lines.extend(step.paragraphs.iter().map(|paragraph| Line::from(*paragraph)));
        lines.extend(step.links.iter().map(|link| {
            Line::from(vec![
                Span::raw(format!("{}: ", link.label)),
                Span::styled(link.url, Style::default().fg(Color::Cyan)),
            ])
        }));
    }
    lines.push(Line::from(""));
    lines.push(
        Line::from(vec![
            Span::raw(format!("{} ", mod_info::SCREENSHOT.label)),
            Span::styled(mod_info::SCREENSHOT.url, Style::default().fg(Color::Cyan)),
        ])
        .alignment(Alignment::Center),
    );
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        mod_info::footer(),
        Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default().borders(Borders::ALL).title("Mod import");
    frame.render_widget(block, area);
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner(area));
}

fn draw_logs(frame: &mut Frame, area: Rect, state: &UiState) {
    let block = Block::default().borders(Borders::ALL).title("Logs");
    let lines: Vec<Line> = state
        .logs
        .iter()
        .map(|entry| Line::from(Span::raw(entry)))
        .collect();
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(block, area);
    frame.render_widget(paragraph, inner(area));
}

fn draw_keys(frame: &mut Frame, area: Rect, state: &UiState) {
    let mut spans = Vec::new();
    let keys: &[(&str, &str)] = if state.show_mod_info {
        &[("?", "back"), ("q", "quit")]
    } else {
        &[
            ("↑/↓", "select"),
            ("enter", "expand"),
            ("r", "report"),
            ("R", "retry"),
            ("?", "mod info"),
            ("q", "quit"),
        ]
    };
    for (key, label) in keys {
        spans.push(Span::styled(*key, key_style()));
        spans.push(Span::raw(format!(" {label}  ")));
    }
    let block = Block::default().borders(Borders::ALL).title("Keys");
    frame.render_widget(block, area);
    frame.render_widget(Paragraph::new(Line::from(spans)), inner(area));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::RouteParams;
    use crate::store::{FailedFetch, SeedReader};
    use crate::store::SeedDispatch;
    use crate::BrowserStore;
    use crate::LocalSeedClient;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use seed_store::{SeedLibrary, SeedStore};

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn draw(state: &UiState, view: &SeedDetailView, snapshot: &StoreSnapshot) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 48)).expect("terminal");
        terminal
            .draw(|frame| draw_ui(frame, state, view, snapshot))
            .expect("draw");
        screen_text(&terminal)
    }

    #[test]
    fn loading_view_draws_spinner() {
        let view = SeedDetailView::new(RouteParams::new("123", "4"));
        let text = draw(&UiState::default(), &view, &StoreSnapshot::default());
        assert!(text.contains("Loading seed 123@4"));
        assert!(!text.contains("Geyser details"));
    }

    #[test]
    fn loaded_view_draws_sections_and_expanded_map() {
        let seeds = SeedStore::from_library(SeedLibrary::builtin(), 3);
        let mut store = BrowserStore::new(LocalSeedClient::new(seeds));
        let mut view = SeedDetailView::new(RouteParams::new("123", "4"));
        store.request_reference_data();
        view.on_mount(&mut store);
        store.poll();
        view.on_update(&store);
        view.toggle_section(SectionKind::WorldMap);
        view.toggle_section(SectionKind::Geysers);

        let text = draw(&UiState::default(), &view, store.snapshot());
        assert!(text.contains("Seed 123@4"));
        assert!(text.contains("▾ Geyser details"));
        assert!(text.contains("▸ World details"));
        assert!(text.contains("▾ World Map"));
        assert!(text.contains("Water Geyser"));
        assert!(text.contains("* geyser"));
    }

    #[test]
    fn failure_view_offers_retry() {
        let mut snapshot = StoreSnapshot::default();
        snapshot.reference_failure = Some(FetchFailure {
            what: FailedFetch::ReferenceData,
            message: "connection refused".to_string(),
        });
        struct Fixed(StoreSnapshot);
        impl SeedReader for Fixed {
            fn snapshot(&self) -> &StoreSnapshot {
                &self.0
            }

            fn is_fetching(&self) -> bool {
                false
            }
        }
        let reader = Fixed(snapshot);
        let mut view = SeedDetailView::new(RouteParams::new("123", "4"));
        view.on_update(&reader);

        let text = draw(&UiState::default(), &view, reader.snapshot());
        assert!(text.contains("reference data: connection refused"), "{text}");
        assert!(text.contains("to retry"));
    }

    #[test]
    fn mod_info_page_replaces_detail() {
        let state = UiState {
            show_mod_info: true,
            ..UiState::default()
        };
        let view = SeedDetailView::new(RouteParams::new("123", "4"));
        let text = draw(&state, &view, &StoreSnapshot::default());
        assert!(text.contains(mod_info::HEADLINE));
        assert!(!text.contains("Loading seed"));
    }

    #[test]
    fn logs_are_trimmed_and_bounded() {
        let mut state = UiState::default();
        for index in 0..10 {
            state.push_log(format!("line {index}\n"));
        }
        state.push_log("\n");
        assert_eq!(state.logs.len(), state.max_logs);
        assert_eq!(state.logs.front().map(String::as_str), Some("line 9"));
    }
}
