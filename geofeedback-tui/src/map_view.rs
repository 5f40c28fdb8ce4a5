use crate::{App, InputMode};
use geofeedback_core::filter::{CategoryFilter, RiskFilter};
use geofeedback_core::map::{LayerId, Viewport};
use geofeedback_core::search::SearchRow;
use geofeedback_core::style::{Rgb, risk_style};
use geofeedback_loader::RiskLevel;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Block, Borders, Clear, List, ListItem, Paragraph, Wrap,
        canvas::{Canvas, Circle, Points},
    },
};

/// Nominal pixel size of one terminal cell; maps cells onto map pixels.
pub const CELL_WIDTH_PX: f64 = 8.0;
pub const CELL_HEIGHT_PX: f64 = 16.0;

const SIDEBAR_WIDTH: u16 = 38;
const ZONE_FILL_STEP_PX: f64 = 8.0;

pub fn viewport_for(area: Rect) -> Viewport {
    Viewport::new(
        area.width as f64 * CELL_WIDTH_PX,
        area.height as f64 * CELL_HEIGHT_PX,
    )
}

fn to_color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

fn key_hint(key: &str) -> Span<'static> {
    Span::styled(format!(" {} ", key), Style::default().fg(Color::Black).bg(Color::Gray))
}

pub fn risk_filter_label(filter: RiskFilter) -> &'static str {
    match filter {
        RiskFilter::All => "Todos",
        RiskFilter::Level(level) => risk_style(level).label,
    }
}

pub fn category_filter_label(filter: &CategoryFilter) -> String {
    match filter {
        CategoryFilter::All => "Todas".to_string(),
        CategoryFilter::Only(category) => category.to_string(),
    }
}

pub fn ui(f: &mut Frame, app: &mut App) {
    let size = f.area();

    let vertical_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),    // Map + sidebar
            Constraint::Length(1), // Status line
            Constraint::Length(1), // Hints bar
        ])
        .split(size);

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vertical_chunks[0]);

    let map_block = Block::default()
        .borders(Borders::ALL)
        .title(" Mapa de Riesgo · Papudo ")
        .border_style(Style::default().fg(Color::Cyan));
    let map_area = map_block.inner(main_chunks[0]);
    f.render_widget(map_block, main_chunks[0]);

    app.set_viewport(viewport_for(map_area));

    render_map(f, map_area, app);
    render_sidebar(f, main_chunks[1], app);
    render_status(f, vertical_chunks[1], app);
    render_hints(f, vertical_chunks[2], app);

    if app.is_loading() {
        render_loading(f, size, app);
    }
    if let Some(alert) = app.alert() {
        render_alert(f, size, alert, app.loading_message());
    }
}

fn render_map(f: &mut Frame, area: Rect, app: &App) {
    let controller = app.controller();
    let map = controller.map();
    let vp = app.viewport();
    let mpp = map.meters_per_pixel();

    // canvas y grows upwards, screen y downwards
    let flip = |x: f64, y: f64| (x, vp.height - y);

    let mut zones: Vec<(f64, f64, f64, Color)> = Vec::new();
    let mut zone_fill: Vec<(Color, Vec<(f64, f64)>)> = Vec::new();
    if controller.layer_visible(LayerId::Risk) && mpp > 0.0 {
        for shape in controller.risk_layer().shapes() {
            let p = map.to_screen(shape.zone.center(), vp);
            let radius = shape.zone.radius / mpp;
            let (x, y) = flip(p.x, p.y);
            zones.push((x, y, radius, to_color(shape.stroke_color)));

            let mut points = Vec::new();
            let mut dy = -radius;
            while dy <= radius {
                let mut dx = -radius;
                while dx <= radius {
                    let (px, py) = (x + dx, y + dy);
                    if dx * dx + dy * dy <= radius * radius
                        && (0.0..=vp.width).contains(&px)
                        && (0.0..=vp.height).contains(&py)
                    {
                        points.push((px, py));
                    }
                    dx += ZONE_FILL_STEP_PX;
                }
                dy += ZONE_FILL_STEP_PX;
            }
            zone_fill.push((to_color(shape.fill_color), points));
        }
    }

    let mut labels: Vec<(f64, f64, Span<'static>)> = Vec::new();
    if controller.layer_visible(LayerId::Infrastructure) {
        let markers = controller.infrastructure_layer().markers();
        for cluster in controller.clusters(vp) {
            let p = map.to_screen(cluster.center, vp);
            let (x, y) = flip(p.x, p.y);

            let span = if cluster.is_single() {
                let marker = &markers[cluster.members[0]];
                Span::styled(
                    marker.style.glyph.to_string(),
                    Style::default()
                        .fg(to_color(marker.border_color))
                        .bg(to_color(marker.style.color))
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                let bg = match cluster.len() {
                    0..=9 => Color::Rgb(0x6E, 0xCC, 0x39),
                    10..=99 => Color::Rgb(0xF0, 0xC2, 0x0C),
                    _ => Color::Rgb(0xF1, 0x80, 0x17),
                };
                Span::styled(
                    format!("({})", cluster.len()),
                    Style::default().fg(Color::Black).bg(bg).add_modifier(Modifier::BOLD),
                )
            };
            labels.push((x, y, span));
        }
    }

    let canvas = Canvas::default()
        .marker(Marker::Braille)
        .x_bounds([0.0, vp.width])
        .y_bounds([0.0, vp.height])
        .paint(|ctx| {
            ctx.print(vp.width / 2.0, vp.height / 2.0, Span::styled("+", Style::default().fg(Color::DarkGray)));

            for (color, points) in &zone_fill {
                ctx.draw(&Points { coords: points, color: *color });
            }
            for &(x, y, radius, color) in &zones {
                ctx.draw(&Circle { x, y, radius, color });
            }
            ctx.layer();

            for (x, y, span) in &labels {
                ctx.print(*x, *y, span.clone());
            }
        });

    f.render_widget(canvas, area);
}

fn render_sidebar(f: &mut Frame, area: Rect, app: &App) {
    let search = app.controller().search_state();
    let search_height = if search.visible {
        (search.rows.len() as u16 + 3).min(area.height / 2).max(4)
    } else {
        3
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(search_height),
            Constraint::Length(6), // Statistics
            Constraint::Length(4), // Layers
            Constraint::Length(4), // Filters
            Constraint::Min(3),    // Popup
        ])
        .split(area);

    render_search(f, chunks[0], app);
    render_statistics(f, chunks[1], app);
    render_layers(f, chunks[2], app);
    render_filters(f, chunks[3], app);
    render_popup(f, chunks[4], app);
}

fn render_search(f: &mut Frame, area: Rect, app: &App) {
    let searching = app.mode() == InputMode::Search;
    let border = if searching { Color::Yellow } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Buscar (/) ")
        .border_style(Style::default().fg(border));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let state = app.controller().search_state();
    let mut items = vec![ListItem::new(Line::from(vec![
        Span::styled("› ", Style::default().fg(Color::Yellow)),
        Span::raw(state.query.clone()),
        Span::styled(if searching { "▏" } else { "" }, Style::default().fg(Color::Yellow)),
    ]))];

    if state.visible {
        for (idx, row) in state.rows.iter().enumerate() {
            let style = match row {
                SearchRow::Placeholder => Style::default().fg(Color::DarkGray),
                SearchRow::Hit(_) if searching && idx == app.selected_result() => Style::default()
                    .fg(Color::White)
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
                SearchRow::Hit(_) => Style::default().fg(Color::White),
            };
            items.push(ListItem::new(row.label()).style(style));
        }
    }

    f.render_widget(List::new(items), inner);
}

fn render_statistics(f: &mut Frame, area: Rect, app: &App) {
    let panel = app.controller().panel();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Estadísticas ")
        .border_style(Style::default().fg(Color::Cyan));

    let counter = |label: &'static str, value: usize, color: Color| {
        Line::from(vec![
            Span::styled(format!("{:<8}", label), Style::default().fg(color)),
            Span::styled(value.to_string(), Style::default().add_modifier(Modifier::BOLD)),
        ])
    };

    let text = vec![
        counter("Total", panel.total, Color::White),
        counter("Alto", panel.high, to_color(risk_style(RiskLevel::High).color)),
        counter("Medio", panel.medium, to_color(risk_style(RiskLevel::Medium).color)),
        counter("Bajo", panel.low, to_color(risk_style(RiskLevel::Low).color)),
    ];

    f.render_widget(Paragraph::new(text).block(block), area);
}

fn render_layers(f: &mut Frame, area: Rect, app: &App) {
    let controller = app.controller();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Capas ")
        .border_style(Style::default().fg(Color::Cyan));

    let toggle = |on: bool, label: &'static str, key: &'static str| {
        Line::from(vec![
            Span::styled(
                if on { "[x] " } else { "[ ] " },
                Style::default().fg(if on { Color::Green } else { Color::DarkGray }),
            ),
            Span::raw(label),
            Span::styled(format!(" ({})", key), Style::default().fg(Color::DarkGray)),
        ])
    };

    let text = vec![
        toggle(controller.layer_visible(LayerId::Risk), "Zonas de Riesgo", "r"),
        toggle(controller.layer_visible(LayerId::Infrastructure), "Infraestructura", "i"),
    ];
    f.render_widget(Paragraph::new(text).block(block), area);
}

fn render_filters(f: &mut Frame, area: Rect, app: &App) {
    let filters = app.controller().filters();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Filtros ")
        .border_style(Style::default().fg(Color::Cyan));

    let text = vec![
        Line::from(vec![
            Span::styled("Nivel (f): ", Style::default().fg(Color::DarkGray)),
            Span::styled(risk_filter_label(filters.risk), Style::default().fg(Color::Yellow)),
        ]),
        Line::from(vec![
            Span::styled("Categoría (c): ", Style::default().fg(Color::DarkGray)),
            Span::styled(category_filter_label(&filters.category), Style::default().fg(Color::Yellow)),
        ]),
    ];
    f.render_widget(Paragraph::new(text).block(block), area);
}

fn render_popup(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Detalle ")
        .border_style(Style::default().fg(Color::Magenta));

    let text = match app.controller().popup() {
        Some(popup) => {
            let mut lines = vec![Line::from(Span::styled(
                popup.title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ))];
            lines.extend(popup.lines.iter().map(|l| Line::from(l.clone())));
            lines
        }
        None => vec![Line::from(Span::styled(
            "Enter: abrir el marcador bajo +",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    f.render_widget(Paragraph::new(text).block(block).wrap(Wrap { trim: true }), area);
}

fn render_status(f: &mut Frame, area: Rect, app: &App) {
    let controller = app.controller();
    let map = controller.map();
    let scale = map.scale_bar(app.viewport().width);
    let ruler_cells = ((scale.width_px / CELL_WIDTH_PX).round() as usize).max(1);

    let origin = controller.origin().map(|o| o.as_str()).unwrap_or("-");

    let line = Line::from(vec![
        Span::styled(format!(" {} ", origin), Style::default().fg(Color::Cyan)),
        Span::raw(format!(
            "│ {} visibles ({} en pantalla) ",
            controller.visible_count(),
            controller.in_view_count(app.viewport())
        )),
        Span::raw(format!("│ zoom {} ", map.zoom())),
        Span::raw(format!("│ ├{}┤ {} ", "─".repeat(ruler_cells), scale.label)),
        Span::styled(
            format!("│ {}", map.base_layer().attribution),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    f.render_widget(Paragraph::new(line), area);
}

fn render_hints(f: &mut Frame, area: Rect, app: &App) {
    let hints = match app.mode() {
        InputMode::Search => Line::from(vec![
            key_hint("ESC"),
            Span::raw(" Cerrar  "),
            key_hint("↑/↓"),
            Span::raw(" Resultado  "),
            key_hint("Enter"),
            Span::raw(" Ir"),
        ]),
        InputMode::Map => Line::from(vec![
            key_hint("q/ESC"),
            Span::raw(" Salir  "),
            key_hint("←↑↓→"),
            Span::raw(" Mover  "),
            key_hint("+/-"),
            Span::raw(" Zoom  "),
            key_hint("r/i"),
            Span::raw(" Capas  "),
            key_hint("f/c"),
            Span::raw(" Filtros  "),
            key_hint("/"),
            Span::raw(" Buscar  "),
            key_hint("Enter"),
            Span::raw(" Seleccionar"),
        ]),
    };

    let paragraph = Paragraph::new(hints).style(Style::default().bg(Color::Black).fg(Color::Gray));
    f.render_widget(paragraph, area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_loading(f: &mut Frame, area: Rect, app: &App) {
    let rect = centered_rect(56, 5, area);
    f.render_widget(Clear, rect);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" GeoFeedback ")
        .border_style(Style::default().fg(Color::Yellow));

    let text = vec![
        Line::from(Span::styled(
            "⠋ Cargando datos...",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(app.loading_message().to_string(), Style::default().fg(Color::DarkGray))),
    ];
    f.render_widget(Paragraph::new(text).block(block).wrap(Wrap { trim: true }), rect);
}

fn render_alert(f: &mut Frame, area: Rect, alert: &str, detail: &str) {
    let rect = centered_rect(64, 9, area);
    f.render_widget(Clear, rect);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Error ")
        .border_style(Style::default().fg(Color::Red));

    let text = vec![
        Line::from(Span::styled(
            format!("✗ {}", alert),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(detail.to_string(), Style::default().fg(Color::DarkGray))),
        Line::from(""),
        Line::from(vec![key_hint("q/ESC"), Span::raw(" Salir")]),
    ];
    f.render_widget(Paragraph::new(text).block(block).wrap(Wrap { trim: true }), rect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LoadMessage, create_load_channel};
    use geofeedback_core::AppConfig;
    use geofeedback_loader::{Category, Coordinates, DataOrigin, Dataset, Facility, LoadOutcome};
    use ratatui::{Terminal, backend::TestBackend};

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_viewport_for_area() {
        let vp = viewport_for(Rect::new(0, 0, 100, 40));
        assert_eq!(vp.width, 800.0);
        assert_eq!(vp.height, 640.0);
    }

    #[test]
    fn test_filter_labels() {
        assert_eq!(risk_filter_label(RiskFilter::All), "Todos");
        assert_eq!(risk_filter_label(RiskFilter::Level(RiskLevel::Medium)), "Medio");
        assert_eq!(category_filter_label(&CategoryFilter::Only(Category::Salud)), "Salud");
    }

    #[test]
    fn test_renders_loading_overlay() {
        let (_tx, rx) = create_load_channel();
        let mut app = App::new(&AppConfig::default(), rx);
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();

        terminal.draw(|f| ui(f, &mut app)).unwrap();
        assert!(buffer_text(&terminal).contains("Cargando datos"));
    }

    #[test]
    fn test_renders_statistics_after_load() {
        let (tx, rx) = create_load_channel();
        let mut app = App::new(&AppConfig::default(), rx);
        tx.send(LoadMessage::Loaded(LoadOutcome {
            dataset: Dataset::new(vec![Facility::new(
                "Escuela Papudo",
                Category::Educacion,
                RiskLevel::High,
                Coordinates::new(-71.4469, -32.5127),
            )]),
            origin: DataOrigin::LocalFallback,
        }))
        .unwrap();
        app.process_messages();

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| ui(f, &mut app)).unwrap();

        let text = buffer_text(&terminal);
        assert!(!text.contains("Cargando datos"));
        assert!(text.contains("Estadísticas"));
        assert!(text.contains("Zonas de Riesgo"));
        assert_eq!(app.viewport().width, (120 - SIDEBAR_WIDTH - 2) as f64 * CELL_WIDTH_PX);
    }
}
