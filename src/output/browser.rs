//! Terminal browser for stored listings
//!
//! Shows records in a scrollable table (Name / Phone / Credentials) sorted
//! by title, with the selected listing's details in a footer.
//!
//! | Key | Action |
//! |-----|--------|
//! | `↑` / `k`, `↓` / `j` | Move selection |
//! | `PgUp` / `PgDn` | Move by a page |
//! | `Home` / `End` | First / last row |
//! | `s` | Toggle ascending / descending |
//! | `q` / `Esc` | Quit |

use crate::output::summary::{OutputError, OutputResult};
use crate::record::Record;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, TableState, Wrap};
use ratatui::{Frame, Terminal};
use std::io::{self, Stdout};

/// Rows moved by PageUp / PageDown
const PAGE_SIZE: usize = 10;

/// Placeholder shown for a listing without a phone number
const NO_PHONE: &str = "N/A";

/// Sorting and selection state of the browser, independent of the terminal
#[derive(Debug, Clone)]
pub struct BrowserState {
    records: Vec<Record>,
    ascending: bool,
    selected: usize,
}

impl BrowserState {
    /// Creates a browser over `records`, sorted ascending by title
    pub fn new(mut records: Vec<Record>) -> Self {
        records.sort_by(|a, b| a.title.cmp(&b.title));
        Self {
            records,
            ascending: true,
            selected: 0,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn is_ascending(&self) -> bool {
        self.ascending
    }

    pub fn selected_index(&self) -> Option<usize> {
        (!self.records.is_empty()).then_some(self.selected)
    }

    pub fn selected(&self) -> Option<&Record> {
        self.records.get(self.selected)
    }

    /// Table cells for one record: name, phone (or "N/A"), credentials
    pub fn cells(record: &Record) -> [&str; 3] {
        let phone = if record.phone.is_empty() {
            NO_PHONE
        } else {
            record.phone.as_str()
        };
        [record.title.as_str(), phone, record.credentials.as_str()]
    }

    /// Reverses the sort order, keeping the same record selected
    pub fn toggle_sort(&mut self) {
        self.ascending = !self.ascending;
        self.records.reverse();
        if !self.records.is_empty() {
            self.selected = self.records.len() - 1 - self.selected;
        }
    }

    pub fn next(&mut self) {
        self.move_by(1);
    }

    pub fn previous(&mut self) {
        self.move_by(-1);
    }

    pub fn page_down(&mut self) {
        self.move_by(PAGE_SIZE as isize);
    }

    pub fn page_up(&mut self) {
        self.move_by(-(PAGE_SIZE as isize));
    }

    pub fn first(&mut self) {
        self.selected = 0;
    }

    pub fn last(&mut self) {
        self.selected = self.records.len().saturating_sub(1);
    }

    /// Applies a key press
    ///
    /// # Returns
    ///
    /// `true` if the browser should close
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::PageDown => self.page_down(),
            KeyCode::PageUp => self.page_up(),
            KeyCode::Home => self.first(),
            KeyCode::End => self.last(),
            KeyCode::Char('s') => self.toggle_sort(),
            _ => {}
        }
        false
    }

    fn move_by(&mut self, delta: isize) {
        if self.records.is_empty() {
            return;
        }
        let max = self.records.len() - 1;
        self.selected = self.selected.saturating_add_signed(delta).min(max);
    }
}

/// Opens the browser in the alternate screen and blocks until the user quits
///
/// # Arguments
///
/// * `records` - The listings to show, in any order
pub fn browse(records: Vec<Record>) -> OutputResult<()> {
    let mut state = BrowserState::new(records);
    let mut terminal = setup_terminal()?;
    let _cleanup = TerminalCleanup;

    let mut table_state = TableState::default();

    loop {
        table_state.select(state.selected_index());
        terminal.draw(|frame| draw(frame, &state, &mut table_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && state.handle_key(key.code) {
                break;
            }
        }
    }

    Ok(())
}

fn draw(frame: &mut Frame, state: &BrowserState, table_state: &mut TableState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(7),
        ])
        .split(frame.area());

    let order = if state.is_ascending() { "A-Z" } else { "Z-A" };
    let banner = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" psych: {} therapists ", state.records().len()),
            Style::default().fg(Color::White).bg(Color::Blue),
        ),
        Span::raw(format!("  sorted {}  (s: sort, q: quit)", order)),
    ]));
    frame.render_widget(banner, chunks[0]);

    let header = Row::new(["Name", "Phone", "Credentials"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = state
        .records()
        .iter()
        .map(|record| Row::new(BrowserState::cells(record)));
    let table = Table::new(
        rows,
        [
            Constraint::Length(28),
            Constraint::Length(16),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL))
    .row_highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan))
    .highlight_symbol("> ");
    frame.render_stateful_widget(table, chunks[1], table_state);

    let details = match state.selected() {
        Some(record) => vec![
            Line::from(Span::styled(
                format!("{} - {}", record.title, record.credentials),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(record.statement.as_str()),
        ],
        None => vec![Line::from("No therapists to show")],
    };
    let footer = Paragraph::new(details)
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().add_modifier(Modifier::DIM))
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[2]);
}

fn setup_terminal() -> OutputResult<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()
        .map_err(|e| OutputError::Terminal(format!("cannot enter raw mode: {}", e)))?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e.into());
    }
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

/// Restores the terminal on every exit path
struct TerminalCleanup;

impl Drop for TerminalCleanup {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}
