use anyhow::Result;
use cellbook_config::{Config, PathSource};
use cellbook_engine::{Document, FileTree, FileTreeItem, Snapshot, io};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use std::{
    env,
    io::{Stdout, stdout},
    path::PathBuf,
    process,
};

struct App {
    notebooks_path: PathBuf,
    file_tree: FileTree,
    tree_items: Vec<FileTreeItem>,
    file_list_state: ListState,
    current_content: Vec<String>,
    content_title: String,
}

impl App {
    fn new(notebooks_path: PathBuf) -> Result<Self> {
        let file_tree = io::build_file_tree(&notebooks_path)?;
        let tree_items = file_tree.get_items();

        let mut app = Self {
            notebooks_path,
            file_tree,
            tree_items,
            file_list_state: ListState::default(),
            current_content: Vec::new(),
            content_title: "Cells".to_string(),
        };

        // Select first item if available
        if !app.tree_items.is_empty() {
            app.file_list_state.select(Some(0));
            app.update_content_for_selection();
        }

        Ok(app)
    }

    fn next_file(&mut self) {
        let i = match self.file_list_state.selected() {
            Some(i) => (i + 1) % self.tree_items.len(),
            None => 0,
        };
        self.file_list_state.select(Some(i));
        self.update_content_for_selection();
    }

    fn previous_file(&mut self) {
        let i = match self.file_list_state.selected() {
            Some(i) => {
                if i == 0 {
                    self.tree_items.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.file_list_state.select(Some(i));
        self.update_content_for_selection();
    }

    fn update_content_for_selection(&mut self) {
        if let Some(index) = self.file_list_state.selected()
            && let Some(item) = self.tree_items.get(index)
        {
            if item.node.is_folder {
                self.content_title = item.node.name.clone();
                self.current_content = vec![
                    format!("📁 {}", item.node.name),
                    String::new(),
                    "Press Enter/Space to toggle, → to expand, ← to collapse".to_string(),
                ];
            } else if let Some(ref file) = item.node.notebook_file {
                self.content_title = file.display_path().to_string();
                // Load the notebook and render its cells
                match io::read_notebook(file.relative_path(), &self.notebooks_path) {
                    Ok(content) => match Document::from_bytes(content.as_bytes()) {
                        Ok(mut document) => {
                            self.current_content = render_snapshot(&document.snapshot());
                        }
                        Err(e) => {
                            self.current_content = vec![format!("Error parsing notebook: {}", e)];
                        }
                    },
                    Err(e) => {
                        self.current_content = vec![format!("Error reading file: {}", e)];
                    }
                }
            }
        }
    }

    fn activate_selected_item(&mut self) {
        if let Some(index) = self.file_list_state.selected()
            && let Some(item) = self.tree_items.get(index)
            && item.node.is_folder
        {
            let path = item.node.path.clone();
            self.file_tree.toggle_folder(&path);
            self.tree_items = self.file_tree.get_items();
            self.update_content_for_selection();
        }
        // Files don't need activation, they're loaded on selection
    }

    fn expand_selected_folder(&mut self) {
        if let Some(index) = self.file_list_state.selected()
            && let Some(item) = self.tree_items.get(index)
            && item.node.is_folder
            && !item.node.is_expanded
        {
            let path = item.node.path.clone();
            self.file_tree.expand_folder(&path);
            self.tree_items = self.file_tree.get_items();
            self.update_content_for_selection();
        }
    }

    fn collapse_selected_folder(&mut self) {
        if let Some(index) = self.file_list_state.selected()
            && let Some(item) = self.tree_items.get(index)
            && item.node.is_folder
            && item.node.is_expanded
        {
            let path = item.node.path.clone();
            self.file_tree.collapse_folder(&path);
            self.tree_items = self.file_tree.get_items();
            self.update_content_for_selection();
        }
    }
}

fn render_snapshot(snapshot: &Snapshot) -> Vec<String> {
    if let Some(reason) = &snapshot.malformed {
        return vec![
            "⚠ Not a recognizable notebook".to_string(),
            String::new(),
            reason.clone(),
        ];
    }

    if snapshot.cells.is_empty() {
        return vec!["(empty notebook)".to_string()];
    }

    let mut lines = Vec::new();
    for cell in &snapshot.cells {
        lines.push(format!("[{}] {}", cell.index, cell.cell_type));
        for line in cell.source.lines() {
            lines.push(format!("  {}", line));
        }
        if cell.source.is_empty() {
            lines.push("  (empty cell)".to_string());
        }
        lines.push(String::new());
    }

    lines
}

fn main() -> Result<()> {
    // Determine notebooks path from CLI args or config file
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    if args.len() > 2 {
        eprintln!("Usage: {} [notebooks-folder-path]", args[0]);
        process::exit(1);
    }

    let (notebooks_path, path_source) =
        match Config::resolve_notebooks_path(args.get(1).map(String::as_str)) {
            Ok(Some(resolved)) => resolved,
            Ok(None) => {
                eprintln!("Error: No notebooks path provided and no config file found");
                eprintln!("Usage: {} <notebooks-folder-path>", args[0]);
                eprintln!("Or create a config file at {}", config_path.display());
                process::exit(1);
            }
            Err(e) => {
                eprintln!("Error: Failed to load config file: {e}");
                eprintln!("Usage: {} <notebooks-folder-path>", args[0]);
                process::exit(1);
            }
        };

    // Validate notebooks directory using engine
    if let Err(e) = io::validate_notebooks_dir(&notebooks_path) {
        let source = match path_source {
            PathSource::ConfigFile => format!(" from config file '{}'", config_path.display()),
            PathSource::Argument => String::new(),
        };
        eprintln!(
            "Error: Notebooks path '{}'{} is invalid: {e}",
            notebooks_path.display(),
            source
        );
        process::exit(1);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app
    let mut app = App::new(notebooks_path)?;

    // Main loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Down | KeyCode::Char('j') => app.next_file(),
                KeyCode::Up | KeyCode::Char('k') => app.previous_file(),
                KeyCode::Enter | KeyCode::Char(' ') => app.activate_selected_item(),
                KeyCode::Right => app.expand_selected_folder(),
                KeyCode::Left => app.collapse_selected_folder(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)].as_ref())
        .split(f.area());

    // File list panel
    let file_items: Vec<ListItem> = app
        .tree_items
        .iter()
        .map(|item| {
            let indent = "  ".repeat(item.depth);
            let icon = if item.node.is_folder {
                if item.node.is_expanded {
                    "📂 "
                } else {
                    "📁 "
                }
            } else {
                "📓 "
            };
            let name = &item.node.name;
            let display_text = format!("{}{}{}", indent, icon, name);
            ListItem::new(vec![Line::from(vec![Span::raw(display_text)])])
        })
        .collect();

    let files_list = List::new(file_items)
        .block(Block::default().borders(Borders::ALL).title("Notebooks"))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));

    f.render_stateful_widget(files_list, chunks[0], &mut app.file_list_state);

    // Cell panel
    let content_text = if app.current_content.is_empty() {
        vec![Line::from("Select a notebook to view its cells")]
    } else {
        app.current_content
            .iter()
            .map(|line| Line::from(vec![Span::raw(line.clone())]))
            .collect()
    };

    let content = Paragraph::new(content_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(app.content_title.clone()),
        )
        .wrap(ratatui::widgets::Wrap { trim: true });

    f.render_widget(content, chunks[1]);

    // Instructions
    let help_text = Line::from(vec![
        Span::raw("q: Quit | "),
        Span::raw("↑/k: Previous | "),
        Span::raw("↓/j: Next | "),
        Span::raw("Enter/Space: Toggle | →: Expand | ←: Collapse"),
    ]);

    let help = Paragraph::new(vec![help_text]).block(Block::default());

    // Place help at bottom
    let bottom_chunk = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(f.area());

    f.render_widget(help, bottom_chunk[1]);
}
