use ratatui::{
    layout::{Constraint, Direction, Layout},
    prelude::*,
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table},
};

use super::view::ClientView;
use crate::core::protocol::RoomView;
use crate::core::rules::{self, Square, Symbol, BOARD_SIZE};

pub fn render(frame: &mut Frame, view: &ClientView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(4), // Players
            Constraint::Length(5), // Board
            Constraint::Length(3), // Status
            Constraint::Min(3),    // Move log
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    let room_label = view
        .room_id
        .as_ref()
        .map_or_else(|| "connecting".to_string(), |id| format!("room {id}"));
    let header = Paragraph::new(format!("TIC-TAC-TOE  |  {room_label}  |  you: {}", view.role()))
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    frame.render_widget(header, chunks[0]);

    frame.render_widget(players_widget(view), chunks[1]);
    frame.render_widget(board_widget(view), chunks[2]);

    let mut status_lines = vec![Line::from(view.status())];
    if let Some(notice) = &view.notice {
        status_lines.push(Line::from(notice.as_str()).style(Style::default().fg(Color::DarkGray)));
    }
    let status = Paragraph::new(status_lines).style(Style::default().fg(Color::Yellow));
    frame.render_widget(status, chunks[3]);

    frame.render_widget(log_widget(view.room.as_ref()), chunks[4]);

    let footer = match &view.editing {
        Some(buffer) => format!("New name: {buffer}_   [Enter] Save  [Esc] Cancel"),
        None => "[Arrows] Move  [Enter] Place  [E] Edit name  [R] Restart  [Q] Quit".to_string(),
    };
    frame.render_widget(Paragraph::new(footer).alignment(Alignment::Center), chunks[5]);
}

fn players_widget(view: &ClientView) -> List<'static> {
    let items: Vec<ListItem> = [Symbol::X, Symbol::O]
        .into_iter()
        .map(|symbol| {
            let (name, seated, active) = match &view.room {
                Some(room) => (
                    room.players.get(symbol).clone(),
                    *room.seats.get(symbol),
                    room.active == symbol && !room.is_over(),
                ),
                None => (default_name(symbol), Some(symbol) == view.symbol, symbol == Symbol::X),
            };
            let marker = if active { ">" } else { " " };
            let seat = if seated { "" } else { "  (empty seat)" };
            let style = if active {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!("{marker} {symbol}  {name}{seat}")).style(style)
        })
        .collect();

    List::new(items).block(Block::default().borders(Borders::ALL).title("Players"))
}

fn default_name(symbol: Symbol) -> String {
    let index = match symbol {
        Symbol::X => 0,
        Symbol::O => 1,
    };
    crate::core::room::DEFAULT_NAMES[index].to_string()
}

fn board_widget(view: &ClientView) -> Table<'static> {
    let board = view.room.as_ref().map_or_else(rules::empty_board, |room| room.board);
    let winning = rules::winning_line(&board).map(|(_, line)| line);

    let rows = (0..BOARD_SIZE).map(|row| {
        let cells = (0..BOARD_SIZE).map(|column| {
            let square = Square::new(row, column);
            let text = board[row][column].map_or(" . ", |symbol| match symbol {
                Symbol::X => " X ",
                Symbol::O => " O ",
            });

            let mut style = match board[row][column] {
                Some(Symbol::X) => Style::default().fg(Color::Red),
                Some(Symbol::O) => Style::default().fg(Color::Blue),
                None => Style::default().fg(Color::DarkGray),
            };
            if winning.is_some_and(|line| line.contains(&square)) {
                style = style.bg(Color::Green).fg(Color::Black);
            }
            if square == view.cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Cell::from(text).style(style)
        });
        Row::new(cells.collect::<Vec<_>>())
    });

    Table::new(rows.collect::<Vec<_>>(), [Constraint::Length(3); BOARD_SIZE])
        .column_spacing(1)
        .block(Block::default().borders(Borders::ALL).title("Board"))
}

fn log_widget(room: Option<&RoomView>) -> List<'static> {
    let items: Vec<ListItem> = room
        .map(|room| {
            let total = room.turns.len();
            room.turns
                .iter()
                .enumerate()
                .map(|(i, turn)| {
                    ListItem::new(format!(
                        "{:>2}. {} selected {},{}",
                        total - i,
                        turn.player,
                        turn.square.row,
                        turn.square.column
                    ))
                })
                .collect()
        })
        .unwrap_or_default();

    List::new(items).block(Block::default().borders(Borders::ALL).title("Moves"))
}
