use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

pub mod layout;

use crate::app::{App, InputMode, StatusLevel};
use crate::domain::{counterparty_name, short_addr, Outcome, Transaction, TxKind};

pub fn draw(f: &mut Frame, app: &App) {
    let areas = layout::areas(f.size());

    draw_header(f, areas.header, app);
    draw_list_panel(f, areas.list, app);
    draw_summary_panel(f, areas.summary, app);
    draw_detail_panel(f, areas.details, app);
    draw_notice_line(f, areas.notice_line, app);
    draw_command_line(f, areas.command_line, app);

    if app.show_help {
        draw_help_popup(f, areas.size);
    }
}

fn label_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);

    let mut spans = vec![
        Span::styled(
            "txmark",
            Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
    ];
    match app.wallet.as_ref() {
        Some(wallet) => {
            spans.push(Span::styled("Wallet", label_style()));
            spans.push(Span::raw(format!(" {} ", wallet.name_or_default())));
            spans.push(Span::styled("Address", label_style()));
            spans.push(Span::raw(format!(" {}", wallet.address)));
        }
        None => spans.push(Span::styled(
            "No wallet connected - press c to connect",
            Style::default().fg(Color::LightYellow),
        )),
    }
    let left = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Left);

    let activity = if app.loading {
        Span::styled("fetching… ", Style::default().fg(Color::LightYellow))
    } else if app.analyzing {
        Span::styled("analyzing… ", Style::default().fg(Color::LightYellow))
    } else {
        Span::raw("")
    };
    let explorer = match app.explorer.as_ref() {
        Some(check) if check.reachable => Span::styled("up", Style::default().fg(Color::LightGreen)),
        Some(_) => Span::styled("down", Style::default().fg(Color::LightRed)),
        None => Span::styled("--", label_style()),
    };
    let right_line = Line::from(vec![
        activity,
        Span::styled("Txs ", label_style()),
        Span::raw(format!("{}  ", app.transactions.len())),
        Span::styled("Explorer ", label_style()),
        explorer,
    ]);
    let right = Paragraph::new(right_line)
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Left);

    f.render_widget(left, chunks[0]);
    f.render_widget(right, chunks[1]);
}

fn draw_list_panel(f: &mut Frame, area: Rect, app: &App) {
    let title = if app.suggestions.is_empty() {
        format!("Transactions ({})", app.transactions.len())
    } else {
        format!(
            "Transactions ({}) - {} suggestions",
            app.transactions.len(),
            app.suggestions.len()
        )
    };

    let list = List::new(tx_items(app))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");

    let mut state = ListState::default();
    if !app.transactions.is_empty() {
        state.select(Some(app.selected));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn tx_items(app: &App) -> Vec<ListItem<'static>> {
    let wallet = app.wallet_address();
    app.transactions
        .iter()
        .enumerate()
        .map(|(index, tx)| {
            let outgoing = tx.is_outgoing_from(wallet);
            let direction = if outgoing {
                Span::styled("OUT", Style::default().fg(Color::LightRed))
            } else {
                Span::styled("IN ", Style::default().fg(Color::LightGreen))
            };
            let (other, other_tag) = if outgoing {
                (&tx.counterparty_to, &tx.counterparty_to_label)
            } else {
                (&tx.counterparty_from, &tx.counterparty_from_label)
            };
            let who = counterparty_name(other, wallet, &app.nicknames, other_tag)
                .unwrap_or_else(|| short_addr(other));
            let marker = if app.suggestion_for(index).is_some() {
                Span::styled("*", Style::default().fg(Color::LightYellow))
            } else {
                Span::raw(" ")
            };
            let failed = if tx.outcome == Outcome::Failed {
                Span::styled(" failed", Style::default().fg(Color::LightRed))
            } else {
                Span::raw("")
            };
            let label = if tx.label.is_empty() {
                Span::styled("(unlabeled)", label_style())
            } else {
                Span::styled(
                    truncate_str(&tx.label, 28),
                    Style::default().fg(Color::LightCyan),
                )
            };
            ListItem::new(Line::from(vec![
                marker,
                Span::raw(" "),
                Span::raw(format!("{:<17} ", tx.occurred_at)),
                direction,
                Span::raw(format!(" {:>12} ETH  ", truncate_str(&tx.amount, 12))),
                Span::raw(format!("{:<16} ", truncate_str(&who, 16))),
                label,
                failed,
            ]))
        })
        .collect()
}

fn draw_summary_panel(f: &mut Frame, area: Rect, app: &App) {
    let lines = match app.summary() {
        Some(summary) => vec![
            Line::from(vec![
                Span::styled("Sent      ", label_style()),
                Span::raw(format!("{:.6} ETH", summary.total_sent)),
            ]),
            Line::from(vec![
                Span::styled("Received  ", label_style()),
                Span::raw(format!("{:.6} ETH", summary.total_received)),
            ]),
            Line::from(vec![
                Span::styled("Gas fees  ", label_style()),
                Span::raw(format!("{:.6} ETH", summary.total_fees)),
            ]),
            Line::from(vec![
                Span::styled("Balance   ", label_style()),
                Span::raw(format!("{:.6} ETH", summary.balance)),
            ]),
            Line::from(vec![
                Span::styled("Outcomes  ", label_style()),
                Span::styled(
                    format!("{} ok", summary.succeeded),
                    Style::default().fg(Color::LightGreen),
                ),
                Span::raw(" / "),
                Span::styled(
                    format!("{} failed", summary.failed),
                    Style::default().fg(Color::LightRed),
                ),
            ]),
        ],
        None => vec![Line::from("No wallet")],
    };
    let paragraph = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title("Summary"));
    f.render_widget(paragraph, area);
}

fn draw_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let mut lines = match app.selected_tx() {
        Some(tx) => detail_lines(app, tx),
        None => Vec::new(),
    };
    if lines.is_empty() {
        lines.push(Line::from("No transaction selected"));
    }

    let paragraph = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title("Detail"))
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn detail_lines(app: &App, tx: &Transaction) -> Vec<Line<'static>> {
    let wallet = app.wallet_address();
    let name = |address: &str, tag: &str| {
        counterparty_name(address, wallet, &app.nicknames, tag)
            .map(|name| format!("{address} ({name})"))
            .unwrap_or_else(|| address.to_string())
    };
    let to = if tx.kind == TxKind::ContractCreation {
        "(contract creation)".to_string()
    } else {
        name(&tx.counterparty_to, &tx.counterparty_to_label)
    };
    let method = tx.invoked_method.clone().unwrap_or_else(|| "-".into());

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Tx ", Style::default().fg(Color::LightCyan)),
            Span::raw(tx.identifier.clone()),
        ]),
        Line::from(format!("Date: {}", tx.occurred_at)),
        Line::from(format!("From: {}", name(&tx.counterparty_from, &tx.counterparty_from_label))),
        Line::from(format!("To: {to}")),
        Line::from(format!("Amount: {} ETH  Fee: {} ETH", tx.amount, tx.fee_paid)),
        Line::from(format!(
            "Status: {}  Type: {}  Method: {method}",
            tx.outcome.as_str(),
            tx.kind.as_str()
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Label: ", label_style()),
            Span::raw(tx.label.clone()),
        ]),
        Line::from(vec![
            Span::styled("Description: ", label_style()),
            Span::raw(tx.description.clone()),
        ]),
    ];

    if let Some(suggestion) = app.suggestion_for(app.selected) {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Suggestion (Enter to apply)",
            Style::default()
                .fg(Color::LightYellow)
                .add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(format!("  {}", suggestion.label)));
        lines.push(Line::from(format!("  {}", suggestion.description)));
        if let Some(token) = suggestion.token_match.as_ref() {
            lines.push(Line::from(format!("  Token: {} ({})", token.symbol, token.name)));
        }
        if !suggestion.reason.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("  {}", suggestion.reason),
                label_style(),
            )));
        }
    }
    lines
}

fn draw_notice_line(f: &mut Frame, area: Rect, app: &App) {
    let line = match app.notice.as_deref() {
        Some(notice) => Line::from(vec![
            Span::styled("! ", Style::default().fg(Color::LightYellow)),
            Span::styled(notice.to_string(), Style::default().fg(Color::LightYellow)),
            Span::styled("  (Esc to dismiss)", label_style()),
        ]),
        None => Line::from(""),
    };
    f.render_widget(Paragraph::new(line), area);
}

fn draw_command_line(f: &mut Frame, area: Rect, app: &App) {
    let content = match app.input_mode {
        InputMode::Prompt(kind) => {
            let target = app
                .prompt_context()
                .map(|addr| format!("addr: {}, ", short_addr(addr)))
                .unwrap_or_default();
            Line::from(vec![
                Span::styled(format!("> {} ", kind.title()), Style::default().fg(Color::LightCyan)),
                Span::raw(app.input.clone()),
                Span::styled(
                    format!("  ({target}empty=clear, Enter=ok Esc=cancel)"),
                    label_style(),
                ),
            ])
        }
        InputMode::Normal => {
            if let Some((text, level)) = app.status_text() {
                let color = match level {
                    StatusLevel::Info => Color::LightGreen,
                    StatusLevel::Warn => Color::LightYellow,
                    StatusLevel::Error => Color::LightRed,
                };
                Line::from(vec![
                    Span::styled("msg: ", label_style()),
                    Span::styled(text.to_string(), Style::default().fg(color)),
                ])
            } else {
                action_hints()
            }
        }
    };

    let paragraph = Paragraph::new(content).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}

fn action_hints() -> Line<'static> {
    let mut spans = Vec::new();
    for (key, action) in [
        ("r", "refresh"),
        ("e", "label"),
        ("d", "desc"),
        ("n", "nickname"),
        ("a", "suggest"),
        ("x", "pdf"),
        ("?", "help"),
        ("q", "quit"),
    ] {
        spans.push(Span::styled(key, Style::default().fg(Color::LightCyan)));
        spans.push(Span::styled(format!(" {action}  "), label_style()));
    }
    Line::from(spans)
}

fn draw_help_popup(f: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    f.render_widget(Clear, popup_area);

    let lines = vec![
        Line::from("Navigation"),
        Line::from("  j / k      Move selection"),
        Line::from("  g / G      Top / bottom"),
        Line::from("  Esc        Dismiss notice / close"),
        Line::from(""),
        Line::from("Wallet"),
        Line::from("  c          Connect address [name]"),
        Line::from("  D          Disconnect"),
        Line::from("  r          Refresh from explorer"),
        Line::from(""),
        Line::from("Annotate"),
        Line::from("  e          Edit label"),
        Line::from("  d          Edit description"),
        Line::from("  n          Nickname the counterparty"),
        Line::from("  a          Request suggestions"),
        Line::from("  Enter      Apply suggestion (selected)"),
        Line::from("  A          Apply all suggestions"),
        Line::from(""),
        Line::from("Other"),
        Line::from("  x          Export PDF"),
        Line::from("  y          Copy tx hash"),
        Line::from("  ?          Toggle help"),
        Line::from("  q          Quit"),
    ];

    let paragraph = Paragraph::new(Text::from(lines))
        .block(Block::default().title("Help").borders(Borders::ALL))
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });

    f.render_widget(paragraph, popup_area);
}

fn truncate_str(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    value.chars().take(max).collect::<String>() + "…"
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("abcdefghij", 4), "abcd…");
    }

    #[test]
    fn test_draw_renders_without_wallet_and_with_help() {
        let mut app = App::new(LocalStore::open_in_memory().unwrap());
        app.show_help = true;
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();
        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|cell| cell.symbol()).collect();
        assert!(text.contains("txmark"));
        assert!(text.contains("Help"));
    }
}
