//! UI rendering for the debugger.

use super::app::DebuggerApp;
use crate::cpu::{Condition, MachineState};
use ratatui::{
    prelude::*,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(frame.area());

    // Left side: code, registers, output and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(7),
            Constraint::Length(8),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_disassembly(frame, left_chunks[0], app);
    draw_registers(frame, left_chunks[1], app);
    draw_output(frame, left_chunks[2], app);
    draw_status(frame, left_chunks[3], app);

    // Right side: memory and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(5)])
        .split(chunks[1]);

    draw_memory(frame, right_chunks[0], app);
    draw_help(frame, right_chunks[1], app);
}

/// Draw disassembly view around PC.
fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let disasm = app.get_disassembly((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = disasm
        .iter()
        .map(|(addr, instr, is_current)| {
            let prefix = if *is_current { "▶ " } else { "  " };
            let bp = if app.breakpoints.contains(addr) { "●" } else { " " };
            let text = format!("{}x{:04X}: {}", prefix, addr, instr);

            let style = if *is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.breakpoints.contains(addr) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };

            ListItem::new(format!("{} {}", bp, text)).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Disassembly ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    frame.render_widget(list, area);
}

/// Draw the register file.
fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let regs = &app.machine.regs;

    let gpr_line = |range: std::ops::Range<usize>| {
        let spans: Vec<Span> = range
            .flat_map(|i| {
                [
                    Span::raw(format!("R{}: ", i)),
                    Span::styled(
                        format!("x{:04X} ", regs.gpr[i]),
                        Style::default().fg(Color::White),
                    ),
                    Span::styled(
                        format!("{:>6}  ", regs.gpr[i] as i16),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]
            })
            .collect();
        Line::from(spans)
    };

    let content = vec![
        gpr_line(0..4),
        gpr_line(4..8),
        Line::from(vec![
            Span::raw("PC: "),
            Span::styled(format!("x{:04X}", regs.pc), Style::default().fg(Color::Yellow)),
            Span::raw("   COND: "),
            Span::styled(regs.cond.letter().to_string(), condition_style(regs.cond)),
        ]),
        Line::from(vec![
            Span::raw("Cycles: "),
            Span::styled(format!("{}", app.machine.cycles), Style::default().fg(Color::Cyan)),
            Span::raw("   State: "),
            Span::styled(format!("{:?}", app.machine.state), state_style(app.machine.state)),
        ]),
    ];

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)),
    );

    frame.render_widget(paragraph, area);
}

/// Draw memory view.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);

    let items: Vec<ListItem> = app
        .machine
        .mem
        .dump(app.mem_scroll, visible_rows)
        .into_iter()
        .map(|(addr, value)| {
            let is_pc = addr == app.machine.regs.pc;
            let printable = match value {
                0x20..=0x7E => value as u8 as char,
                _ => '.',
            };
            let text = format!("x{:04X}: x{:04X} {:>6} {}", addr, value, value as i16, printable);

            let style = if is_pc {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if value != 0 {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Memory ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)),
    );

    frame.render_widget(list, area);
}

/// Draw guest console output.
fn draw_output(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let lines: Vec<Line> = app
        .output_lines((area.height as usize).saturating_sub(2))
        .into_iter()
        .map(Line::from)
        .collect();

    let output = Paragraph::new(lines).block(
        Block::default()
            .title(" Output ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    );

    frame.render_widget(output, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let style = if app.awaiting_input {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    };
    let status = Paragraph::new(app.status.clone())
        .style(style)
        .block(Block::default().title(" Status ").borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let lines = if app.awaiting_input {
        vec![
            Line::from("Type a character for the program"),
            Line::from("Esc: Pause"),
        ]
    } else {
        vec![
            Line::from("s: Step  r: Run  p: Pause  b: Breakpoint"),
            Line::from("x: Reset  ↑↓: Scroll memory  q: Quit"),
        ]
    };

    let help = Paragraph::new(lines)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().title(" Help ").borders(Borders::ALL));

    frame.render_widget(help, area);
}

/// Color for the condition register.
fn condition_style(cond: Condition) -> Style {
    match cond {
        Condition::Negative => Style::default().fg(Color::Red),
        Condition::Zero => Style::default().fg(Color::Gray),
        Condition::Positive => Style::default().fg(Color::Green),
    }
}

fn state_style(state: MachineState) -> Style {
    match state {
        MachineState::Running => Style::default().fg(Color::Green),
        MachineState::Halted => Style::default().fg(Color::Cyan),
        MachineState::Faulted => Style::default().fg(Color::Red),
    }
}
