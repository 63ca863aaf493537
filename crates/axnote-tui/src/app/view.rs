//! Ratatui rendering of the notebook: status line, cell list, add-cell
//! placeholder, and the keyboard-help overlay. Rendering also produces the
//! [`LayoutMap`] the click router uses to hit-test mouse events back onto
//! cells and toolbar controls.

use std::ops::Range;

use axnote_core::{CellAction, FocusTarget, Keymap, OutputState, Region, Session};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::app_state::SystemStatus;

/// Everything the draw pass needs, cloned out of shared state so no lock is
/// held while rendering.
pub struct Snapshot {
    pub session: Session,
    pub system: SystemStatus,
    pub edit: Option<EditView>,
    pub help_open: bool,
    pub notice: Option<Notice>,
    pub scroll: u16,
}

/// Local view of the in-progress edit buffer (which leads the shared state
/// until it is committed).
pub struct EditView {
    pub index: usize,
    pub text: String,
    pub cursor: usize,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub is_error: bool,
}

/// What a mouse click landed on.
#[derive(Debug, Clone, Copy)]
pub enum Hit {
    Button { index: usize, action: CellAction },
    CellContent { index: usize },
    AddCell,
}

#[derive(Debug, Clone, Default)]
struct LineTag {
    cell: Option<usize>,
    add_cell: bool,
    buttons: Vec<(Range<u16>, CellAction)>,
}

/// Row-by-row map of the last rendered body, for the click router.
#[derive(Debug, Clone, Default)]
pub struct LayoutMap {
    body: Rect,
    pub scroll: u16,
    lines: Vec<LineTag>,
}

impl LayoutMap {
    pub fn hit(&self, column: u16, row: u16) -> Option<Hit> {
        if !self.body.contains(Position::new(column, row)) {
            return None;
        }
        let line = (row - self.body.y) as usize + self.scroll as usize;
        let tag = self.lines.get(line)?;
        for (range, action) in &tag.buttons {
            if range.contains(&column) {
                return tag.cell.map(|index| Hit::Button {
                    index,
                    action: *action,
                });
            }
        }
        if tag.add_cell {
            return Some(Hit::AddCell);
        }
        tag.cell.map(|index| Hit::CellContent { index })
    }
}

const INDENT: &str = "    ";
const FOCUS_MARK: &str = "  > ";

struct BodyBuilder {
    lines: Vec<Line<'static>>,
    tags: Vec<LineTag>,
    focus_line: Option<usize>,
    cursor_line: Option<(usize, usize)>, // (body line, column)
}

impl BodyBuilder {
    fn new() -> Self {
        BodyBuilder {
            lines: Vec::new(),
            tags: Vec::new(),
            focus_line: None,
            cursor_line: None,
        }
    }

    fn push(&mut self, line: Line<'static>, tag: LineTag) {
        self.lines.push(line);
        self.tags.push(tag);
    }

    fn blank(&mut self) {
        self.push(Line::raw(""), LineTag::default());
    }

    fn mark_focus(&mut self) {
        if self.focus_line.is_none() {
            self.focus_line = Some(self.lines.len());
        }
    }
}

fn region_prefix(focused: bool) -> &'static str {
    if focused { FOCUS_MARK } else { INDENT }
}

fn toolbar_line(
    builder: &mut BodyBuilder,
    body: Rect,
    index: usize,
    session: &Session,
    focused_region: Option<Region>,
) {
    let cell = session.document.get(index).expect("cell index in range");
    let focused = focused_region == Some(Region::Toolbar);
    if focused {
        builder.mark_focus();
    }

    let mut text = String::new();
    text.push_str(if focused { "> " } else { "  " });
    text.push_str(&format!("Cell {} ({})", index + 1, cell.cell_type.label()));
    if cell.is_busy() {
        text.push_str("  Executing...");
    } else if cell.shows_edit_affordance() {
        text.push_str("  (enter to edit)");
    }

    let mut buttons: Vec<(Range<u16>, CellAction)> = Vec::new();
    let labelled: &[(&str, CellAction)] = &[
        ("Run", CellAction::Execute),
        ("Edit", CellAction::EnterEdit),
        ("Cut", CellAction::Cut),
        ("Before", CellAction::InsertBefore),
        ("After", CellAction::InsertAfter),
        ("Type", CellAction::ToggleType),
    ];
    for (label, action) in labelled {
        // The run trigger is disabled while its request is in flight.
        if *action == CellAction::Execute && cell.is_busy() {
            continue;
        }
        text.push_str("  [");
        let start = body.x + text.len() as u16;
        text.push_str(label);
        let end = body.x + text.len() as u16;
        text.push(']');
        buttons.push((start..end, *action));
    }

    let style = if focused {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::DIM)
    };
    builder.push(
        Line::styled(text, style),
        LineTag {
            cell: Some(index),
            add_cell: false,
            buttons,
        },
    );
}

fn source_lines(
    builder: &mut BodyBuilder,
    index: usize,
    text: &str,
    cursor: Option<usize>,
    focused: bool,
) {
    if focused {
        builder.mark_focus();
    }
    let cursor_pos = cursor.map(|at| {
        let before = &text[..at];
        let line = before.matches('\n').count();
        let column = before
            .rsplit('\n')
            .next()
            .map(|tail| tail.chars().count())
            .unwrap_or(0);
        (line, column)
    });

    for (offset, source_line) in text.split('\n').enumerate() {
        let prefix = if focused && offset == 0 {
            FOCUS_MARK
        } else {
            INDENT
        };
        if let Some((cursor_line, cursor_col)) = cursor_pos {
            if cursor_line == offset {
                builder.cursor_line = Some((builder.lines.len(), INDENT.len() + cursor_col));
            }
        }
        builder.push(
            Line::raw(format!("{prefix}{source_line}")),
            LineTag {
                cell: Some(index),
                ..Default::default()
            },
        );
    }
}

fn output_lines(
    builder: &mut BodyBuilder,
    body: Rect,
    index: usize,
    output: &OutputState,
    focused: bool,
) {
    if focused {
        builder.mark_focus();
    }
    let text = match output {
        OutputState::Empty => "(No output yet)".to_string(),
        other => other.text().into_owned(),
    };
    let style = if output.is_error() {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };

    let width = body.width.saturating_sub(INDENT.len() as u16).max(16) as usize;
    let mut first = true;
    for raw_line in text.split('\n') {
        let wrapped = textwrap::wrap(raw_line, width);
        let segments: Vec<&str> = if wrapped.is_empty() {
            vec![""]
        } else {
            wrapped.iter().map(|cow| cow.as_ref()).collect::<Vec<_>>()
        };
        for segment in segments {
            let prefix = region_prefix(focused && first);
            first = false;
            builder.push(
                Line::styled(format!("{prefix}{segment}"), style),
                LineTag {
                    cell: Some(index),
                    ..Default::default()
                },
            );
        }
    }
}

fn status_line(snapshot: &Snapshot) -> Line<'static> {
    let kernel = if snapshot.system.lifecycle_busy {
        "Kernel: ..."
    } else if snapshot.system.kernel_alive {
        "Kernel: Running"
    } else {
        "Kernel: Not Running"
    };
    let mut spans = vec![
        Span::styled(
            format!(" {} ", snapshot.session.name),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("| "),
        Span::styled(
            kernel.to_string(),
            if snapshot.system.kernel_alive {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Yellow)
            },
        ),
    ];
    if let Some(notice) = &snapshot.notice {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            notice.text.clone(),
            if notice.is_error {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::Cyan)
            },
        ));
    }
    Line::from(spans)
}

fn help_overlay(frame: &mut Frame, area: Rect, keymap: &Keymap) {
    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::styled(
        "Cell",
        Style::default().add_modifier(Modifier::BOLD),
    ));
    for (chord, action) in keymap.cell_bindings() {
        lines.push(Line::raw(format!("  {:<18} {}", chord.to_string(), action.help())));
    }
    lines.push(Line::raw(""));
    lines.push(Line::styled(
        "Notebook",
        Style::default().add_modifier(Modifier::BOLD),
    ));
    for (chord, action) in keymap.document_bindings() {
        lines.push(Line::raw(format!("  {:<18} {}", chord.to_string(), action.help())));
    }
    lines.push(Line::raw(""));
    lines.push(Line::styled(
        "press escape to close",
        Style::default().add_modifier(Modifier::DIM),
    ));

    let height = (lines.len() as u16 + 2).min(area.height);
    let width = 64.min(area.width);
    let popup = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(Text::from(lines)).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Keyboard Shortcuts"),
        ),
        popup,
    );
}

pub fn render(frame: &mut Frame, snapshot: &Snapshot, keymap: &Keymap) -> LayoutMap {
    let [status, body, hint] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    frame.render_widget(Paragraph::new(status_line(snapshot)), status);
    frame.render_widget(
        Paragraph::new(Line::styled(
            " ? help | tab/shift+tab move | ctrl+enter run | ctrl+c quit",
            Style::default().add_modifier(Modifier::DIM),
        )),
        hint,
    );

    let session = &snapshot.session;
    let focus = session.focus();
    let mut builder = BodyBuilder::new();

    for (index, cell) in session.document.iter().enumerate() {
        let focused_region = match focus {
            FocusTarget::Cell {
                index: focused_index,
                region,
            } if focused_index == index => Some(region),
            _ => None,
        };

        toolbar_line(&mut builder, body, index, session, focused_region);

        if cell.is_editing() {
            let (text, cursor) = match &snapshot.edit {
                Some(edit) if edit.index == index => (edit.text.clone(), Some(edit.cursor)),
                _ => (cell.source.clone(), None),
            };
            let cursor = if focused_region == Some(Region::Source) {
                cursor
            } else {
                None
            };
            source_lines(
                &mut builder,
                index,
                &text,
                cursor,
                focused_region == Some(Region::Source),
            );
        }

        output_lines(
            &mut builder,
            body,
            index,
            &cell.output,
            focused_region == Some(Region::Output),
        );
        builder.blank();
    }

    let placeholder_focused = focus == FocusTarget::EndPlaceholder;
    if placeholder_focused {
        builder.mark_focus();
    }
    builder.push(
        Line::styled(
            format!("{}[ + Add cell ]", region_prefix(placeholder_focused)),
            if placeholder_focused {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::DIM)
            },
        ),
        LineTag {
            add_cell: true,
            ..Default::default()
        },
    );

    // Keep the focused region inside the viewport.
    let mut scroll = snapshot.scroll;
    if let Some(focus_line) = builder.focus_line {
        let focus_line = focus_line as u16;
        if focus_line < scroll {
            scroll = focus_line;
        } else if focus_line >= scroll + body.height {
            scroll = focus_line + 1 - body.height;
        }
    }
    let max_scroll = (builder.lines.len() as u16).saturating_sub(body.height);
    scroll = scroll.min(max_scroll);

    if let Some((line, column)) = builder.cursor_line {
        let line = line as u16;
        if line >= scroll && line < scroll + body.height {
            frame.set_cursor_position(Position::new(
                body.x + (column as u16).min(body.width.saturating_sub(1)),
                body.y + line - scroll,
            ));
        }
    }

    let tags = builder.tags.clone();
    frame.render_widget(
        Paragraph::new(Text::from(builder.lines)).scroll((scroll, 0)),
        body,
    );

    if snapshot.help_open {
        let area = frame.area();
        help_overlay(frame, area, keymap);
    }

    LayoutMap {
        body,
        scroll,
        lines: tags,
    }
}
