//! Plain-text rendering of the board for terminals.

use std::fmt::Write as _;

use crate::table::FlightTable;
use crate::view::{BoardView, Element, ProgressView};

/// Characters used for the progress track.
const FILLED: char = '=';
const EMPTY: char = ' ';
const MARKER: char = '>';

/// Render the progress row as a single line `columns` characters wide.
///
/// Hidden elements are not drawn; the marker is placed from its pixel offset
/// scaled to the track width.
#[must_use]
pub fn render_progress(view: &BoardView, columns: usize) -> String {
    let columns = columns.max(10);
    let mut track: Vec<char> = vec![EMPTY; columns];

    if view.opacity(Element::Bar).is_visible() {
        let filled = scale(view.bar_width / 100.0, columns);
        for slot in track.iter_mut().take(filled) {
            *slot = FILLED;
        }
    }

    let layout = view.layout();
    if view.opacity(Element::Marker).is_visible() {
        if let Some(left) = view.marker.as_ref().and_then(|m| m.left_px) {
            let centre = left + layout.marker_width / 2.0;
            let index = scale(centre / layout.container_width, columns).min(columns - 1);
            track[index] = MARKER;
        }
    }

    let mut line = String::new();
    line.push('[');
    line.extend(track);
    line.push(']');

    if let Some(aircraft) = &view.aircraft_type {
        let _ = write!(line, " {aircraft}");
    }
    if view.opacity(Element::Text).is_visible() && !view.text_content.is_empty() {
        let _ = write!(line, " {}", view.text_content);
    }
    if view.opacity(Element::Animation).is_visible() {
        line.push_str(" ~");
    }
    line
}

/// Render the flight table with the sort indicator on the active column.
#[must_use]
pub fn render_table(table: &FlightTable) -> String {
    let headers: Vec<String> = table
        .headers()
        .iter()
        .map(|h| match h.indicator {
            Some(direction) => format!("{} {}", h.label, direction.arrow()),
            None => h.label.clone(),
        })
        .collect();

    let column_count = table
        .flights()
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(headers.len()))
        .max()
        .unwrap_or(0);

    let mut widths = vec![0usize; column_count];
    for (i, header) in headers.iter().enumerate() {
        widths[i] = widths[i].max(header.chars().count());
    }
    for row in table.flights() {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &headers, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, &rule, &widths);
    for row in table.flights() {
        push_row(&mut out, row, &widths);
    }
    out
}

/// Render the whole board: progress row, then the table if present.
#[must_use]
pub fn render_board(view: &BoardView, columns: usize) -> String {
    let mut out = render_progress(view, columns);
    out.push('\n');
    if let Some(table) = &view.table {
        out.push_str(&render_table(table));
    }
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(i, width)| {
            let cell = cells.get(i).map_or("", String::as_str);
            format!("{cell:<width$}")
        })
        .collect();
    out.push_str(line.join(" | ").trim_end());
    out.push('\n');
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn scale(fraction: f64, columns: usize) -> usize {
    (fraction.clamp(0.0, 1.0) * columns as f64).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressPlan;
    use crate::table::SortDirection;
    use crate::view::Layout;

    fn board_at(percent: f64) -> BoardView {
        let mut view = BoardView::default();
        ProgressPlan::for_percentage(percent, view.layout()).apply(&mut view);
        view.set_text("00:45 | 500 KM");
        view
    }

    #[test]
    fn test_render_hidden_board_is_empty_track() {
        let line = render_progress(&BoardView::default(), 20);
        assert_eq!(line, format!("[{}]", " ".repeat(20)));
    }

    #[test]
    fn test_render_half_way() {
        let line = render_progress(&board_at(50.0), 20);
        assert!(line.starts_with("[==========>"), "{line}");
        assert!(line.contains("00:45 | 500 KM"));
        assert!(line.ends_with('~'));
    }

    #[test]
    fn test_render_complete() {
        let line = render_progress(&board_at(100.0), 20);
        assert!(line.starts_with(&format!("[{}>]", "=".repeat(19))), "{line}");
        assert!(!line.ends_with('~'));
    }

    #[test]
    fn test_render_includes_aircraft() {
        let mut view = board_at(30.0);
        view.set_aircraft_type(Some("A320".to_string()));
        assert!(render_progress(&view, 20).contains("] A320 00:45"));
    }

    #[test]
    fn test_render_table_marks_sorted_column() {
        let mut table = FlightTable::new(
            vec!["Flight".to_string(), "Status".to_string()],
            vec![
                vec!["EZY1".to_string(), "Landed".to_string()],
                vec!["RYR22".to_string(), "Boarding".to_string()],
            ],
        );
        table.sort(1, SortDirection::Asc);

        let text = render_table(&table);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Flight | Status ▲");
        assert_eq!(lines[2], "RYR22  | Boarding");
        assert_eq!(lines[3], "EZY1   | Landed");
    }

    #[test]
    fn test_render_board_without_table() {
        let view = BoardView::new(Layout::default());
        assert_eq!(render_board(&view, 10).lines().count(), 1);
    }
}
