//! Plain-text rendering of a ranked leaderboard.

use std::fmt::Write;

use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};

use crate::dao::models::{Board, LeaderboardRow};

const HEADER_TIMESTAMP: &[FormatItem<'static>] =
    format_description!("[hour]:[minute] [day].[month].[year]");

/// Exactly `limit` numbered lines: occupied ranks first, then placeholders.
///
/// Rows past `limit` are ignored.
pub fn render(rows: &[LeaderboardRow], limit: usize) -> String {
    let mut lines = Vec::with_capacity(limit);
    for (index, row) in rows.iter().take(limit).enumerate() {
        lines.push(format!(
            "{}. {:.3} - {}, group {}",
            index + 1,
            row.best_time,
            row.display_name(),
            row.group
        ));
    }
    for rank in lines.len() + 1..=limit {
        lines.push(format!("{rank}. (place not taken)"));
    }
    lines.join("\n")
}

/// Two header lines naming the club, the moment of rendering and the board.
pub fn render_header(club: &str, board: Board, at: OffsetDateTime) -> String {
    let mut header = String::new();
    let stamp = at
        .format(HEADER_TIMESTAMP)
        .unwrap_or_else(|_| at.date().to_string());
    let _ = writeln!(header, "Leaderboard {club} as of {stamp}");
    let _ = write!(
        header,
        "{}, {}, {}",
        board.simulator.label(),
        board.mode.label().to_lowercase(),
        board.track.label()
    );
    header
}
