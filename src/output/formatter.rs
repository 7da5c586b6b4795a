use std::io::IsTerminal;
use owo_colors::OwoColorize;
use rust_decimal::Decimal;
use terminal_size::{Width, terminal_size};

use crate::competition::{Leaderboard, RouteBoard};
use crate::config::ColorMode;
use crate::model::{Member, Room, Route};

/// Decide whether to colorize stdout for the configured mode
pub fn should_use_colors(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => std::io::stdout().is_terminal(),
    }
}

/// Format points with exactly two decimals ("6.00", "333.33")
pub fn format_points(value: Decimal) -> String {
    format!("{:.2}", value)
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate a name to fit available width, accounting for Unicode
fn truncate_name(name: &str, max_width: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_width {
        name.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// Width of the name column: longest name, capped so the row fits the terminal
fn name_column_width<'a>(names: impl Iterator<Item = &'a str>, fixed_width: usize) -> usize {
    let longest = names.map(|n| n.chars().count()).max().unwrap_or(0).max(4);
    match get_terminal_width() {
        Some(width) if width > fixed_width + 10 => longest.min(width - fixed_width),
        Some(_) => longest.min(20),
        None => longest,
    }
}

fn pad_right(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - len))
    }
}

/// Format the leaderboard as a ranked table
///
/// Header line carries the room name and L; one row per member:
/// rank, total, name, class, and optionally the completed-route count.
pub fn format_leaderboard(board: &Leaderboard, show_completed: bool, use_colors: bool) -> String {
    let header = format!("{} (L = {})", board.room_name, board.standard_line_score);
    let header = if use_colors {
        header.bold().to_string()
    } else {
        header
    };

    if board.entries.is_empty() {
        return format!("{}\nNo members yet.", header);
    }

    let total_width = board
        .entries
        .iter()
        .map(|e| format_points(e.member.total_score).len())
        .max()
        .unwrap_or(4);
    // rank "99." + space + total + 2 + class "custom" + 2 + count
    let fixed_width = 4 + total_width + 2 + 6 + 2 + if show_completed { 8 } else { 0 };
    let name_width = name_column_width(
        board.entries.iter().map(|e| e.member.name.as_str()),
        fixed_width,
    );

    let rows = board.entries.iter().map(|entry| {
        let rank = format!("{:>2}.", entry.rank);
        let total = format!("{:>width$}", format_points(entry.member.total_score), width = total_width);
        let name = pad_right(&truncate_name(&entry.member.name, name_width), name_width);
        let class = entry.member.class_label();
        let completed = if show_completed {
            format!("  {:>3} sent", entry.completed_routes)
        } else {
            String::new()
        };

        if use_colors {
            format!(
                "{} {}  {}  {}{}",
                rank.dimmed(),
                total.bold(),
                name,
                if entry.member.is_custom_calc {
                    class.yellow().to_string()
                } else {
                    class.cyan().to_string()
                },
                completed.dimmed()
            )
        } else {
            format!("{} {}  {}  {}{}", rank, total, name, class, completed)
        }
    });

    std::iter::once(header)
        .chain(rows)
        .map(|line| line.trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format routes with their completer count and per-completer share
pub fn format_route_board(board: &RouteBoard, use_colors: bool) -> String {
    let header = format!("{} (L = {})", board.room_name, board.standard_line_score);
    let header = if use_colors {
        header.bold().to_string()
    } else {
        header
    };

    if board.routes.is_empty() {
        return format!("{}\nNo routes yet.", header);
    }

    let name_width = name_column_width(board.routes.iter().map(|r| r.route.name.as_str()), 40);

    let rows = board.routes.iter().map(|summary| {
        let id = format!("{:>4}", summary.route.id.0);
        let name = pad_right(&truncate_name(&summary.route.name, name_width), name_width);
        let grade = format!("{:<6}", summary.route.grade);
        let split = if summary.completers > 0 {
            format!("{} x {}", summary.completers, format_points(summary.share))
        } else {
            "-".to_string()
        };
        let custom = if summary.custom_completers > 0 {
            format!(" (+{} custom)", summary.custom_completers)
        } else {
            String::new()
        };

        if use_colors {
            format!(
                "{}  {}  {}  {}{}",
                id.dimmed(),
                name,
                grade.cyan(),
                split.bold(),
                custom.yellow()
            )
        } else {
            format!("{}  {}  {}  {}{}", id, name, grade, split, custom)
        }
    });

    std::iter::once(header)
        .chain(rows)
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per room: id, name, L
pub fn format_room_list(rooms: &[Room], use_colors: bool) -> String {
    if rooms.is_empty() {
        return "No rooms found.".to_string();
    }

    rooms
        .iter()
        .map(|room| {
            if use_colors {
                format!(
                    "{:>4}  {}  {}",
                    room.id.0.dimmed(),
                    room.name.bold(),
                    format!("L = {}", room.standard_line_score).dimmed()
                )
            } else {
                format!("{:>4}  {}  L = {}", room.id.0, room.name, room.standard_line_score)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per member with id, class and total (for `room show`)
pub fn format_member_list(members: &[Member]) -> String {
    if members.is_empty() {
        return "No members yet.".to_string();
    }

    members
        .iter()
        .map(|m| {
            format!(
                "{:>4}  {}  {}  {}",
                m.id.0,
                m.name,
                m.class_label(),
                format_points(m.total_score)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per route with id and grade (for `room show`)
pub fn format_route_list(routes: &[Route]) -> String {
    if routes.is_empty() {
        return "No routes yet.".to_string();
    }

    routes
        .iter()
        .map(|r| format!("{:>4}  {}  {}", r.id.0, r.name, r.grade))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Leaderboard as tab-separated values for scripting
/// Columns: rank, total, name, class, completed (no headers, no colors)
pub fn format_leaderboard_tsv(board: &Leaderboard) -> String {
    board
        .entries
        .iter()
        .map(|e| {
            format!(
                "{}\t{}\t{}\t{}\t{}",
                e.rank,
                format_points(e.member.total_score),
                e.member.name,
                e.member.class_label(),
                e.completed_routes
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
