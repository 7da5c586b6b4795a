pub mod formatter;

pub use formatter::{
    format_leaderboard, format_leaderboard_tsv, format_member_list, format_points,
    format_room_list, format_route_board, format_route_list, should_use_colors,
};
