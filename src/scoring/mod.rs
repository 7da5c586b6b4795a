pub mod arith;
pub mod engine;
pub mod line_score;
pub mod locks;
pub mod scorer;

pub use arith::{gcd, lcm, lcm_of_list};
pub use engine::{compute_snapshot, route_share, to_points, RouteShare, ScoreSnapshot, POINTS_SCALE};
pub use line_score::{standard_line_score, FLAT_LINE_SCORE, FLAT_LINE_SCORE_THRESHOLD};
pub use locks::{RoomGuard, RoomLocks};
pub use scorer::{RecomputeOutcome, Scorer};
