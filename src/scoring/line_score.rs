use super::arith::lcm_of_list;

/// L used when a room has no normal-class members.
pub const EMPTY_ROOM_LINE_SCORE: u32 = 1;

/// Normal-class roster size from which L stops following LCM(1..n).
pub const FLAT_LINE_SCORE_THRESHOLD: usize = 8;

/// L for rosters at or above [`FLAT_LINE_SCORE_THRESHOLD`].
pub const FLAT_LINE_SCORE: u32 = 1000;

/// Standard line score L for a room with `normal_members` normal-class members.
///
/// Below the threshold L is LCM(1..=n), so any number of co-completers up to
/// n splits it evenly. At 8 and above the LCM grows too fast and a flat
/// 1000 is used instead.
pub fn standard_line_score(normal_members: usize) -> u32 {
    match normal_members {
        0 => EMPTY_ROOM_LINE_SCORE,
        n if n >= FLAT_LINE_SCORE_THRESHOLD => FLAT_LINE_SCORE,
        n => {
            let values: Vec<u64> = (1..=n as u64).collect();
            // LCM(1..=7) = 420, always fits
            lcm_of_list(&values)
                .and_then(|l| u32::try_from(l).ok())
                .unwrap_or(FLAT_LINE_SCORE)
        }
    }
}
