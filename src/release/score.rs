//! Candidate-to-target match scoring.
//!
//! Pure accumulator over the structured fields of two [`ParsedRelease`]
//! values. An exact content-hash match short-circuits to the maximum score;
//! metadata evidence never enters into it.

use super::ParsedRelease;

/// Score awarded to exact content-hash matches.
pub const EXACT_HASH_SCORE: u8 = 100;

const GROUP_POINTS: u8 = 40;
const QUALITY_POINTS: u8 = 20;
const SOURCE_POINTS: u8 = 15;
const CODEC_POINTS: u8 = 10;
const TOKEN_BONUS_CAP: usize = 5;

/// Score a candidate release against the parsed target, in [0, 100].
///
/// Points accumulate only when *both* sides carry a field and the values
/// match; absence on either side contributes nothing.
pub fn score(candidate: &ParsedRelease, target: &ParsedRelease, exact_hash_match: bool) -> u8 {
    if exact_hash_match {
        return EXACT_HASH_SCORE;
    }

    let mut total = 0u8;

    if let (Some(a), Some(b)) = (&candidate.group, &target.group) {
        if a.eq_ignore_ascii_case(b) {
            total += GROUP_POINTS;
        }
    }
    if let (Some(a), Some(b)) = (candidate.quality, target.quality) {
        if a == b {
            total += QUALITY_POINTS;
        }
    }
    if let (Some(a), Some(b)) = (candidate.source, target.source) {
        if a == b {
            total += SOURCE_POINTS;
        }
    }
    if let (Some(a), Some(b)) = (candidate.codec, target.codec) {
        if a == b {
            total += CODEC_POINTS;
        }
    }

    let common = candidate.tokens.intersection(&target.tokens).count();
    total += common.min(TOKEN_BONUS_CAP) as u8;

    total
}
