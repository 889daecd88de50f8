//! Conservative, strictly block-preserving command coalescing (spec §4.5
//! step 3). Open Question resolution (recorded in SPEC_FULL.md): only merge
//! runs of identical-block `/setblock` commands whose coordinates advance
//! by exactly one step along a single axis with the other two held fixed —
//! anything less regular is left unmerged, since "when in doubt, emit
//! unmerged" is the explicit tie-breaker.

use crate::config::WorldEditMode;
use regex::Regex;
use std::sync::OnceLock;

static SETBLOCK_RE: OnceLock<Regex> = OnceLock::new();

fn setblock_regex() -> &'static Regex {
    SETBLOCK_RE.get_or_init(|| Regex::new(r"^/setblock (-?\d+) (-?\d+) (-?\d+) (\S+)$").expect("static regex"))
}

struct Placement {
    x: i64,
    y: i64,
    z: i64,
    block: String,
}

/// Merge eligible straight-line runs of at least 3 identical-block placements
/// into a 3-command WorldEdit fill (`//pos1`, `//pos2`, `//set`). Returns the
/// input unchanged when WorldEdit emission is disabled, or when no run
/// qualifies.
pub fn coalesce_commands(commands: &[String], mode: WorldEditMode) -> Vec<String> {
    if matches!(mode, WorldEditMode::Off) {
        return commands.to_vec();
    }

    let parsed: Vec<Option<Placement>> = commands.iter().map(|c| parse_setblock(c)).collect();

    let mut out = Vec::new();
    let mut i = 0;
    while i < commands.len() {
        match &parsed[i] {
            Some(first) => {
                let mut run_end = i + 1;
                while run_end < commands.len() {
                    let Some(next) = &parsed[run_end] else { break };
                    if !is_collinear_step(&parsed, i, run_end) || next.block != first.block {
                        break;
                    }
                    run_end += 1;
                }
                let run_len = run_end - i;
                if run_len >= 3 {
                    let last = parsed[run_end - 1].as_ref().unwrap();
                    out.push(format!("//pos1 {} {} {}", first.x, first.y, first.z));
                    out.push(format!("//pos2 {} {} {}", last.x, last.y, last.z));
                    out.push(format!("//set {}", first.block));
                    i = run_end;
                } else {
                    out.push(commands[i].clone());
                    i += 1;
                }
            }
            None => {
                out.push(commands[i].clone());
                i += 1;
            }
        }
    }
    out
}

fn parse_setblock(command: &str) -> Option<Placement> {
    let caps = setblock_regex().captures(command)?;
    Some(Placement {
        x: caps[1].parse().ok()?,
        y: caps[2].parse().ok()?,
        z: caps[3].parse().ok()?,
        block: caps[4].to_string(),
    })
}

/// True when placements `[start..=end]` form a single-axis run where each
/// step advances exactly one coordinate by 1 and holds the other two fixed,
/// consistently in the same axis and direction throughout.
fn is_collinear_step(parsed: &[Option<Placement>], start: usize, end: usize) -> bool {
    if end <= start {
        return true;
    }
    let Some(a) = &parsed[start] else { return false };
    let Some(b) = &parsed[end] else { return false };
    let (dx, dy, dz) = (b.x - a.x, b.y - a.y, b.z - a.z);
    let axes_moving = [dx != 0, dy != 0, dz != 0].iter().filter(|m| **m).count();
    if axes_moving != 1 {
        return false;
    }
    let step = match (dx.signum(), dy.signum(), dz.signum()) {
        (s, 0, 0) => s,
        (0, s, 0) => s,
        (0, 0, s) => s,
        _ => return false,
    };
    if step == 0 {
        return false;
    }
    let expected_delta = end - start;
    (dx.abs() + dy.abs() + dz.abs()) as usize == expected_delta
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_a_straight_run_of_three_or_more() {
        let commands = vec![
            "/setblock 0 64 0 stone".to_string(),
            "/setblock 1 64 0 stone".to_string(),
            "/setblock 2 64 0 stone".to_string(),
            "/setblock 3 64 0 stone".to_string(),
        ];
        let merged = coalesce_commands(&commands, WorldEditMode::Auto);
        assert_eq!(merged, vec!["//pos1 0 64 0".to_string(), "//pos2 3 64 0".to_string(), "//set stone".to_string()]);
    }

    #[test]
    fn leaves_short_runs_unmerged() {
        let commands = vec!["/setblock 0 64 0 stone".to_string(), "/setblock 1 64 0 stone".to_string()];
        let merged = coalesce_commands(&commands, WorldEditMode::Auto);
        assert_eq!(merged, commands);
    }

    #[test]
    fn leaves_mixed_block_runs_unmerged() {
        let commands = vec![
            "/setblock 0 64 0 stone".to_string(),
            "/setblock 1 64 0 dirt".to_string(),
            "/setblock 2 64 0 stone".to_string(),
        ];
        let merged = coalesce_commands(&commands, WorldEditMode::Auto);
        assert_eq!(merged, commands);
    }

    #[test]
    fn worldedit_off_disables_coalescing_entirely() {
        let commands = vec![
            "/setblock 0 64 0 stone".to_string(),
            "/setblock 1 64 0 stone".to_string(),
            "/setblock 2 64 0 stone".to_string(),
        ];
        let merged = coalesce_commands(&commands, WorldEditMode::Off);
        assert_eq!(merged, commands);
    }

    #[test]
    fn non_setblock_commands_pass_through_untouched() {
        let commands = vec!["/say hello".to_string()];
        assert_eq!(coalesce_commands(&commands, WorldEditMode::Auto), commands);
    }
}
