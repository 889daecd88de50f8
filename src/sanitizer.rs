//! Command Sanitizer (spec §4.1) — a pure function of (command string,
//! active policy). The only component that enforces safety policy; every
//! command-producing path routes through [`sanitize`] immediately before
//! dispatch (invariant 2, "Sanitizer totality").
//!
//! Grounded in the structure of a permission predicate module: a small set
//! of ordered, short-circuiting checks plus a frozen denylist table, tested
//! exhaustively inline.

use crate::config::SafetyConfig;
use regex::Regex;
use std::sync::OnceLock;

/// First-token verbs that are always destructive, closed set (spec §4.1.3).
/// Checked against the command's first whitespace-delimited token, with the
/// leading `/` stripped.
const DANGEROUS_VERBS: &[&str] = &[
    "regen",
    "/regen",
    "worldedit:regen",
    "mvdel",
    "mvworld",
    "chunky",
    "removeall",
    "butcher",
    "op",
    "deop",
    "stop",
];

/// Substrings that, anywhere in a dangerous-looking command, mark a "remove
/// above/below/near" sweep regardless of the exact plugin syntax used.
const DANGEROUS_SWEEP_PATTERNS: &[&str] = &[
    "removeabove",
    "removebelow",
    "removenear",
    "remove above",
    "remove below",
    "remove near",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanitizeResult {
    Accepted,
    Rejected { reason: String },
}

impl SanitizeResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SanitizeResult::Accepted)
    }
}

static SHELL_META_RE: OnceLock<Regex> = OnceLock::new();

fn shell_meta_regex() -> &'static Regex {
    SHELL_META_RE.get_or_init(|| {
        // Sequences that could escape the chat-command grammar: shell
        // chaining/piping/substitution tokens and backtick execution.
        Regex::new(r"(\$\(|`|\|\||&&|;\s*\S|>\s*[/\\]|<\s*[/\\])").expect("static regex")
    })
}

/// Best-effort integer-triple scanner used by the coordinate guard. Matches
/// `x y z` (vanilla) and `x,y,z` (large-region) shaped runs of three signed
/// integers anywhere in the command string.
fn find_coordinate_triples(command: &str) -> Vec<(i64, i64, i64)> {
    let mut found = Vec::new();
    let tokens: Vec<&str> = command.split_whitespace().collect();

    // vanilla: three consecutive space-separated integer tokens.
    for w in tokens.windows(3) {
        if let (Ok(x), Ok(y), Ok(z)) = (w[0].parse::<i64>(), w[1].parse::<i64>(), w[2].parse::<i64>()) {
            found.push((x, y, z));
        }
    }

    // large-region: comma-separated integer triples, e.g. "100,64,200".
    for part in command.split_whitespace() {
        let nums: Vec<&str> = part.split(',').collect();
        if nums.len() == 3 {
            if let (Ok(x), Ok(y), Ok(z)) =
                (nums[0].parse::<i64>(), nums[1].parse::<i64>(), nums[2].parse::<i64>())
            {
                found.push((x, y, z));
            }
        }
    }

    found
}

fn first_token(command: &str) -> String {
    command
        .trim()
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_start_matches('/')
        .to_ascii_lowercase()
}

/// Run the four ordered checks from spec §4.1, short-circuiting on the
/// first failure.
pub fn sanitize(command: &str, policy: &SafetyConfig) -> SanitizeResult {
    let trimmed = command.trim();

    // 1. length.
    if trimmed.is_empty() || trimmed.len() > policy.max_command_length {
        return SanitizeResult::Rejected {
            reason: "length".to_string(),
        };
    }

    // 2. syntactic filter.
    if policy.safety_checks_on {
        if trimmed.contains('\0') || trimmed.contains('\n') || trimmed.contains('\r') {
            return SanitizeResult::Rejected {
                reason: "control character".to_string(),
            };
        }
        if has_unbalanced_quoting(trimmed) {
            return SanitizeResult::Rejected {
                reason: "unbalanced quoting".to_string(),
            };
        }
        if shell_meta_regex().is_match(trimmed) {
            return SanitizeResult::Rejected {
                reason: "shell metacharacters".to_string(),
            };
        }
    }

    // 3. destructive-operation denylist.
    if !policy.dangerous_allowed {
        let verb = first_token(trimmed);
        if DANGEROUS_VERBS.iter().any(|v| v.trim_start_matches('/') == verb) {
            return SanitizeResult::Rejected {
                reason: "dangerous operation".to_string(),
            };
        }
        let lowered = trimmed.to_ascii_lowercase();
        if DANGEROUS_SWEEP_PATTERNS.iter().any(|p| lowered.contains(p)) {
            return SanitizeResult::Rejected {
                reason: "dangerous operation".to_string(),
            };
        }
    }

    // 4. coordinate guard.
    if let Some(build_box) = &policy.build_box {
        for (x, y, z) in find_coordinate_triples(trimmed) {
            if !build_box.contains(x, y, z) {
                return SanitizeResult::Rejected {
                    reason: "coordinate out of bounds".to_string(),
                };
            }
        }
    }

    SanitizeResult::Accepted
}

fn has_unbalanced_quoting(s: &str) -> bool {
    let double = s.chars().filter(|&c| c == '"').count();
    let single = s.chars().filter(|&c| c == '\'').count();
    double % 2 != 0 || single % 2 != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildBox;

    fn policy() -> SafetyConfig {
        SafetyConfig {
            safety_checks_on: true,
            dangerous_allowed: false,
            max_command_length: 64,
            build_box: None,
        }
    }

    #[test]
    fn accepts_ordinary_command() {
        let result = sanitize("/setblock 100 64 200 stone", &policy());
        assert_eq!(result, SanitizeResult::Accepted);
    }

    #[test]
    fn rejects_empty_and_whitespace_only() {
        assert!(!sanitize("", &policy()).is_accepted());
        assert!(!sanitize("   ", &policy()).is_accepted());
    }

    #[test]
    fn rejects_over_length() {
        let long = "/setblock ".to_string() + &"0 ".repeat(100);
        assert!(!sanitize(&long, &policy()).is_accepted());
    }

    #[test]
    fn rejects_dangerous_verbs_unless_allowed() {
        assert_eq!(
            sanitize("//regen", &policy()),
            SanitizeResult::Rejected { reason: "dangerous operation".to_string() }
        );
        let mut allowed = policy();
        allowed.dangerous_allowed = true;
        assert!(sanitize("//regen", &allowed).is_accepted());
    }

    #[test]
    fn rejects_op_deop_stop() {
        assert!(!sanitize("/op griefer", &policy()).is_accepted());
        assert!(!sanitize("/deop griefer", &policy()).is_accepted());
        assert!(!sanitize("/stop", &policy()).is_accepted());
    }

    #[test]
    fn rejects_removeall_sweep() {
        assert!(!sanitize("/removenear entity 50", &policy()).is_accepted());
    }

    #[test]
    fn rejects_shell_metacharacters_when_safety_on() {
        assert!(!sanitize("/say hi `whoami`", &policy()).is_accepted());
        assert!(!sanitize("/say hi && rm -rf /", &policy()).is_accepted());
    }

    #[test]
    fn allows_shell_lookalikes_when_safety_off() {
        let mut p = policy();
        p.safety_checks_on = false;
        assert!(sanitize("/say hi `whoami`", &p).is_accepted());
    }

    #[test]
    fn rejects_unbalanced_quotes() {
        assert!(!sanitize("/say \"hello", &policy()).is_accepted());
    }

    #[test]
    fn coordinate_guard_rejects_out_of_bounds_vanilla() {
        let mut p = policy();
        p.build_box = Some(BuildBox { min_x: 0, min_y: 0, min_z: 0, max_x: 10, max_y: 255, max_z: 10 });
        assert!(!sanitize("/setblock 100 64 200 stone", &p).is_accepted());
        assert!(sanitize("/setblock 5 64 5 stone", &p).is_accepted());
    }

    #[test]
    fn coordinate_guard_rejects_out_of_bounds_large_region() {
        let mut p = policy();
        p.max_command_length = 200;
        p.build_box = Some(BuildBox { min_x: 0, min_y: 0, min_z: 0, max_x: 10, max_y: 255, max_z: 10 });
        assert!(!sanitize("//pos1 100,64,200", &p).is_accepted());
    }

    #[test]
    fn coordinate_guard_ignores_unparseable_numerics() {
        let mut p = policy();
        p.build_box = Some(BuildBox { min_x: 0, min_y: 0, min_z: 0, max_x: 10, max_y: 255, max_z: 10 });
        // "v1 2 3" is not a clean integer triple (first token has a letter);
        // it must not be treated as evidence of a violation.
        assert!(sanitize("/version v1 2 3", &p).is_accepted());
    }

    #[test]
    fn totality_always_terminates_with_accept_or_reject() {
        for s in ["", "a", "/give @p diamond 64", "//regen", "/op x", "\"unterminated"] {
            match sanitize(s, &policy()) {
                SanitizeResult::Accepted | SanitizeResult::Rejected { .. } => {}
            }
        }
    }
}
