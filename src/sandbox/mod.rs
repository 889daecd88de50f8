//! Sandbox (spec §4.3) — runs a restricted build script and returns the
//! command list it produces, or a descriptive error. No embedded scripting
//! engine: the allowed surface is narrow enough to lex, parse, and
//! tree-walk directly, so that's what this module does.

mod interpreter;
mod lexer;
mod parser;

use crate::error::VibeCraftError;

pub const MAX_LOOP_ITERATIONS: u64 = 100_000;
pub const MAX_EMITTED_COMMANDS: usize = 10_000;
pub const MAX_WALL_CLOCK: std::time::Duration = std::time::Duration::from_secs(5);

/// Run `source`, returning the named list of command strings it produces.
pub fn run(source: &str, output_name: &str) -> Result<Vec<String>, VibeCraftError> {
    let tokens = lexer::lex(source).map_err(VibeCraftError::SandboxViolation)?;
    let program = parser::parse(tokens).map_err(VibeCraftError::SandboxViolation)?;
    interpreter::run(&program, output_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_for_loop_builds_command_list() {
        let src = r#"
commands = []
for i in range(3):
    commands.append("/setblock " + str(i) + " 64 0 stone")
"#;
        let out = run(src, "commands").unwrap();
        assert_eq!(
            out,
            vec![
                "/setblock 0 64 0 stone".to_string(),
                "/setblock 1 64 0 stone".to_string(),
                "/setblock 2 64 0 stone".to_string(),
            ]
        );
    }

    #[test]
    fn missing_output_name_is_error() {
        let src = "x = []\n";
        assert!(run(src, "commands").is_err());
    }

    #[test]
    fn non_list_output_is_error() {
        let src = "commands = 5\n";
        assert!(run(src, "commands").is_err());
    }

    #[test]
    fn while_loop_is_denied() {
        let src = "commands = []\nwhile true:\n    commands.append(\"x\")\n";
        assert!(run(src, "commands").is_err());
    }

    #[test]
    fn function_definition_is_denied() {
        let src = "def f():\n    return 1\ncommands = []\n";
        assert!(run(src, "commands").is_err());
    }

    #[test]
    fn dunder_attribute_access_is_denied() {
        let src = "commands = []\nx = commands.__class__\n";
        assert!(run(src, "commands").is_err());
    }

    #[test]
    fn loop_iteration_quota_is_enforced() {
        let src = "commands = []\nfor i in range(1000000):\n    commands.append(str(i))\n";
        assert!(matches!(run(src, "commands"), Err(VibeCraftError::SandboxViolation(_))));
    }

    #[test]
    fn emitted_list_length_quota_is_enforced() {
        let src = "commands = []\nfor i in range(100000):\n    commands.append(str(i))\n";
        // 100_000 iterations is within the loop quota but the append count
        // trips the 10_000 emitted-command cap around iteration 10_001.
        match run(src, "commands") {
            Err(VibeCraftError::SandboxViolation(msg)) => {
                assert!(
                    msg.contains("emitted") || msg.contains("bound"),
                    "unexpected message: {msg}"
                );
            }
            other => panic!("expected a sandbox emitted-command quota violation, got {other:?}"),
        }
    }

    #[test]
    fn math_module_functions_are_available() {
        let src = "commands = []\ncommands.append(str(sqrt(9.0)))\n";
        let out = run(src, "commands").unwrap();
        assert_eq!(out, vec!["3".to_string()]);
    }

    #[test]
    fn if_elif_else_branches() {
        let src = r#"
commands = []
for i in range(4):
    if i == 0:
        commands.append("zero")
    elif i == 1:
        commands.append("one")
    else:
        commands.append("many")
"#;
        let out = run(src, "commands").unwrap();
        assert_eq!(out, vec!["zero", "one", "many", "many"]);
    }
}
