use crate::ast::Command;

/// Serialize a parsed command AST to a JSON string.
pub fn serialize_command(cmd: &Command) -> Result<String, serde_json::Error> {
    serde_json::to_string(cmd)
}

/// Serialize a whole parsed program (one entry per top-level command).
pub fn serialize_program(cmds: &[Command]) -> Result<String, serde_json::Error> {
    serde_json::to_string(cmds)
}
