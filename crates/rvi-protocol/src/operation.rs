//! Pipeline operations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Shell used to run a [`Operation::ShellInvocation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpreter {
    /// POSIX `sh -c`.
    Posix,
    /// The worker platform's native shell (`cmd /C` on Windows).
    Native,
}

/// One unit of remote work. Operations run strictly in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    /// Run a command line in the sandbox root.
    ShellInvocation {
        interpreter: Interpreter,
        command_line: String,
    },
    /// Reset sandbox permissions to the baseline. Restored snapshots carry
    /// no mode bits, so scripts need this before they can be executed.
    EnvironmentReset,
}

impl Operation {
    /// A POSIX shell invocation.
    pub fn bash(command_line: impl Into<String>) -> Self {
        Self::ShellInvocation {
            interpreter: Interpreter::Posix,
            command_line: command_line.into(),
        }
    }

    /// A native shell invocation.
    pub fn native(command_line: impl Into<String>) -> Self {
        Self::ShellInvocation {
            interpreter: Interpreter::Native,
            command_line: command_line.into(),
        }
    }

    pub fn reset() -> Self {
        Self::EnvironmentReset
    }

    /// Command line, if this operation has one.
    pub fn command_line(&self) -> Option<&str> {
        match self {
            Self::ShellInvocation { command_line, .. } => Some(command_line),
            Self::EnvironmentReset => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShellInvocation {
                interpreter: Interpreter::Posix,
                command_line,
            } => write!(f, "sh: {}", command_line),
            Self::ShellInvocation {
                interpreter: Interpreter::Native,
                command_line,
            } => write!(f, "native: {}", command_line),
            Self::EnvironmentReset => write!(f, "environment reset"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        assert_eq!(
            serde_json::to_value(Operation::bash("make firmware.bin")).unwrap(),
            json!({"kind": "shell_invocation", "interpreter": "posix", "command_line": "make firmware.bin"})
        );
        assert_eq!(
            serde_json::to_value(Operation::reset()).unwrap(),
            json!({"kind": "environment_reset"})
        );
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let result: Result<Operation, _> =
            serde_json::from_value(json!({"kind": "reboot", "command_line": "now"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Operation::bash("./1.sh").to_string(), "sh: ./1.sh");
        assert_eq!(Operation::native("1.cmd").to_string(), "native: 1.cmd");
        assert_eq!(Operation::reset().command_line(), None);
    }
}
