//! Visit log entries.

use serde::{Deserialize, Serialize};

/// Direction of a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// On the way down, towards the terminal (the terminal itself included).
    Descending,
    /// On the way back up, away from the terminal.
    Ascending,
}

impl Direction {
    /// Returns the snake_case label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Descending => "descending",
            Self::Ascending => "ascending",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One traversal of a station or the terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    /// Human-readable name of the traversed component.
    pub description: String,
    /// Which leg of the traversal this was.
    pub direction: Direction,
    /// Messages the component logged while it ran.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<String>,
}

impl Visit {
    /// Creates a visit with no log messages.
    #[must_use]
    pub fn new(description: impl Into<String>, direction: Direction) -> Self {
        Self {
            description: description.into(),
            direction,
            logs: Vec::new(),
        }
    }

    /// Returns `true` for a descending visit.
    #[must_use]
    pub fn is_descending(&self) -> bool {
        self.direction == Direction::Descending
    }
}

impl std::fmt::Display for Visit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let arrow = match self.direction {
            Direction::Descending => "v",
            Direction::Ascending => "^",
        };
        write!(f, "{arrow} {}", self.description)?;
        for line in &self.logs {
            write!(f, " | {line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_logs() {
        let mut visit = Visit::new("security", Direction::Descending);
        visit.logs.push("token accepted".to_string());
        assert_eq!(visit.to_string(), "v security | token accepted");
    }

    #[test]
    fn test_direction_serializes_snake_case() {
        let json = serde_json::to_string(&Direction::Ascending).expect("should serialize");
        assert_eq!(json, "\"ascending\"");
    }
}
