//! Output formatting utilities for the CLI.

use serde::Serialize;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&result.to_json()).unwrap_or_default()
        );
    } else {
        println!("{}", result.to_human());
    }
}

/// Render a list as indented bullet lines under `title`, or nothing if empty.
pub fn bullet_section<T: std::fmt::Display>(title: &str, items: &[T]) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    let mut lines = vec![format!("{title}:")];
    lines.extend(items.iter().map(|item| format!("  - {item}")));
    Some(lines.join("\n"))
}
