//! Structured arguments handed to an invoked package

use crate::error::DxResult;
use serde::Serialize;
use serde_json::{Map, Value};

/// `{ "command": ..., "args": [...], "options": {...} }`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommandOptions {
    pub command: String,
    pub args: Vec<String>,
    pub options: Map<String, Value>,
}

impl CommandOptions {
    /// Build from the raw arguments that followed the command name.
    ///
    /// `--name=value` sets a string, `--name` sets `true` and `--no-name`
    /// sets `false`. Short flags (`-f`) set `true`. Flag names are converted
    /// to camelCase. Everything after a bare `--` is positional.
    pub fn parse(command: impl Into<String>, raw: &[String]) -> Self {
        let mut parsed = Self {
            command: command.into(),
            ..Self::default()
        };

        let mut iter = raw.iter();
        while let Some(arg) = iter.next() {
            if arg == "--" {
                parsed.args.extend(iter.by_ref().cloned());
                break;
            }

            if let Some(flag) = arg.strip_prefix("--") {
                match flag.split_once('=') {
                    Some((name, value)) => parsed.set(name, Value::String(value.to_string())),
                    None => match flag.strip_prefix("no-") {
                        Some(name) if !name.is_empty() => parsed.set(name, Value::Bool(false)),
                        _ => parsed.set(flag, Value::Bool(true)),
                    },
                }
            } else if arg.len() > 1 && arg.starts_with('-') && !is_number(arg) {
                for short in arg[1..].chars() {
                    parsed.set(&short.to_string(), Value::Bool(true));
                }
            } else {
                parsed.args.push(arg.clone());
            }
        }

        parsed
    }

    /// Set an option unless its key is reserved
    pub fn set(&mut self, name: &str, value: Value) {
        let key = camel_case(name);
        if key.is_empty() || is_reserved(&key) {
            return;
        }
        self.options.insert(key, value);
    }

    /// Serialize for the child process
    pub fn to_json(&self) -> DxResult<String> {
        let mut clean = self.clone();
        clean.options.retain(|key, _| !is_reserved(key));
        Ok(serde_json::to_string(&clean)?)
    }
}

/// Keys that belong to the front-end's own bookkeeping, never to the command
fn is_reserved(key: &str) -> bool {
    key.starts_with('_') || key == "parent"
}

/// Digit-led numerals only; `-inf` and `-nan` are flag clusters
fn is_number(arg: &str) -> bool {
    let digits = arg.trim_start_matches('-').trim_start_matches('.');
    digits.starts_with(|c: char| c.is_ascii_digit()) && arg.parse::<f64>().is_ok()
}

fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '-' && !out.is_empty() {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
