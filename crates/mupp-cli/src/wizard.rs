use serde_json::Value;

use mupp_schema::{EntityKind, RenderPayload};

/// Controls which bits of state the fill wizard prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: field prompts only.
    Clean,
    /// Verbose output: progress, field list, error details.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Presenter responsible for printing prompts and progress while a form is
/// being filled.
pub struct FillPresenter {
    verbosity: Verbosity,
    header_printed: bool,
}

impl FillPresenter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            header_printed: false,
        }
    }

    pub fn show_header(&mut self, payload: &RenderPayload) {
        if self.header_printed {
            return;
        }
        println!("Filling form with {} field(s)", payload.total);
        self.header_printed = true;
    }

    pub fn show_progress(&self, payload: &RenderPayload) {
        if self.verbosity.is_verbose() {
            println!("Answered: {}/{}", payload.answered, payload.total);
            for field in &payload.fields {
                let mut entry = format!(" - {} [{}]", field.label, field.kind.display_name());
                if field.required {
                    entry.push_str(" *");
                }
                println!("{entry}");
            }
        }
    }

    pub fn show_prompt(&self, prompt: &PromptContext) {
        let mut line = format!("{}/{} {}", prompt.index, prompt.total, prompt.label);
        if prompt.required {
            line.push_str(" *");
        }
        if let Some(hint) = &prompt.hint {
            line.push(' ');
            line.push_str(hint);
        }
        println!("{line}");
        if let Some(default) = &prompt.default {
            println!("  (enter to keep {})", value_to_display(default));
        }
    }

    pub fn show_validation_error(&self, message: &str) {
        eprintln!("Invalid answer: {message}");
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if self.verbosity.is_verbose()
            && let Some(debug) = &error.debug_message
        {
            eprintln!("  Expected: {debug}");
        }
    }

    pub fn show_completion(&self, answers: &serde_json::Map<String, Value>) {
        println!("Done ✅");
        if self.verbosity.is_verbose() {
            match serde_json::to_string_pretty(answers) {
                Ok(pretty) => println!("{pretty}"),
                Err(err) => eprintln!("Failed to serialize answers to JSON: {err}"),
            }
        }
    }
}

/// Context used to format a single field prompt.
pub struct PromptContext {
    pub index: usize,
    pub total: usize,
    pub label: String,
    pub required: bool,
    pub hint: Option<String>,
    pub default: Option<Value>,
}

impl PromptContext {
    pub fn new(
        index: usize,
        total: usize,
        label: &str,
        kind: EntityKind,
        required: bool,
        default: Option<Value>,
    ) -> Self {
        Self {
            index,
            total,
            label: label.to_string(),
            required,
            hint: kind_hint(kind),
            default,
        }
    }
}

fn kind_hint(kind: EntityKind) -> Option<String> {
    match kind {
        EntityKind::TextField => None,
        EntityKind::NumberScale => Some("(whole number)".to_string()),
        EntityKind::Boolean | EntityKind::IsLeader => {
            Some("(yes/no, y/n, true/false)".to_string())
        }
    }
}

/// Error produced when parsing a typed answer from the terminal.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}

/// Parses a raw terminal line into an answer value for the given kind.
///
/// An empty line means "keep the current value" and maps to `None`.
pub fn parse_answer(kind: EntityKind, raw: &str) -> Result<Option<Value>, AnswerParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match kind {
        EntityKind::TextField => Ok(Some(Value::String(trimmed.to_string()))),
        EntityKind::NumberScale => trimmed
            .parse::<i64>()
            .map(|value| Some(Value::from(value)))
            .map_err(|_| {
                AnswerParseError::new(
                    "Please enter a whole number.",
                    Some("expected integer".to_string()),
                )
            }),
        EntityKind::Boolean | EntityKind::IsLeader => parse_boolean(trimmed).map(Some),
    }
}

fn parse_boolean(raw: &str) -> Result<Value, AnswerParseError> {
    match raw.to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(Value::Bool(true)),
        "false" | "f" | "no" | "n" | "0" => Ok(Value::Bool(false)),
        _ => Err(AnswerParseError::new(
            "Please enter yes or no.",
            Some("expected boolean (y/n/true/false)".to_string()),
        )),
    }
}

fn value_to_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(num) => num.to_string(),
        other => other.to_string(),
    }
}
