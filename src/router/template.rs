use regex::Regex;
use rustc_hash::FxHashMap;
use std::sync::LazyLock;

use crate::error::{Result, ServeError};
use crate::providers::types::{ChatMessage, Prompt, Role};

/// `{{`, `}}` or a `{placeholder}`
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{|\}\}|\{([^{}]*)\}").expect("valid placeholder regex"));

static FIELD_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid field regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MessageTemplate {
    role: Role,
    segments: Vec<Segment>,
}

impl MessageTemplate {
    fn parse(role: Role, source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(source) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            push_literal(&mut text, &source[last..whole.start()], source)?;
            last = whole.end();

            match whole.as_str() {
                "{{" => text.push('{'),
                "}}" => text.push('}'),
                _ => {
                    let name = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
                    if !FIELD_NAME.is_match(name) {
                        return Err(ServeError::InvalidTemplate(format!(
                            "invalid placeholder '{}' in \"{}\"",
                            whole.as_str(),
                            source
                        )));
                    }
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Field(name.to_string()));
                }
            }
        }

        push_literal(&mut text, &source[last..], source)?;
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Ok(Self { role, segments })
    }

    fn render(&self, fields: &FxHashMap<String, String>) -> Result<ChatMessage> {
        let mut content = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => content.push_str(text),
                Segment::Field(name) => match fields.get(name) {
                    Some(value) => content.push_str(value),
                    None => return Err(ServeError::MissingField(name.clone())),
                },
            }
        }
        Ok(ChatMessage::new(self.role, content))
    }
}

fn push_literal(buf: &mut String, literal: &str, source: &str) -> Result<()> {
    if literal.contains(['{', '}']) {
        return Err(ServeError::InvalidTemplate(format!(
            "unbalanced brace in \"{}\"",
            source
        )));
    }
    buf.push_str(literal);
    Ok(())
}

/// Ordered chat messages with `{field}` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    messages: Vec<MessageTemplate>,
}

impl PromptTemplate {
    /// Single user message template
    pub fn from_template(template: &str) -> Result<Self> {
        Self::from_messages([(Role::User, template)])
    }

    pub fn from_messages<'a, I>(messages: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Role, &'a str)>,
    {
        let messages = messages
            .into_iter()
            .map(|(role, source)| MessageTemplate::parse(role, source))
            .collect::<Result<Vec<_>>>()?;

        if messages.is_empty() {
            return Err(ServeError::InvalidTemplate(
                "template has no messages".to_string(),
            ));
        }

        Ok(Self { messages })
    }

    /// Distinct placeholder names, in order of first appearance
    pub fn input_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        for message in &self.messages {
            for segment in &message.segments {
                if let Segment::Field(name) = segment
                    && !fields.contains(&name.as_str())
                {
                    fields.push(name);
                }
            }
        }
        fields
    }

    /// Substitute every placeholder. Fails on the first one with no value.
    pub fn render(&self, fields: &FxHashMap<String, String>) -> Result<Prompt> {
        let messages = self
            .messages
            .iter()
            .map(|message| message.render(fields))
            .collect::<Result<Vec<_>>>()?;
        Ok(Prompt::new(messages))
    }
}
