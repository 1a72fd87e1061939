use clap::Args;
use rustc_hash::FxHashMap;
use std::io::{self, Write};
use tracing::info;

use crate::client::InvokeClient;
use crate::{Result, ServeError};

#[derive(Args, Debug)]
pub struct InvokeArgs {
    /// Route to call, e.g. `essay`
    pub path: String,

    /// Plain text input for single-field routes
    pub text: Option<String>,

    /// Named input field, repeatable: -f topic=caching
    #[arg(short = 'f', long = "field", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,

    /// Base URL of the chainserve instance
    #[arg(long, env = "CHAINSERVE_URL", default_value = "http://127.0.0.1:8000")]
    pub server: String,
}

fn parse_field(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

/// Post the input to `/{path}/invoke` and print the output
pub async fn handle_invoke_command(args: InvokeArgs) -> Result<()> {
    let client = InvokeClient::new(&args.server)?;

    if !args.fields.is_empty() && args.text.is_some() {
        return Err(ServeError::Other(
            "Pass either a text input or --field values, not both".to_string(),
        ));
    }

    let output = if !args.fields.is_empty() {
        let fields: FxHashMap<String, String> = args.fields.into_iter().collect();
        info!("Invoking /{} with fields: {:?}", args.path, fields.keys());
        client.invoke(&args.path, &fields).await?
    } else {
        let text = match args.text {
            Some(text) => text,
            None => read_line(&args.path)?,
        };
        if text.trim().is_empty() {
            println!("No input provided");
            return Ok(());
        }
        info!("Invoking /{} with text input", args.path);
        client.invoke_text(&args.path, &text).await?
    };

    println!("{}", output);
    Ok(())
}

fn read_line(path: &str) -> Result<String> {
    print!("/{} > ", path.trim_matches('/'));
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .map_err(|e| ServeError::Other(format!("Failed to read input: {}", e)))?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field() {
        assert_eq!(
            parse_field("topic=caching").unwrap(),
            ("topic".to_string(), "caching".to_string())
        );
        assert_eq!(
            parse_field("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=x").is_err());
    }
}
