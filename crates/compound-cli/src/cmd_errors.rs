use anyhow::{Context, Result};
use compound::v1::{Encoder, ErrorObject, SchemaContainer};
use serde::Deserialize;
use std::path::PathBuf;

/// Accepts either a bare array of error objects or `{"errors": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorsFile {
    List(Vec<ErrorObject>),
    Document { errors: Vec<ErrorObject> },
}

pub fn run(input: PathBuf, url_prefix: String, pretty: bool) -> Result<()> {
    let content =
        std::fs::read_to_string(&input).with_context(|| format!("Failed to read {:?}", input))?;
    println!("{}", encode_errors(&content, &url_prefix, pretty)?);
    Ok(())
}

fn encode_errors(content: &str, url_prefix: &str, pretty: bool) -> Result<String> {
    let file: ErrorsFile =
        serde_json::from_str(content).context("Failed to parse error objects")?;
    let errors = match file {
        ErrorsFile::List(errors) | ErrorsFile::Document { errors } => errors,
    };
    let container = SchemaContainer::new();
    let json = Encoder::new(&container)
        .with_url_prefix(url_prefix)
        .pretty(pretty)
        .encode_errors(&errors)?;
    Ok(json)
}
