use anyhow::{Context, Result, bail};
use compound::v1::{Document, query};
use std::path::PathBuf;
use tracing::warn;

pub fn run(input: PathBuf) -> Result<()> {
    let content =
        std::fs::read_to_string(&input).with_context(|| format!("Failed to read {:?}", input))?;
    println!("{}", validate_content(&content)?);
    Ok(())
}

fn validate_content(content: &str) -> Result<String> {
    let doc = Document::from_json(content).context("Invalid JSON:API document")?;

    let duplicates = query::duplicate_included(&doc);
    if !duplicates.is_empty() {
        let keys: Vec<String> = duplicates.iter().map(ToString::to_string).collect();
        bail!("Invalid: duplicate included resources: {}", keys.join(", "));
    }

    for key in query::unresolved_linkage(&doc) {
        warn!(%key, "included resource links to a resource missing from the document");
    }

    let kind = match (&doc.data, &doc.errors) {
        (Some(_), _) => format!(
            "data document ({} primary, {} included)",
            query::primary_resources(&doc).len(),
            doc.included.len()
        ),
        (None, Some(errors)) => format!("error document ({} errors)", errors.len()),
        (None, None) => "meta document".to_string(),
    };
    Ok(format!("Valid: {}", kind))
}
