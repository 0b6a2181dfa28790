use crate::store::{RecordSchema, Store};
use anyhow::{Context, Result, bail};
use clap::Args;
use compound::v1::{Data, Encoder, EncoderOptions, JsonApiObject};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Record store fixture
    #[arg(short, long)]
    pub input: PathBuf,

    /// Type of the primary resource(s)
    #[arg(short = 't', long = "type")]
    pub resource_type: Option<String>,

    /// Id of a primary resource (repeat for a collection)
    #[arg(long = "id")]
    pub ids: Vec<String>,

    /// Render primary data as an array; with no --id, every record of --type
    #[arg(long)]
    pub collection: bool,

    /// Render `"data": null`
    #[arg(long, conflicts_with_all = ["resource_type", "ids", "collection"])]
    pub null: bool,

    /// Relationship path to side-load (repeatable, or comma-separated)
    #[arg(long = "include", value_delimiter = ',')]
    pub include: Vec<String>,

    /// Sparse fieldset as TYPE=field,field (repeatable)
    #[arg(long = "fields", value_parser = parse_field_set)]
    pub fields: Vec<(String, BTreeSet<String>)>,

    /// Prefix for generated links
    #[arg(long, default_value = "")]
    pub url_prefix: String,

    /// Top-level meta, as JSON
    #[arg(long, value_parser = parse_json)]
    pub meta: Option<Value>,

    /// Write a top-level jsonapi object with this version
    #[arg(long)]
    pub jsonapi_version: Option<String>,

    /// Render primary data as resource identifiers
    #[arg(long)]
    pub identifiers: bool,

    /// Output file (writes to stdout if not provided)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: EncodeArgs, pretty: bool) -> Result<()> {
    let store = Arc::new(Store::load(&args.input)?);
    let output = encode(&args, store, pretty)?;

    if let Some(path) = &args.output {
        std::fs::write(path, &output).with_context(|| format!("Failed to write {:?}", path))?;
        info!(?path, "wrote document");
    } else {
        println!("{}", output);
    }
    Ok(())
}

fn encode(args: &EncodeArgs, store: Arc<Store>, pretty: bool) -> Result<String> {
    let data = primary_data(args, &store)?;
    let container = RecordSchema::container(store);
    let encoder = Encoder::with_options(&container, options(args, pretty));

    let json = if args.identifiers {
        encoder.encode_identifiers(data)
    } else {
        encoder.encode_data(data)
    }
    .context("Failed to encode document")?;
    Ok(json)
}

fn options(args: &EncodeArgs, pretty: bool) -> EncoderOptions {
    EncoderOptions {
        url_prefix: args.url_prefix.clone(),
        include_paths: args.include.clone(),
        field_sets: args.fields.iter().cloned().collect(),
        meta: args.meta.clone(),
        jsonapi: args.jsonapi_version.as_deref().map(JsonApiObject::new),
        pretty,
        ..Default::default()
    }
}

fn primary_data(args: &EncodeArgs, store: &Store) -> Result<Data> {
    if args.null {
        return Ok(Data::Null);
    }
    let resource_type = args
        .resource_type
        .as_deref()
        .context("--type is required unless --null is given")?;

    match (args.ids.as_slice(), args.collection) {
        ([], true) => Ok(Data::Collection(
            store
                .of_type(resource_type)
                .map(|record| store.item(resource_type, &record.id))
                .collect(),
        )),
        ([], false) => bail!("--id is required unless --collection is given"),
        ([id], false) => Ok(store.item(resource_type, id).into()),
        (ids, _) => Ok(Data::Collection(
            ids.iter().map(|id| store.item(resource_type, id)).collect(),
        )),
    }
}

fn parse_field_set(s: &str) -> Result<(String, BTreeSet<String>), String> {
    let (resource_type, fields) = s
        .split_once('=')
        .ok_or_else(|| format!("expected TYPE=field,field but got {:?}", s))?;
    let fields = fields
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();
    Ok((resource_type.trim().to_string(), fields))
}

fn parse_json(s: &str) -> Result<Value, String> {
    serde_json::from_str(s).map_err(|e| format!("invalid JSON: {}", e))
}
