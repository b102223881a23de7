//! Decode command - classify an identifier and decode a payload
//!
//! Prints one JSON object:
//!
//! ```json
//! {"id":"0x181","category":"TPDO1","node_id":1,"data":"0102a0ff","dlc":4,"fields":{"speed":513,"temp":-96}}
//! ```

use anyhow::{Result, bail};
use canbridge_config::FilterId;
use canbridge_protocol::{CAN_MAX_DLC, Classification, DecodedFields, FieldSchema, classify};
use clap::Args;
use serde::Serialize;

/// Decode command arguments
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// CAN identifier in hex ("0x181" or "181")
    #[arg(long)]
    pub id: FilterId,

    /// Payload bytes in hex, up to 8 bytes ("0102a0ff")
    #[arg(long)]
    pub data: Option<String>,

    /// Field schema "name:type:offset:length[,...]"; requires --data
    #[arg(long)]
    pub fields: Option<FieldSchema>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Debug, Serialize)]
struct DecodeOutput {
    id: String,
    #[serde(flatten)]
    classification: Classification,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dlc: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<DecodedFields>,
}

/// Run the decode command
pub fn run(args: DecodeArgs) -> Result<()> {
    let output = decode(&args)?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", json);
    Ok(())
}

fn decode(args: &DecodeArgs) -> Result<DecodeOutput> {
    let payload = match &args.data {
        Some(data) => Some(parse_payload(data)?),
        None => None,
    };

    let fields = match (&args.fields, &payload) {
        (Some(schema), Some(payload)) => Some(schema.decode(payload)),
        (Some(_), None) => bail!("--fields requires --data"),
        (None, _) => None,
    };

    Ok(DecodeOutput {
        id: args.id.to_string(),
        classification: classify(args.id.0),
        dlc: payload.as_ref().map(Vec::len),
        data: payload.as_deref().map(hex::encode),
        fields,
    })
}

fn parse_payload(data: &str) -> Result<Vec<u8>> {
    let trimmed = data.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let bytes =
        hex::decode(digits).map_err(|e| anyhow::anyhow!("invalid --data '{}': {}", data, e))?;
    if bytes.len() > usize::from(CAN_MAX_DLC) {
        bail!("--data holds {} bytes, a CAN frame carries at most {}", bytes.len(), CAN_MAX_DLC);
    }
    Ok(bytes)
}
