//! `pfolio`: command-line client for the portfolio CRUD API.
//!
//! - **`decode`** / **`encode`**: work with `name::type=value` parameters
//!   offline.
//! - **`list`**, **`get`**, **`create`**, **`delete`**: talk to a running
//!   `portfolio-server`.
//!
//! Parameters are decoded locally before any request is sent, so a typo in a
//! type token never reaches the server.

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use portfolio::{GetParameter, ParamType, ParamValue};
use portfolio_api::{Envelope, ErrorResponse};
use reqwest::blocking::{Client, RequestBuilder};
use serde_json::{json, Value};

/// pfolio: portfolio CRUD API client
#[derive(Parser)]
#[command(name = "pfolio", version, about, long_about = None)]
struct Cli {
    /// Base URL of the server.
    #[arg(
        long,
        env = "PFOLIO_SERVER",
        default_value = "http://127.0.0.1:8000",
        global = true
    )]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode one `name::type` key and its value, and print the typed result.
    ///
    /// Example:
    ///   pfolio decode "age::int" 21
    Decode { key: String, value: String },

    /// Encode a field and value as a `name::type=value` parameter.
    ///
    /// The type is inferred (integer, float, true/false, otherwise string)
    /// unless --as is given.
    ///
    /// Examples:
    ///   pfolio encode building_number 221
    ///   pfolio encode hq_address 3 --as fk
    Encode {
        field: String,
        value: String,
        #[arg(long = "as", value_enum)]
        as_type: Option<Explicit>,
    },

    /// List records, optionally filtered by parameters.
    ///
    /// Example:
    ///   pfolio list country name::str=Canada
    List {
        resource: String,
        #[arg(value_name = "NAME::TYPE=VALUE", value_parser = parse_param)]
        params: Vec<GetParameter>,
    },

    /// Fetch one record by primary key.
    Get { resource: String, pk: i64 },

    /// Create a record.
    ///
    /// Example:
    ///   pfolio create organization name::str=Acme hq_address::fk=3
    Create {
        resource: String,
        #[arg(value_name = "NAME::TYPE=VALUE", value_parser = parse_param, required = true)]
        params: Vec<GetParameter>,
    },

    /// Delete one record by --pk, or every record matching the parameters.
    Delete {
        resource: String,
        #[arg(long)]
        pk: Option<i64>,
        #[arg(value_name = "NAME::TYPE=VALUE", value_parser = parse_param)]
        params: Vec<GetParameter>,
    },
}

/// Types that cannot be inferred from a bare value.
#[derive(Clone, Copy, ValueEnum)]
enum Explicit {
    Date,
    Fk,
}

fn main() {
    let cli = Cli::parse();
    let api = Api::new(&cli.server);

    let output = match cli.command {
        Command::Decode { key, value } => {
            let param =
                GetParameter::decode(&key, &value).unwrap_or_else(|e| fatal(&e.to_string()));
            json!({
                "name": param.name(),
                "type": param.value().param_type().token(),
                "value": param.value().to_json(),
            })
        }

        Command::Encode {
            field,
            value,
            as_type,
        } => {
            let param = encode(&field, &value, as_type).unwrap_or_else(|e| fatal(&e));
            let (key, value) = param.encode();
            println!("{key}={value}");
            return;
        }

        Command::List { resource, params } => {
            api.send(api.get(&resource, None).query(&pairs(&params)))
        }

        Command::Get { resource, pk } => api.send(api.get(&resource, Some(pk))),

        Command::Create { resource, params } => {
            api.send(api.request(reqwest::Method::PUT, &resource, None).form(&pairs(&params)))
        }

        Command::Delete {
            resource,
            pk,
            params,
        } => api.send(
            api.request(reqwest::Method::DELETE, &resource, pk)
                .query(&pairs(&params)),
        ),
    };

    match serde_json::to_string_pretty(&output) {
        Ok(text) => println!("{text}"),
        Err(e) => fatal(&format!("failed to format output: {e}")),
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Parse a `name::type=value` argument, decoding the value locally.
fn parse_param(arg: &str) -> Result<GetParameter, String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME::TYPE=VALUE, got {arg:?}"))?;
    GetParameter::decode(key, value).map_err(|e| e.to_string())
}

fn pairs(params: &[GetParameter]) -> Vec<(String, String)> {
    params.iter().map(GetParameter::encode).collect()
}

fn encode(field: &str, raw: &str, as_type: Option<Explicit>) -> Result<GetParameter, String> {
    let value = match as_type {
        Some(explicit) => {
            let param_type = match explicit {
                Explicit::Date => ParamType::Date,
                Explicit::Fk => ParamType::ForeignKey,
            };
            let key = format!("{field}::{param_type}");
            GetParameter::decode(&key, raw)
                .map_err(|e| e.to_string())?
                .key_value()
                .1
        }
        None => infer(raw),
    };
    Ok(GetParameter::new(field, value))
}

fn infer(raw: &str) -> ParamValue {
    if let Ok(i) = raw.parse::<i64>() {
        ParamValue::Int(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        ParamValue::Float(f)
    } else if let Ok(b) = raw.parse::<bool>() {
        ParamValue::Bool(b)
    } else {
        ParamValue::Str(raw.to_string())
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

struct Api {
    client: Client,
    base: String,
}

impl Api {
    fn new(server: &str) -> Self {
        Self {
            client: Client::new(),
            base: server.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, resource: &str, pk: Option<i64>) -> String {
        match pk {
            Some(pk) => format!("{}/crud/{resource}/{pk}/", self.base),
            None => format!("{}/crud/{resource}/", self.base),
        }
    }

    fn get(&self, resource: &str, pk: Option<i64>) -> RequestBuilder {
        self.request(reqwest::Method::GET, resource, pk)
    }

    fn request(&self, method: reqwest::Method, resource: &str, pk: Option<i64>) -> RequestBuilder {
        self.client.request(method, self.url(resource, pk))
    }

    /// Send `request` and return the payload inside the envelope. Exits with
    /// the server's message on an error status.
    fn send(&self, request: RequestBuilder) -> Value {
        let resp = request
            .send()
            .unwrap_or_else(|e| fatal(&format!("request to {} failed: {e}", self.base)));
        let status = resp.status();
        let text = resp
            .text()
            .unwrap_or_else(|e| fatal(&format!("failed to read response: {e}")));

        if !status.is_success() {
            match serde_json::from_str::<Envelope<ErrorResponse>>(&text) {
                Ok(env) => {
                    let err = env.into_inner();
                    eprintln!("pfolio: {status}: {} ({})", err.error, err.code);
                }
                Err(_) => eprintln!("pfolio: {status}: {text}"),
            }
            process::exit(1);
        }

        serde_json::from_str::<Envelope<Value>>(&text)
            .map(Envelope::into_inner)
            .unwrap_or_else(|e| fatal(&format!("unexpected response body: {e}")))
    }
}

/// Print an error message to stderr and exit with code 2.
fn fatal(msg: &str) -> ! {
    eprintln!("pfolio: {msg}");
    process::exit(2);
}
