//! fitbase CLI
//!
//! `fitbase [--config <path>] [--mock] <procedure> [json-input]`
//!
//! Runs one procedure against the hosted service (or an in-memory service
//! with `--mock`) and prints its JSON result on stdout. Errors are printed as
//! JSON on stderr with a non-zero exit status.

use std::process::ExitCode;
use std::sync::Arc;

use fitbase_api::telemetry::{init_tracing, TelemetryConfig};
use fitbase_api::{ApiError, ApiResult, Database, PROCEDURES};
use fitbase_core::tables::{fitness_schema, fitness_tables};
use fitbase_core::{FitError, ServiceConfig};
use fitbase_storage::MockDataService;
use serde_json::Value;

#[derive(Debug, PartialEq)]
enum Command {
    List,
    Call {
        procedure: String,
        input: Value,
        mock: bool,
    },
}

fn parse_args(args: impl IntoIterator<Item = String>) -> ApiResult<Command> {
    let mut mock = false;
    let mut positional = Vec::new();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            // Consumed again by ServiceConfig::load.
            "--config" => {
                args.next();
            }
            "--mock" => mock = true,
            "--list" | "-l" => return Ok(Command::List),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let procedure = positional
        .next()
        .ok_or_else(|| ApiError::invalid_input("usage: fitbase [--config <path>] [--mock] <procedure> [json-input]"))?;
    let input = match positional.next() {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| ApiError::invalid_input(format!("input is not valid JSON: {}", e)))?,
        None => Value::Null,
    };
    Ok(Command::Call {
        procedure,
        input,
        mock,
    })
}

fn open_database(mock: bool) -> ApiResult<Database> {
    if mock {
        let schema = Arc::new(fitness_schema().map_err(FitError::from)?);
        let service = Arc::new(MockDataService::new(schema));
        return Ok(Database::init(service, &fitness_tables())?);
    }
    let config = ServiceConfig::load().map_err(FitError::from)?;
    Ok(Database::connect(&config)?)
}

async fn run() -> ApiResult<String> {
    init_tracing(&TelemetryConfig::default())?;

    match parse_args(std::env::args().skip(1))? {
        Command::List => Ok(PROCEDURES.join("\n")),
        Command::Call {
            procedure,
            input,
            mock,
        } => {
            let db = open_database(mock)?;
            let result = db.call(&procedure, input).await;
            db.shutdown();
            Ok(serde_json::to_string_pretty(&result?)?)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            let body = serde_json::to_string_pretty(&e).unwrap_or_else(|_| e.to_string());
            eprintln!("{}", body);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_call_with_input() {
        let command = parse_args(args(&[
            "--config",
            "fitbase.toml",
            "weight.getById",
            r#"{"id": 3}"#,
        ]))
        .unwrap();
        assert_eq!(
            command,
            Command::Call {
                procedure: "weight.getById".to_string(),
                input: json!({"id": 3}),
                mock: false,
            }
        );
    }

    #[test]
    fn test_parse_mock_without_input() {
        let command = parse_args(args(&["--mock", "hello"])).unwrap();
        assert_eq!(
            command,
            Command::Call {
                procedure: "hello".to_string(),
                input: Value::Null,
                mock: true,
            }
        );
        assert_eq!(parse_args(args(&["--list"])).unwrap(), Command::List);
    }

    #[test]
    fn test_parse_rejects_missing_procedure_and_bad_json() {
        assert!(parse_args(args(&[])).is_err());
        assert!(parse_args(args(&["hello", "{nope"])).is_err());
    }
}
