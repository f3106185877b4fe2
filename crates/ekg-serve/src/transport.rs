use anyhow::{anyhow, Result};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{self, BufRead, BufReader, Read, Write};

use crate::tools::ToolRegistry;

/// Dispatch requests arriving on the named transport until it closes.
pub fn run(registry: &ToolRegistry, transport: &str) -> Result<()> {
    match transport {
        "stdio" => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            serve_lines(registry, stdin.lock(), &mut stdout.lock())
        }
        other => Err(anyhow!("unsupported transport '{}'", other)),
    }
}

/// One JSON request per line in, one JSON response per line out.
fn serve_lines<R: Read>(
    registry: &ToolRegistry,
    reader: R,
    writer: &mut dyn Write,
) -> Result<()> {
    let mut reader = BufReader::new(reader);
    info!("Listening for requests on stdin/stdout");
    loop {
        let mut line = String::new();
        let bytes = reader.read_line(&mut line)?;
        if bytes == 0 {
            info!("EOF reached, stopping transport");
            break;
        }

        if line.trim().is_empty() {
            continue;
        }

        let request: ToolRequest = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(err) => {
                error!("failed to parse request: {}", err);
                let response = ToolResponse::error(None, 400, err.to_string());
                write_response(writer, &response)?;
                continue;
            }
        };

        let response = match registry.execute(&request.method, request.params) {
            Ok(reply) => ToolResponse::ok(request.id, reply.status, reply.body),
            Err(err) => {
                error!("method '{}' failed: {:#}", request.method, err);
                ToolResponse::error(request.id, 400, format!("{:#}", err))
            }
        };

        write_response(writer, &response)?;
    }

    Ok(())
}

fn write_response(writer: &mut dyn Write, response: &ToolResponse) -> Result<()> {
    let serialized = serde_json::to_string(response)?;
    writer.write_all(serialized.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ToolRequest {
    pub id: Option<Value>,
    pub method: String,
    pub params: Option<Value>,
}

#[derive(Debug, Serialize)]
struct ToolResponse {
    pub id: Option<Value>,
    pub status: u16,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl ToolResponse {
    fn ok(id: Option<Value>, status: u16, result: Value) -> Self {
        Self {
            id,
            status,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Option<Value>, status: u16, err: String) -> Self {
        Self {
            id,
            status,
            result: None,
            error: Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekg_lib::AnalysisError;

    fn responses(input: &str) -> Vec<Value> {
        let registry = ToolRegistry::new(Err(AnalysisError::ModelUnavailable("none".into())));
        let mut out = Vec::new();
        serve_lines(&registry, input.as_bytes(), &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn one_response_per_request_line() {
        let out = responses(
            "{\"id\":1,\"method\":\"capabilities\"}\n\n{\"id\":\"b\",\"method\":\"analyze\",\"params\":{}}\n",
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["id"], 1);
        assert_eq!(out[0]["status"], 200);
        assert_eq!(out[1]["id"], "b");
        assert_eq!(out[1]["status"], 503);
        assert_eq!(out[1]["result"]["success"], false);
    }

    #[test]
    fn garbage_line_gets_an_error_and_the_loop_continues() {
        let out = responses("not json\n{\"method\":\"nope\"}\n");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["status"], 400);
        assert!(out[0]["id"].is_null());
        assert!(out[1]["error"].as_str().unwrap().contains("unsupported tool"));
    }
}
