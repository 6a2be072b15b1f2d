use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::{Parser, Subcommand};
use facereg_core::{FaceEncoder, OnnxFaceEncoder};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "facereg", about = "Face registration and recognition client")]
struct Cli {
    /// Base URL of the faceregd server
    #[arg(long, env = "FACEREG_URL", default_value = "http://127.0.0.1:5000", global = true)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register the face in an image under a name
    Register {
        /// Name to register the face under
        #[arg(short, long)]
        name: String,
        /// Image file containing one face
        image: PathBuf,
    },
    /// Recognize every face in an image
    Recognize {
        /// Image file to recognize
        image: PathBuf,
    },
    /// Show daemon status
    Status,
    /// Run detection and encoding locally, bypassing the daemon
    Detect {
        /// Image file to analyse
        image: PathBuf,
        /// Directory containing the ONNX models
        #[arg(long, env = "FACEREG_MODEL_DIR")]
        model_dir: Option<PathBuf>,
    },
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(flatten)]
    rest: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct MatchItem {
    name: String,
    confidence: Option<f32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/');
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Register { name, image } => {
            let body = json!({ "image": read_base64(&image)?, "name": name });
            let reply = call(client.post(format!("{server}/register")).json(&body)).await?;
            println!("{}", reply.message.unwrap_or_default());
        }
        Commands::Recognize { image } => {
            let body = json!({ "image": read_base64(&image)? });
            let reply = call(client.post(format!("{server}/recognize")).json(&body)).await?;
            let matches: Vec<MatchItem> = serde_json::from_value(
                reply.rest.get("matches").cloned().unwrap_or(Value::Array(Vec::new())),
            )
            .context("unexpected recognize response")?;

            if matches.is_empty() {
                println!("No faces found");
            }
            for (i, m) in matches.iter().enumerate() {
                match m.confidence {
                    Some(d) => println!("face {i}: {} (distance {d:.4})", m.name),
                    None => println!("face {i}: {} (no registered faces)", m.name),
                }
            }
        }
        Commands::Status => {
            let reply = call(client.get(format!("{server}/status"))).await?;
            println!("{}", serde_json::to_string_pretty(&reply.rest)?);
        }
        Commands::Detect { image: path, model_dir } => {
            let model_dir = model_dir.unwrap_or_else(facereg_core::default_model_dir);
            let mut encoder = OnnxFaceEncoder::load_dir(&model_dir)
                .with_context(|| format!("loading models from {}", model_dir.display()))?;

            let img = image::open(&path)
                .with_context(|| format!("reading {}", path.display()))?
                .to_rgb8();
            let encodings = encoder.encode_faces(&img)?;

            println!(
                "{}: {} face(s), encoder {}",
                path.display(),
                encodings.len(),
                encoder.model_version()
            );
            for (i, enc) in encodings.iter().enumerate() {
                println!("face {i}: {} dims, norm {:.4}", enc.len(), enc.norm());
            }
        }
    }

    Ok(())
}

fn read_base64(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(STANDARD.encode(bytes))
}

/// Send a request and fail with the server's message on a non-success reply.
async fn call(request: reqwest::RequestBuilder) -> Result<ApiReply> {
    let response = request.send().await.context("connecting to faceregd")?;
    let status = response.status();
    let text = response.text().await?;
    tracing::debug!(%status, body_len = text.len(), "server replied");
    parse_reply(status, &text)
}

fn parse_reply(status: reqwest::StatusCode, text: &str) -> Result<ApiReply> {
    let reply: ApiReply = serde_json::from_str(text)
        .with_context(|| format!("unexpected response ({status}): {text}"))?;
    if reply.status != "success" {
        bail!(
            "{} ({status})",
            reply.message.as_deref().unwrap_or("request failed")
        );
    }
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_parse_success_keeps_payload() {
        let reply = parse_reply(
            StatusCode::OK,
            r#"{"status":"success","matches":[{"name":"Alice","confidence":0.12,"encoding":[]}]}"#,
        )
        .unwrap();
        let matches: Vec<MatchItem> = serde_json::from_value(reply.rest["matches"].clone()).unwrap();
        assert_eq!(matches[0].name, "Alice");
        assert_eq!(matches[0].confidence, Some(0.12));
    }

    #[test]
    fn test_parse_error_surfaces_server_message() {
        let err = parse_reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"status":"error","message":"Encoding database not found"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Encoding database not found"));
    }

    #[test]
    fn test_parse_non_json_body() {
        assert!(parse_reply(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>").is_err());
    }
}
