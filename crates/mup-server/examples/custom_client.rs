//! Example: a minimal MUP client in Rust.
//!
//! Spawns the server binary with `serve-stdio` and talks to it one
//! envelope per line.
//!
//! Usage:
//!   cargo build && cargo run --example custom_client

use std::io::{BufRead, BufReader, Write};
use std::process::{Command, Stdio};

use serde_json::{json, Value};

/// Line-framed MUP client over a child process's stdio.
struct SimpleClient {
    stdin: std::process::ChildStdin,
    reader: BufReader<std::process::ChildStdout>,
    next_id: u32,
}

impl SimpleClient {
    /// Send an envelope and read the correlated reply.
    fn request(&mut self, message_type: &str, payload: Value) -> Value {
        self.next_id += 1;
        let message_id = format!("example-{}", self.next_id);
        let envelope = json!({
            "mup": {
                "version": "2.0.0",
                "message_id": message_id,
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "message_type": message_type,
                "payload": payload
            }
        });

        let line = serde_json::to_string(&envelope).unwrap() + "\n";
        self.stdin.write_all(line.as_bytes()).unwrap();
        self.stdin.flush().unwrap();

        let mut reply_line = String::new();
        self.reader.read_line(&mut reply_line).unwrap();
        let reply: Value = serde_json::from_str(&reply_line).unwrap();
        assert_eq!(reply["mup"]["correlation_id"], message_id.as_str());
        reply["mup"].clone()
    }
}

fn main() {
    println!("=== MUP Client Example ===\n");

    let server_path = std::env::current_dir()
        .unwrap()
        .join("target/debug/mup-server");

    if !server_path.exists() {
        eprintln!("Server binary not found. Run `cargo build` first.");
        std::process::exit(1);
    }

    let mut child = Command::new(&server_path)
        .arg("serve-stdio")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to start server");

    let stdin = child.stdin.take().expect("Failed to open stdin");
    let stdout = child.stdout.take().expect("Failed to open stdout");

    let mut client = SimpleClient {
        stdin,
        reader: BufReader::new(stdout),
        next_id: 0,
    };

    // 1. Handshake
    println!("1. Handshaking...");
    let hello = client.request(
        "handshake_request",
        json!({
            "client_info": {"name": "example-client", "version": "1.0.0"},
            "context": {"user_id": "example"}
        }),
    );
    println!(
        "   Server: {} v{}, client id {}",
        hello["payload"]["server_info"]["name"],
        hello["payload"]["server_info"]["version"],
        hello["payload"]["client_id"]
    );

    // 2. Query components
    println!("\n2. Querying component availability...");
    let availability = client.request(
        "capability_query",
        json!({"query_type": "component_availability"}),
    );
    println!(
        "   {} component types available",
        availability["payload"]["total_count"]
    );

    // 3. Sync state
    println!("\n3. Syncing state...");
    let state = client.request("state_sync", json!({}));
    for component in state["payload"]["components"].as_array().unwrap() {
        println!("   - {} ({})", component["id"], component["type"]);
    }

    // 4. Submit the sample form
    println!("\n4. Submitting the sample form...");
    let submitted = client.request(
        "event_notification",
        json!({
            "handler": "handle_form_submit",
            "component_id": "sample_form",
            "event_data": {
                "form_data": {"name": "Ada", "email": "ada@example.com", "message": "Hello there"}
            }
        }),
    );
    println!("   {}", submitted["payload"]["message"]);

    // 5. Batch update
    println!("\n5. Sorting the sample table in a batch...");
    let batch = client.request(
        "batch_operation",
        json!({
            "operations": [{
                "type": "component_update",
                "component_id": "sample_table",
                "updates": {"sorting": {"column": "name", "direction": "asc"}}
            }]
        }),
    );
    println!(
        "   {} of {} operations succeeded",
        batch["payload"]["successful_operations"], batch["payload"]["total_operations"]
    );

    drop(client);
    let _ = child.wait();

    println!("\n=== Example complete ===");
}
