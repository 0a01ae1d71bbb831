//! # Envelope Demo
//!
//! Alice generates a key-pair, Bob encrypts a note for her using only her
//! public key string, and Alice restores her key-pair from its
//! password-protected export to read it.
//!
//! ## Run
//!
//! ```bash
//! cargo run --example envelope_demo
//! ```

use ceph_core::{CephConfig, Decrypted};
use serde_json::{json, Value};

#[tokio::main]
async fn main() -> ceph_core::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ceph_core=debug".into()),
        )
        .init();

    println!("=== Ceph Core: Hybrid Envelope Demo ===\n");

    let config = CephConfig::default();

    // Step 1: Alice creates a key-pair with an export password
    println!("Step 1: Generating Alice's key-pair...");
    let mut alice = config.open_session("alice").await?;
    alice.generate_key_pair(Some("correct horse")).await?;

    let public = alice.public_key_string().unwrap_or_default().to_string();
    let export = alice.private_key_string().unwrap_or_default().to_string();
    println!("  Public key:     {}...", &public[..40.min(public.len())]);
    println!("  Private export: {}...", &export[..40.min(export.len())]);
    println!();

    // Step 2: Bob only knows the public key string
    println!("Step 2: Bob encrypts a note for Alice...");
    let mut bob = config.open_session("bob").await?;
    bob.import_public_key(&public).await?;

    let note = json!({ "from": "bob", "text": "Lunch at noon?" });
    let envelope = bob.encrypt_object(&note).await?;
    println!("  message: {}...", &envelope.message[..40.min(envelope.message.len())]);
    println!("  key:     {}...", &envelope.key[..40.min(envelope.key.len())]);
    println!();

    // Step 3: Alice restores from the export on a new device
    println!("Step 3: Restoring Alice's key-pair from the export...");
    let mut restored = config.open_session("alice-laptop").await?;
    let wrong = restored.import_private_key(&export, "wrong guess").await?;
    println!("  With the wrong password: {}", wrong);
    let right = restored.import_private_key(&export, "correct horse").await?;
    println!("  With the right password: {}", right);
    println!();

    // Step 4: Decrypt
    println!("Step 4: Decrypting...");
    match restored
        .decrypt_object::<Value>(&envelope.key, &envelope.message)
        .await?
    {
        Decrypted::Value(value) => println!("  Decrypted: {}", value),
        other => println!("  Could not decrypt: {:?}", other),
    }

    // Bob cannot read it back, he has no private key
    match bob.decrypt_object::<Value>(&envelope.key, &envelope.message).await {
        Ok(_) => println!("  Bob decrypted it (unexpected)"),
        Err(e) => println!("  Bob cannot decrypt: {}", e),
    }

    println!("\n=== Demo Complete ===");
    Ok(())
}
