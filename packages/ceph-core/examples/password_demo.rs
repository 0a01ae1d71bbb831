//! # Password Demo
//!
//! Salted password hashing and the password envelope.
//!
//! ## Run
//!
//! ```bash
//! cargo run --example password_demo
//! ```

use ceph_core::crypto::{
    check_password, decrypt_data, encrypt_data, hash_password, query_password_salt,
};
use ceph_core::{CipherVersion, PasswordEncoding};

#[tokio::main]
async fn main() -> ceph_core::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ceph_core=info".into()),
        )
        .init();

    println!("=== Ceph Core: Password Demo ===\n");

    println!("Step 1: Hashing a password...");
    for encoding in [PasswordEncoding::Base64, PasswordEncoding::Hex] {
        let hash = hash_password("hunter2", None, encoding).await?;
        println!("  {:<6} {}", encoding, hash);

        println!("    hunter2 -> {}", check_password("hunter2", &hash).await?);
        println!("    hunter3 -> {}", check_password("hunter3", &hash).await?);
        if let Some(salt) = query_password_salt(&hash) {
            println!("    salt (base64) = {}", salt);
        }
    }
    println!();

    println!("Step 2: Password envelope...");
    for version in [CipherVersion::AesCbc, CipherVersion::AesGcm] {
        let sealed = encrypt_data("the launch codes", "hunter2", version).await?;
        println!("  v{}: {}...", version, &sealed[..48.min(sealed.len())]);
        println!("    right password -> {:?}", decrypt_data(&sealed, "hunter2").await?);
        println!("    wrong password -> {:?}", decrypt_data(&sealed, "hunter3").await?);
    }

    println!("\n=== Demo Complete ===");
    Ok(())
}
