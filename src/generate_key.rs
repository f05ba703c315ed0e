// generate_key.rs
// Utility to generate a new token signing key for the system

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;

/// 384 bits, comfortably above the HS256 block size
const KEY_BYTES: usize = 48;

fn generate_key() -> String {
    let mut key = [0u8; KEY_BYTES];
    rand::thread_rng().fill_bytes(&mut key);
    STANDARD.encode(key)
}

fn main() {
    println!("Generating new HS256 token signing key...\n");

    let key = generate_key();

    println!("✅ Key generated successfully!\n");
    println!("Add this to your .env file:");
    println!("─────────────────────────────────────────────────");
    println!("SECRET_KEY={}", key);
    println!("─────────────────────────────────────────────────");
    println!("\n⚠️  IMPORTANT:");
    println!("  • Keep this key secure and never commit it to version control");
    println!("  • Changing it invalidates every token already issued");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_random_and_sized() {
        let a = generate_key();
        let b = generate_key();
        assert_ne!(a, b);
        assert_eq!(STANDARD.decode(&a).unwrap().len(), KEY_BYTES);
    }
}
