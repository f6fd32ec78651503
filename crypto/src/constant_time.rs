/// Constant-time operations to prevent timing attacks
/// 
/// All cryptographic comparisons MUST use constant-time operations to prevent
/// timing side-channel attacks where an attacker can determine secret data by
/// measuring operation execution time.

use subtle::ConstantTimeEq;

/// Constant-time comparison of byte slices
/// 
/// Returns true if slices are equal, false otherwise.
/// Execution time is independent of input data.
/// 
/// # Security
/// 
/// NEVER use `==` for comparing:
/// - Passwords or password hashes
/// - Authentication tokens
/// - MACs or HMACs
/// - Encryption keys
/// - Any other secret values
/// 
/// # Example
/// 
/// ```rust
/// use crypto::constant_time::ct_eq;
/// 
/// let secret1 = b"secret_password_hash";
/// let secret2 = b"secret_password_hash";
/// 
/// // ✅ SECURE: Constant-time comparison
/// assert!(ct_eq(secret1, secret2));
/// 
/// // ❌ INSECURE: Variable-time comparison (DO NOT USE)
/// // assert_eq!(secret1, secret2);
/// ```
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    // Early length check is safe - length is not secret
    if a.len() != b.len() {
        return false;
    }
    
    // Use subtle crate's constant-time comparison
    a.ct_eq(b).into()
}

/// Constant-time comparison of strings
///
/// Useful for comparing authentication tokens, API keys, etc.
pub fn ct_eq_str(a: &str, b: &str) -> bool {
    ct_eq(a.as_bytes(), b.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ct_eq_equal() {
        let a = b"secret_value";
        let b = b"secret_value";
        assert!(ct_eq(a, b));
    }

    #[test]
    fn test_ct_eq_not_equal() {
        let a = b"secret_value_1";
        let b = b"secret_value_2";
        assert!(!ct_eq(a, b));
    }

    #[test]
    fn test_ct_eq_different_lengths() {
        let a = b"short";
        let b = b"longer_value";
        assert!(!ct_eq(a, b));
    }

    #[test]
    fn test_ct_eq_str() {
        assert!(ct_eq_str("token123", "token123"));
        assert!(!ct_eq_str("token123", "token456"));
    }
}
