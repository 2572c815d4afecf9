//! パスワードのハッシュ化と Bearer トークンの発行・検証。

mod password;
mod token;

pub use password::{MIN_PASSWORD_LEN, PasswordError, PasswordHasher};
pub use token::{Claims, TokenError, TokenIssuer};

/// Trims and lower-cases an e-mail address so lookups are case-insensitive.
#[must_use]
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::normalize_email;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
