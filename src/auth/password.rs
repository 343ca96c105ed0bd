use argon2::{
    Argon2,
    password_hash::{Error, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

pub fn hash_password(password: &str) -> Result<String, Error> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    Ok(argon2.hash_password(password.as_bytes(), &salt)?.to_string())
}

pub fn verify_password(password: &str, hashed: &str) -> Result<(), Error> {
    let argon2 = Argon2::default();
    let parsed = PasswordHash::new(hashed)?;

    argon2.verify_password(password.as_bytes(), &parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_only_the_original_password() {
        let hashed = hash_password("Makedollars@12345").unwrap();
        assert!(hashed.starts_with("$argon2"));
        assert!(verify_password("Makedollars@12345", &hashed).is_ok());
        assert!(verify_password("makedollars@12345", &hashed).is_err());
    }

    #[test]
    fn malformed_hash_is_an_error_not_a_panic() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }
}
