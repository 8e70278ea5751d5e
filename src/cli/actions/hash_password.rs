use crate::portal::credentials::hash_password;
use anyhow::{bail, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::io::{self, BufRead};

/// Read one password line from stdin and print its PHC hash.
/// # Errors
/// Returns an error if stdin cannot be read, the password is empty or hashing fails.
pub fn execute() -> Result<()> {
    let password = read_password(io::stdin().lock())?;
    println!("{}", hash_password(password.expose_secret())?);
    Ok(())
}

fn read_password(mut reader: impl BufRead) -> Result<SecretString> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        bail!("Password must not be empty");
    }
    Ok(SecretString::from(password.to_string()))
}
