//! Password handling for CLI operations.

use arcwalk::Password;
use rpassword::prompt_password;

/// Resolves the password for an operation.
///
/// A password given on the command line is used as is; otherwise `None`
/// until the archive asks for one.
pub fn provided(password: Option<String>) -> Option<Password> {
    password.map(Password::new).filter(|p| !p.is_empty())
}

/// Prompts the user once; an empty answer or a closed terminal yields `None`.
pub fn prompt(archive: &str) -> Option<Password> {
    match prompt_password(format!("Enter password for {archive}: ")) {
        Ok(pwd) if !pwd.is_empty() => Some(Password::new(pwd)),
        _ => None,
    }
}
