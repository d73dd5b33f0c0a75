// File: ./src/prompt.rs
use anyhow::{Result, bail};
use std::io::{BufRead, Write};

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Asks for a username and a password, one line each.
pub fn prompt_credentials<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<Credentials> {
    let username = prompt_line(input, out, "Please enter your username.")?;
    let password = prompt_line(input, out, "Please enter your password.")?;
    Ok(Credentials { username, password })
}

fn prompt_line<R: BufRead, W: Write>(input: &mut R, out: &mut W, message: &str) -> Result<String> {
    writeln!(out, "{message}")?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("Input closed while waiting for credentials");
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_two_lines() {
        let mut input = Cursor::new("jdoe@school.org\r\np@ss word\n");
        let mut out = Vec::new();
        let creds = prompt_credentials(&mut input, &mut out).unwrap();
        assert_eq!(creds.username, "jdoe@school.org");
        assert_eq!(creds.password, "p@ss word");
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("username"));
        assert!(shown.contains("password"));
        assert!(!format!("{creds:?}").contains("p@ss"));
    }

    #[test]
    fn eof_is_an_error() {
        let mut input = Cursor::new("only-user\n");
        assert!(prompt_credentials(&mut input, &mut Vec::new()).is_err());
    }
}
