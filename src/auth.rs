use anyhow::{Result, bail};
use std::io::{self, BufRead, IsTerminal};
use zeroize::Zeroizing;

pub const PASSWORD_ENV: &str = "LAYERCRYPT_PASSWORD";

/// Obtain the password from the environment, a stdin pipe or a TTY prompt,
/// in that order. `confirm` asks twice on a TTY (used when encrypting).
pub fn read_password(confirm: bool) -> Result<Zeroizing<Vec<u8>>> {
    //  LAYERCRYPT_PASSWORD="supersecret" layercrypt encrypt notes.txt
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw.into_bytes()));
        }
    }

    //  printf "%s\n" "$PW" | layercrypt decrypt notes.txt.lcry
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().lock().read_line(&mut buf)?;
        trim_newline(&mut buf);

        if !buf.is_empty() {
            return Ok(Zeroizing::new(buf.as_bytes().to_vec()));
        }
        bail!("No password provided");
    }

    let pw1 = Zeroizing::new(rpassword::prompt_password("Password: ")?);
    if pw1.is_empty() {
        bail!("password cannot be empty");
    }

    if confirm {
        let pw2 = Zeroizing::new(rpassword::prompt_password("Confirm password: ")?);
        if *pw1 != *pw2 {
            bail!("passwords do not match");
        }
    }

    Ok(Zeroizing::new(pw1.as_bytes().to_vec()))
}

fn trim_newline(s: &mut String) {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_newline_strips_crlf_only() {
        let mut s = String::from("pass word \r\n");
        trim_newline(&mut s);
        assert_eq!(s, "pass word ");
    }
}
