//! Environment variable lookup and `$VAR` expansion.

use thiserror::Error;

/// An environment variable required by the application is not set.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVarError(pub String);

/// Reads an environment variable, returning a structured error if it's missing.
///
/// This is a thin wrapper around `std::env::var` that provides a more
/// ergonomic and specific error type for missing variables.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, MissingEnvVarError> {
    std::env::var(name).map_err(|_| MissingEnvVarError(name.to_string()))
}

/// Expands `$NAME` and `${NAME}` references in `input` from the process environment.
///
/// See [`expand_with`] for the exact syntax.
pub fn expand_env(input: &str) -> Result<String, MissingEnvVarError> {
    expand_with(input, |name| get_env_var(name).ok())
}

/// Expands `$NAME` and `${NAME}` references using `lookup`.
///
/// - Names are ASCII alphanumerics and `_`.
/// - `$$` produces a literal `$`.
/// - A `$` not followed by a name (or an unterminated `${`) is kept as-is.
/// - A name `lookup` cannot resolve is an error; nothing is silently blanked.
pub fn expand_with<F>(input: &str, lookup: F) -> Result<String, MissingEnvVarError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
            continue;
        }

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) if is_name(&braced[..end]) => (&braced[..end], end + 2),
                _ => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        if name.is_empty() {
            out.push('$');
            rest = after;
            continue;
        }

        let value = lookup(name).ok_or_else(|| MissingEnvVarError(name.to_string()))?;
        out.push_str(&value);
        rest = &after[consumed..];
    }

    out.push_str(rest);
    Ok(out)
}

fn is_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(name: &str) -> Option<String> {
        match name {
            "PGUSER" => Some("alice".into()),
            "PGHOST" => Some("db.internal".into()),
            _ => None,
        }
    }

    #[test]
    fn expands_bare_and_braced_names() {
        let out = expand_with("user=$PGUSER host=${PGHOST} sslmode=disable", vars).unwrap();
        assert_eq!(out, "user=alice host=db.internal sslmode=disable");
    }

    #[test]
    fn leaves_plain_text_untouched() {
        let s = "user=postgres dbname=postgres";
        assert_eq!(expand_with(s, vars).unwrap(), s);
    }

    #[test]
    fn double_dollar_is_literal() {
        assert_eq!(expand_with("password=a$$b", vars).unwrap(), "password=a$b");
    }

    #[test]
    fn dangling_dollar_is_kept() {
        assert_eq!(expand_with("cost=5$ x=${", vars).unwrap(), "cost=5$ x=${");
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let err = expand_with("user=$NOPE", vars).unwrap_err();
        assert_eq!(err, MissingEnvVarError("NOPE".into()));
        assert_eq!(err.to_string(), "Missing environment variable: NOPE");
    }
}
