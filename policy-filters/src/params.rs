use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("missing required parameter {0:?}")]
    Missing(String),
    #[error("parameter {0:?} has invalid value {1:?}")]
    Invalid(String, String),
}

/// A thin accessor over a filter declaration's `params` (spec §3: "parsed
/// at config load and consumed by the kind's constructor"). Shared by
/// every kind's constructor so each one reads as a short list of typed
/// fields rather than repeating string lookups.
pub struct Params<'a> {
    raw: &'a [(String, String)],
}

impl<'a> Params<'a> {
    pub fn new(raw: &'a [(String, String)]) -> Params<'a> {
        Params { raw }
    }

    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.raw.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn required_str(&self, name: &str) -> Result<&'a str, ParamError> {
        self.get(name).ok_or_else(|| ParamError::Missing(name.to_string()))
    }

    pub fn parse<T>(&self, name: &str) -> Result<Option<T>, ParamError>
    where
        T: FromStr,
    {
        match self.get(name) {
            Some(v) => v
                .parse()
                .map(Some)
                .map_err(|_| ParamError::Invalid(name.to_string(), v.to_string())),
            None => Ok(None),
        }
    }

    pub fn parse_or<T>(&self, name: &str, default: T) -> Result<T, ParamError>
    where
        T: FromStr,
    {
        Ok(self.parse(name)?.unwrap_or(default))
    }

    pub fn parse_required<T>(&self, name: &str) -> Result<T, ParamError>
    where
        T: FromStr,
    {
        self.parse(name)?.ok_or_else(|| ParamError::Missing(name.to_string()))
    }

    pub fn bool_or(&self, name: &str, default: bool) -> Result<bool, ParamError> {
        match self.get(name) {
            Some("true") => Ok(true),
            Some("false") => Ok(false),
            Some(other) => Err(ParamError::Invalid(name.to_string(), other.to_string())),
            None => Ok(default),
        }
    }

    /// All values for a multi-valued parameter name (e.g. `strlist`'s
    /// repeated `list = ...;` lines), in declaration order.
    pub fn all(&self, name: &str) -> impl Iterator<Item = &'a str> + '_ {
        self.raw.iter().filter(move |(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_str_missing_is_an_error() {
        let raw = vec![];
        let p = Params::new(&raw);
        assert_eq!(p.required_str("delay"), Err(ParamError::Missing("delay".into())));
    }

    #[test]
    fn parse_required_parses_integers() {
        let raw = vec![("delay".to_string(), "300".to_string())];
        let p = Params::new(&raw);
        assert_eq!(p.parse_required::<i64>("delay"), Ok(300));
    }

    #[test]
    fn invalid_integer_is_reported_with_the_offending_value() {
        let raw = vec![("delay".to_string(), "soon".to_string())];
        let p = Params::new(&raw);
        assert_eq!(
            p.parse_required::<i64>("delay"),
            Err(ParamError::Invalid("delay".into(), "soon".into()))
        );
    }

    #[test]
    fn all_collects_repeated_keys_in_order() {
        let raw = vec![
            ("list".to_string(), "a".to_string()),
            ("list".to_string(), "b".to_string()),
        ];
        let p = Params::new(&raw);
        assert_eq!(p.all("list").collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
