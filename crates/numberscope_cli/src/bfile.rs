//! Remote sequence entries read from a directory of OEIS b-files.
//!
//! A b-file holds one `n a(n)` pair per line; blank lines and lines starting
//! with `#` are ignored. The file for `A000045` is `b000045.txt`.

use numberscope_core::Element;
use numberscope_core::sequence::remote::RemoteTerms;
use numberscope_core::sequence::{BoxFuture, FetchError, ValueFetcher};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

pub struct BFileFetcher {
    dir: PathBuf,
}

impl BFileFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, FetchError> {
        let digits = key
            .strip_prefix(['A', 'a'])
            .filter(|d| !d.is_empty() && d.chars().all(|c| c.is_ascii_digit()))
            .ok_or_else(|| FetchError::NotFound(key.to_string()))?;
        Ok(self.dir.join(format!("b{digits}.txt")))
    }
}

impl ValueFetcher for BFileFetcher {
    fn fetch<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<RemoteTerms, FetchError>> {
        Box::pin(async move {
            let path = self.path_for(key)?;
            debug!(path = %path.display(), "reading b-file");
            let text = match tokio::fs::read_to_string(&path).await {
                Ok(text) => text,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(FetchError::NotFound(key.to_string()));
                }
                Err(e) => return Err(FetchError::Failed(format!("{}: {e}", path.display()))),
            };
            parse_bfile(&text)
        })
    }
}

pub fn parse_bfile(text: &str) -> Result<RemoteTerms, FetchError> {
    let mut first = None;
    let mut values = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let malformed = || FetchError::Malformed(format!("line {}: {line:?}", line_no + 1));
        let mut fields = line.split_whitespace();
        let (Some(n), Some(value), None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(malformed());
        };
        let n = n.parse::<i64>().map_err(|_| malformed())?;
        let value = value.parse::<Element>().map_err(|_| malformed())?;
        let start = *first.get_or_insert(n);
        if start.checked_add(values.len() as i64) != Some(n) {
            return Err(FetchError::Malformed(format!(
                "line {}: index {n} out of order",
                line_no + 1
            )));
        }
        values.push(value);
    }
    let first = first.ok_or_else(|| FetchError::Malformed("no entries".to_string()))?;
    Ok(RemoteTerms {
        first,
        values,
        name: None,
    })
}
