//! Interactive page selection contract.
//!
//! The pipeline discovers candidate pages, hands their URLs to a
//! [`UrlSelector`] and crawls only what comes back. Terminal front-ends
//! implement the trait; [`parse_selection`] handles the plain-text answer
//! format (`1,3,5`, `all`, `q`).

use url::Url;
use webdoc_shared::{Result, WebdocError};

/// What the user picked from the candidate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Zero-based indices into the candidate list, in the order given.
    Pages(Vec<usize>),
    /// Abort without producing output.
    Quit,
}

impl Selection {
    /// Select every candidate.
    pub fn all(count: usize) -> Self {
        Self::Pages((0..count).collect())
    }

    /// Keep the chosen items of `candidates`, in selection order.
    pub fn apply<T>(self, candidates: Vec<T>) -> Option<Vec<T>> {
        let Self::Pages(indices) = self else {
            return None;
        };
        let mut slots: Vec<Option<T>> = candidates.into_iter().map(Some).collect();
        Some(
            indices
                .into_iter()
                .filter_map(|i| slots.get_mut(i).and_then(Option::take))
                .collect(),
        )
    }
}

/// Chooses which discovered pages to convert.
pub trait UrlSelector: Send + Sync {
    fn select(&self, candidates: &[Url]) -> Result<Selection>;
}

/// Parse a textual answer against a list of `count` candidates.
///
/// Numbers are one-based; numbers outside the list are ignored and repeats
/// collapse to the first occurrence. Anything that is not a number, `all` or
/// `q` is a validation error.
pub fn parse_selection(input: &str, count: usize) -> Result<Selection> {
    let answer = input.trim();
    if answer.eq_ignore_ascii_case("q") || answer.eq_ignore_ascii_case("quit") {
        return Ok(Selection::Quit);
    }
    if answer.eq_ignore_ascii_case("all") {
        return Ok(Selection::all(count));
    }

    let mut indices = Vec::new();
    for part in answer.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let number: usize = part
            .parse()
            .map_err(|_| WebdocError::validation(format!("invalid selection `{part}`: expected page numbers")))?;
        if (1..=count).contains(&number) && !indices.contains(&(number - 1)) {
            indices.push(number - 1);
        }
    }
    Ok(Selection::Pages(indices))
}
