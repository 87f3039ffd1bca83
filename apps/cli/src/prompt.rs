//! Interactive page selection for `convert --interactive`.

use std::io::{BufRead, Write};

use dialoguer::MultiSelect;
use dialoguer::theme::ColorfulTheme;
use indicatif::ProgressBar;
use url::Url;

use webdoc_core::select::{Selection, UrlSelector, parse_selection};
use webdoc_shared::{Result, WebdocError};

/// Terminal multi-select prompt. Esc or `q` quits.
pub(crate) struct PromptSelector {
    spinner: ProgressBar,
}

impl PromptSelector {
    pub(crate) fn new(spinner: ProgressBar) -> Self {
        Self { spinner }
    }
}

impl UrlSelector for PromptSelector {
    fn select(&self, candidates: &[Url]) -> Result<Selection> {
        let items: Vec<&str> = candidates.iter().map(Url::as_str).collect();
        let picked = self.spinner.suspend(|| {
            MultiSelect::with_theme(&ColorfulTheme::default())
                .with_prompt(format!(
                    "Select pages to include ({} found; space toggles, enter confirms, esc quits)",
                    items.len()
                ))
                .items(&items)
                .defaults(&vec![true; items.len()])
                .interact_opt()
        });

        match picked {
            Ok(Some(indices)) => Ok(Selection::Pages(indices)),
            Ok(None) => Ok(Selection::Quit),
            Err(e) => Err(WebdocError::validation(format!("selection prompt failed: {e}"))),
        }
    }
}

/// Numbered list on stderr, answer read from stdin (`1,3`, `all`, `q`).
pub(crate) struct TextSelector;

impl UrlSelector for TextSelector {
    fn select(&self, candidates: &[Url]) -> Result<Selection> {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "\nDiscovered URLs:");
        for (i, url) in candidates.iter().enumerate() {
            let _ = writeln!(err, "{}. {url}", i + 1);
        }
        let _ = writeln!(
            err,
            "\nEnter the numbers of the URLs to include (comma-separated), 'all' for all, or 'q' to quit:"
        );
        let _ = write!(err, "> ");
        let _ = err.flush();

        let mut answer = String::new();
        let read = std::io::stdin()
            .lock()
            .read_line(&mut answer)
            .map_err(|e| WebdocError::io("<stdin>", e))?;
        if read == 0 {
            return Ok(Selection::Quit);
        }
        parse_selection(&answer, candidates.len())
    }
}
