use thiserror::Error;

/// One search candidate, just enough to label an inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub year: Option<i32>,
}

impl SearchHit {
    /// Button label: `Title (year)`, year dropped when unknown.
    pub fn one_line(&self) -> String {
        match self.year {
            Some(y) => format!("{} ({})", self.title, y),
            None => self.title.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected payload: {0}")]
    Json(#[from] serde_json::Error),
}
