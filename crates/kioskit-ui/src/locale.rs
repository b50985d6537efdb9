use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocaleError {
    #[error("no locales configured")]
    Empty,

    #[error("unsupported locale '{0}'")]
    Unsupported(String),
}

/// Active UI language. Starts on the first configured locale.
#[derive(Debug, Clone)]
pub struct LocaleState {
    available: Vec<String>,
    current: usize,
}

impl LocaleState {
    /// # Errors
    /// Returns [`LocaleError::Empty`] when `locales` is empty.
    pub fn new<I, S>(locales: I) -> Result<Self, LocaleError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let available: Vec<String> = locales.into_iter().map(Into::into).collect();
        if available.is_empty() {
            return Err(LocaleError::Empty);
        }
        Ok(Self {
            available,
            current: 0,
        })
    }

    #[must_use]
    pub fn current(&self) -> &str {
        &self.available[self.current]
    }

    #[must_use]
    pub fn available(&self) -> &[String] {
        &self.available
    }

    /// # Errors
    /// Returns [`LocaleError::Unsupported`] for locales outside the configured list.
    pub fn change_locale(&mut self, locale: &str) -> Result<(), LocaleError> {
        let index = self
            .available
            .iter()
            .position(|available| available == locale)
            .ok_or_else(|| LocaleError::Unsupported(locale.to_string()))?;
        self.current = index;
        Ok(())
    }
}
