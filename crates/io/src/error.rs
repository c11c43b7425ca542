use std::fmt;

/// Reader backends, in the order they are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Format sniffed by calamine (xlsx, xlsm, xlsb, xls, ods).
    Auto,
    /// BIFF `.xls` (legacy binary).
    Xls,
    /// OOXML `.xlsx` (modern zip).
    Xlsx,
    /// HTML document containing a `<table>`.
    Html,
    /// Delimited text.
    Csv,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "default",
            Self::Xls => "legacy-binary",
            Self::Xlsx => "modern-zip",
            Self::Html => "html-table",
            Self::Csv => "delimited-text",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendFailure {
    pub backend: Backend,
    pub message: String,
}

/// Every backend failed to produce a sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadError {
    pub attempts: Vec<BackendFailure>,
}

impl ReadError {
    pub fn tried(&self) -> Vec<Backend> {
        self.attempts.iter().map(|a| a.backend).collect()
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not read workbook")?;
        for (i, attempt) in self.attempts.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{} ({})", attempt.backend, attempt.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ReadError {}
