use std::path::Path;

/// One uploaded file
#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub content: Vec<u8>,
}

impl Document {
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    pub fn kind(&self) -> DocumentKind {
        DocumentKind::from_filename(&self.filename)
    }

    /// Filename without directories or extension, used to prefix sheet names
    pub fn base_name(&self) -> String {
        let name = self.display_name();
        Path::new(&name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(name)
    }

    /// Filename with any client-supplied directory stripped
    pub fn display_name(&self) -> String {
        self.filename
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.filename)
            .to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    Xlsx,
    Xls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Spreadsheet(SpreadsheetFormat),
    Delimited,
    Pdf,
    Unsupported,
}

impl DocumentKind {
    /// Dispatch on the extension alone, case-insensitively
    pub fn from_filename(filename: &str) -> Self {
        let extension = Path::new(filename)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());

        match extension.as_deref() {
            Some("xlsx") => DocumentKind::Spreadsheet(SpreadsheetFormat::Xlsx),
            Some("xls") => DocumentKind::Spreadsheet(SpreadsheetFormat::Xls),
            Some("csv") => DocumentKind::Delimited,
            Some("pdf") => DocumentKind::Pdf,
            _ => DocumentKind::Unsupported,
        }
    }
}
