//! Delimited file stream
//!
//! Parses CSV, TSV, and other character-separated files line by line with a
//! configurable delimiter and quote character. Header and footer lines can be
//! skipped, column headers can be overridden for headerless files, and rows
//! whose field count disagrees with the headers either fail the sync or are
//! tolerated, depending on `delimited_error_handling`.

use super::{FileStream, ParsedRow, StreamContext};
use crate::error::{Error, Result};
use crate::filesystem::FileInfo;
use crate::schema::{JsonType, Schema, SchemaProperty};
use crate::types::{ErrorHandling, JsonObject, JsonValue};
use async_trait::async_trait;
use tracing::warn;

/// Stream over character-separated files
pub struct DelimitedStream {
    context: StreamContext,
}

impl DelimitedStream {
    pub fn new(context: StreamContext) -> Self {
        Self { context }
    }

    /// The delimiter for one file, honoring the `detect` setting
    fn delimiter_for(&self, file_path: &str) -> Result<char> {
        let setting = &self.context.config().delimited_delimiter;
        if setting != "detect" {
            return setting.chars().next().ok_or_else(|| {
                Error::invalid_value("delimited_delimiter", "must not be empty")
            });
        }
        if file_path.contains(".csv") {
            Ok(',')
        } else if file_path.contains(".tsv") {
            Ok('\t')
        } else {
            Err(Error::config(
                "Configuration option 'delimited_delimiter' is set to 'detect' but a \
                 non-csv non-tsv file is present. Please manually specify \
                 'delimited_delimiter'.",
            ))
        }
    }

    /// Column headers for one file: the override when configured, otherwise
    /// the first line remaining after skips.
    async fn headers_for(&self, file: &FileInfo) -> Result<Vec<String>> {
        let config = self.context.config();
        if let Some(overrides) = &config.delimited_override_headers {
            return Ok(overrides.clone());
        }

        let data = self.context.read_decompressed(file).await?;
        let text = String::from_utf8_lossy(&data);
        let lines: Vec<&str> = text.lines().collect();
        let lines = apply_skips(
            &lines,
            config.delimited_header_skip,
            config.delimited_footer_skip,
        );

        match lines.first() {
            Some(line) => Ok(parse_line(
                line,
                self.delimiter_for(&file.path)?,
                config.quote_character()?,
            )),
            None => Err(Error::schema(
                "Column names could not be read because they don't exist. Try manually \
                 specifying them using 'delimited_override_headers'.",
            )),
        }
    }

    /// Pair one line's fields with the column headers. Rows with a field
    /// count mismatch fail or are padded/truncated per the error handling
    /// setting.
    fn zip_row(
        &self,
        headers: &[String],
        fields: Vec<String>,
        file_path: &str,
        line_number: usize,
    ) -> Result<JsonObject> {
        if fields.len() != headers.len() {
            match self.context.config().delimited_error_handling {
                ErrorHandling::Fail => {
                    return Err(Error::MalformedRow {
                        file: file_path.to_string(),
                        line: line_number,
                        headers: headers.len(),
                        fields: fields.len(),
                    });
                }
                ErrorHandling::Ignore => {
                    if fields.len() > headers.len() {
                        warn!(
                            "Dropped {} extra fields past the column headers at line {} of {}.",
                            fields.len() - headers.len(),
                            line_number,
                            file_path
                        );
                    }
                }
            }
        }

        let mut record = JsonObject::new();
        let mut fields = fields.into_iter();
        for header in headers {
            let value = fields.next().map_or(JsonValue::Null, JsonValue::String);
            record.insert(header.clone(), value);
        }
        Ok(record)
    }
}

#[async_trait]
impl FileStream for DelimitedStream {
    fn context(&self) -> &StreamContext {
        &self.context
    }

    /// The union of every selected file's headers, all as nullable strings
    async fn properties(&self) -> Result<Schema> {
        let mut schema = Schema::new();
        for file in self.context.selected_files().await? {
            for header in self.headers_for(&file).await? {
                schema.add_property(
                    &header,
                    SchemaProperty::of_types(vec![JsonType::Null, JsonType::String]),
                );
            }
        }
        Ok(schema)
    }

    async fn file_rows(&self, file: &FileInfo) -> Result<Vec<ParsedRow>> {
        let config = self.context.config();
        let data = self.context.read_decompressed(file).await?;
        let text = String::from_utf8_lossy(&data);
        let lines: Vec<&str> = text.lines().collect();
        let lines = apply_skips(
            &lines,
            config.delimited_header_skip,
            config.delimited_footer_skip,
        );
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let delimiter = self.delimiter_for(&file.path)?;
        let quote = config.quote_character()?;

        let (headers, data_start) = match &config.delimited_override_headers {
            Some(overrides) => (overrides.clone(), 0),
            None => (parse_line(lines[0], delimiter, quote), 1),
        };

        let mut rows = Vec::new();
        for (offset, line) in lines.iter().enumerate().skip(data_start) {
            // Physical position after skips, counting the header line
            let line_number = offset + 1;
            if line.is_empty() {
                continue;
            }

            let fields = parse_line(line, delimiter, quote);
            let record = self.zip_row(&headers, fields, &file.path, line_number)?;
            rows.push(ParsedRow {
                line_number: rows.len() + 1,
                record,
            });
        }
        Ok(rows)
    }
}

/// Drop configured header and footer lines. A file with fewer lines than the
/// combined skip contributes nothing.
fn apply_skips<'a>(lines: &'a [&'a str], header_skip: usize, footer_skip: usize) -> &'a [&'a str] {
    if header_skip.saturating_add(footer_skip) > lines.len() {
        return &[];
    }
    &lines[header_skip..lines.len() - footer_skip]
}

/// Split one line into fields, honoring quoting. A doubled quote character
/// inside a quoted field is a literal quote.
fn parse_line(line: &str, delimiter: char, quote: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == quote {
            if in_quotes {
                if chars.peek() == Some(&quote) {
                    current.push(quote);
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                in_quotes = true;
            }
        } else if c == delimiter && !in_quotes {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }

    fields.push(current);
    fields
}

// ============================================================================
// Tests
// ============================================================================
