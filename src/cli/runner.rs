//! CLI runner
//!
//! Executes the mode the flags select: about, discovery, or sync.

use crate::batch::BatchWriter;
use crate::cli::commands::{Cli, OutputFormat};
use crate::config::{self, TapConfig};
use crate::error::Result;
use crate::schema::Schema;
use crate::singer::{Catalog, CatalogEntry, Message, MessageWriter};
use crate::state::StateManager;
use crate::streams::create_stream;
use crate::transform::{flatten_record, flatten_schema, StreamMap};
use serde_json::json;
use std::io::Write;
use tracing::info;

/// Records between interleaved STATE messages
const STATE_INTERVAL: usize = 10_000;

/// Capabilities reported by about mode
const CAPABILITIES: &[&str] = &[
    "catalog",
    "state",
    "discover",
    "about",
    "stream-maps",
    "schema-flattening",
    "batch",
];

/// Executes the selected CLI mode
pub struct Runner<W: Write> {
    cli: Cli,
    writer: MessageWriter<W>,
}

impl Runner<std::io::Stdout> {
    /// A runner writing to stdout
    pub fn stdout(cli: Cli) -> Self {
        Self::new(cli, std::io::stdout())
    }
}

impl<W: Write> Runner<W> {
    /// A runner writing to the given sink
    pub fn new(cli: Cli, out: W) -> Self {
        Self {
            cli,
            writer: MessageWriter::new(out),
        }
    }

    /// Run the selected mode.
    pub async fn run(&mut self) -> Result<()> {
        if self.cli.about {
            return self.about();
        }

        let config = TapConfig::load(&self.cli.config)?;
        config.validate()?;

        if self.cli.discover {
            return self.discover(&config).await;
        }
        self.sync(&config).await
    }

    /// Consume the runner, returning the underlying sink.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    // ========================================================================
    // About
    // ========================================================================

    fn about(&mut self) -> Result<()> {
        match self.cli.format {
            OutputFormat::Json => {
                let about = json!({
                    "name": crate::NAME,
                    "version": crate::VERSION,
                    "capabilities": CAPABILITIES,
                    "settings": config::settings_schema(),
                });
                self.writer.write_document(&about)
            }
            OutputFormat::Markdown => self.writer.write_text(about_markdown().trim_end()),
        }
    }

    // ========================================================================
    // Discovery
    // ========================================================================

    async fn discover(&mut self, config: &TapConfig) -> Result<()> {
        let state = StateManager::in_memory();
        let stream = create_stream(config, &state).await?;
        let map = stream_map_for(config, stream.name())?;

        let mut entries = Vec::new();
        if !map.is_dropped() {
            let schema = map.apply_schema(&stream.schema().await?)?;
            let schema = apply_flattening(config, schema);
            let name = map.output_name(stream.name()).to_string();
            entries.push(CatalogEntry::standard(
                &name,
                schema,
                stream.context().replication_key(),
            ));
        }
        self.writer
            .write_document(&Catalog::new(entries).to_json())
    }

    // ========================================================================
    // Sync
    // ========================================================================

    async fn sync(&mut self, config: &TapConfig) -> Result<()> {
        let state = self.load_state()?;
        let stream = create_stream(config, &state).await?;
        let stream_name = stream.name().to_string();
        let map = stream_map_for(config, &stream_name)?;

        let catalog_entry = self.catalog_entry(&stream_name)?;
        let selected = catalog_entry
            .as_ref()
            .map_or(true, CatalogEntry::is_selected);
        if map.is_dropped() || !selected {
            info!(stream = stream_name.as_str(), "Stream is deselected, skipping sync");
            return self.write_state(&state).await;
        }

        let schema = match catalog_entry {
            Some(entry) => entry.schema,
            None => stream.schema().await?,
        };
        let schema = apply_flattening(config, map.apply_schema(&schema)?);
        let output_name = map.output_name(&stream_name).to_string();
        let bookmark_properties = stream
            .context()
            .replication_key()
            .map(|key| vec![key.to_string()]);
        self.writer.write_message(&Message::schema(
            output_name.clone(),
            schema,
            bookmark_properties,
        ))?;
        self.write_state(&state).await?;

        let mut batch = BatchWriter::try_new(&output_name, config)?;
        let mut records_since_state = 0usize;
        let mut total_records = 0usize;

        let files = stream.context().selected_files().await?;
        for file in &files {
            info!("Starting sync of {}.", file.path);
            let rows = stream.file_rows(file).await?;
            let file_records = rows.len();

            for row in rows {
                let mut record = row.record;
                stream
                    .context()
                    .add_additional_info(&mut record, file, row.line_number);
                let record = map.apply_record(record);
                let record = match flatten_depth(config) {
                    Some(depth) => flatten_record(record, depth)?,
                    None => record,
                };

                match &mut batch {
                    Some(writer) => {
                        if let Some(url) = writer.push(record).await? {
                            self.writer.write_message(&Message::batch(
                                output_name.clone(),
                                writer.encoding(),
                                vec![url],
                            ))?;
                        }
                    }
                    None => {
                        self.writer
                            .write_message(&Message::record(output_name.clone(), record))?;
                    }
                }

                records_since_state += 1;
                total_records += 1;
                if records_since_state >= STATE_INTERVAL {
                    self.write_state(&state).await?;
                    records_since_state = 0;
                }
            }

            if let Some(key) = stream.context().replication_key() {
                state
                    .set_bookmark(&stream_name, key, file.last_modified_iso())
                    .await;
            }
            self.write_state(&state).await?;
            records_since_state = 0;
            info!("Completed sync of {file_records} records from {}.", file.path);
        }

        if let Some(writer) = &mut batch {
            if let Some(url) = writer.finish().await? {
                self.writer.write_message(&Message::batch(
                    output_name.clone(),
                    writer.encoding(),
                    vec![url],
                ))?;
            }
        }

        self.write_state(&state).await?;
        info!(records = total_records, "Sync complete");
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn load_state(&self) -> Result<StateManager> {
        match &self.cli.state {
            Some(path) => StateManager::from_file(path),
            None => Ok(StateManager::in_memory()),
        }
    }

    /// The `--catalog` entry for the stream, when a catalog was passed.
    fn catalog_entry(&self, stream_name: &str) -> Result<Option<CatalogEntry>> {
        let Some(path) = &self.cli.catalog else {
            return Ok(None);
        };
        let catalog = Catalog::from_file(path)?;
        Ok(catalog.get_entry(stream_name).cloned())
    }

    async fn write_state(&mut self, state: &StateManager) -> Result<()> {
        let value = state.to_value().await?;
        self.writer.write_message(&Message::state(value))
    }
}

/// Parse the configured stream map for one stream.
fn stream_map_for(config: &TapConfig, stream_name: &str) -> Result<StreamMap> {
    StreamMap::for_stream(
        stream_name,
        config.stream_maps.as_ref(),
        config.stream_map_config.as_ref(),
    )
}

/// The flattening depth, when flattening is enabled.
fn flatten_depth(config: &TapConfig) -> Option<usize> {
    if !config.flattening_enabled {
        return None;
    }
    config.flattening_max_depth
}

fn apply_flattening(config: &TapConfig, schema: Schema) -> Schema {
    match flatten_depth(config) {
        Some(depth) => flatten_schema(&schema, depth),
        None => schema,
    }
}

/// The about document rendered as markdown.
fn about_markdown() -> String {
    let mut out = String::new();
    out.push_str(&format!("# `{}`\n\n", crate::NAME));
    out.push_str(&format!("Version: `{}`\n\n", crate::VERSION));
    out.push_str("## Capabilities\n\n");
    for capability in CAPABILITIES {
        out.push_str(&format!("* `{capability}`\n"));
    }
    out.push_str("\n## Settings\n\n");
    out.push_str("| Setting | Required | Default | Description |\n");
    out.push_str("|:--------|:--------:|:-------:|:------------|\n");
    for setting in config::SETTINGS {
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            setting.name,
            setting.required,
            setting.default.unwrap_or("None"),
            setting.description
        ));
    }
    out
}
