//! Live telemetry: print each accepted reading as it arrives.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use soilwatch_core::{Controller, SensorReading};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

/// One emitted line: the reading plus when it arrived.
#[derive(Debug, Serialize)]
struct ReadingLine {
    at: DateTime<Utc>,
    #[serde(flatten)]
    reading: SensorReading,
}

fn format_line(line: &ReadingLine, format: OutputFormat, color: bool) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => {
            let r = &line.reading;
            Ok(format!(
                "{}  temp {:>5.1}°C  humidity {:>5.1}%  soil {:>6.0}  pump {}",
                line.at.with_timezone(&Local).format("%H:%M:%S"),
                r.temperature,
                r.humidity,
                r.soil_moisture,
                output::pump_label(r.water_pump, color),
            ))
        }
        // Streams are newline-delimited: one compact document per reading.
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_json(line, true),
        OutputFormat::Yaml => output::render_yaml(line).map(|y| format!("---\n{}", y.trim_end())),
        OutputFormat::Plain => {
            let r = &line.reading;
            Ok(format!(
                "{}\t{}\t{}\t{}\t{}",
                line.at.to_rfc3339(),
                r.temperature,
                r.humidity,
                r.soil_moisture,
                r.water_pump
            ))
        }
    }
}

pub async fn handle(
    controller: &Controller,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(global.color);
    let store = controller.store();

    let mut readings = store.subscribe_reading();
    let mut status = store.subscribe_connection();
    let mut lost = store.subscribe_connection_error();
    // The store starts with a zeroed reading; only stream frames count.
    readings.borrow_and_update();
    lost.borrow_and_update();

    if !global.quiet {
        eprintln!("Connecting to {} ...", controller.config().url);
    }
    controller.connect().await?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut seen = 0usize;
    loop {
        tokio::select! {
            biased;
            _ = &mut ctrl_c => break,
            changed = readings.changed() => {
                if changed.is_err() {
                    break;
                }
                let reading = *readings.borrow_and_update();
                let line = ReadingLine {
                    at: store.last_reading_at().unwrap_or_else(Utc::now),
                    reading,
                };
                output::print_output(&format_line(&line, global.output, color)?, global.quiet);

                seen += 1;
                if args.count.is_some_and(|n| seen >= n) {
                    break;
                }
            }
            changed = status.changed(), if args.status => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                if !global.quiet {
                    eprintln!("status: {}", output::status_label(current, color));
                }
            }
            changed = lost.changed() => {
                if changed.is_err() {
                    break;
                }
                let message = lost.borrow_and_update().clone();
                if let Some(message) = message {
                    if !global.quiet {
                        eprintln!("{message}");
                    }
                }
            }
        }
    }

    Ok(())
}
