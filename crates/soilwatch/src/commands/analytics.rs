//! Analytics command handler.

use tabled::Tabled;

use soilwatch_core::{AnalyticsSnapshot, Controller, HistoricalPoint, Stats};

use crate::cli::{AnalyticsArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct PointRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Temp °C")]
    temperature: String,
    #[tabled(rename = "Humidity %")]
    humidity: String,
    #[tabled(rename = "Soil")]
    soil_moisture: String,
}

impl From<&HistoricalPoint> for PointRow {
    fn from(p: &HistoricalPoint) -> Self {
        Self {
            time: p.time.clone(),
            temperature: format!("{:.1}", p.temperature),
            humidity: format!("{:.1}", p.humidity),
            soil_moisture: format!("{:.0}", p.soil_moisture),
        }
    }
}

fn stats_detail(s: &Stats) -> String {
    [
        format!("Avg temperature:   {:.1}°C", s.avg_temp),
        format!("Avg humidity:      {:.1}%", s.avg_humidity),
        format!("Avg soil moisture: {:.0}", s.avg_moisture),
        format!("Pump activations:  {}", s.pump_activations),
    ]
    .join("\n")
}

fn stats_plain(s: &Stats) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        s.avg_temp, s.avg_humidity, s.avg_moisture, s.pump_activations
    )
}

fn point_plain(p: &HistoricalPoint) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        p.time, p.temperature, p.humidity, p.soil_moisture
    )
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: AnalyticsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let snapshot = controller.refresh_analytics().await?;
    let out = render(&snapshot, args.series, global.output)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn render(
    snapshot: &AnalyticsSnapshot,
    series: bool,
    format: OutputFormat,
) -> Result<String, CliError> {
    if !series {
        return output::render_single(format, &snapshot.stats, stats_detail, stats_plain);
    }

    match format {
        OutputFormat::Table => {
            let table = output::render_list(
                format,
                &snapshot.series,
                |p| PointRow::from(p),
                point_plain,
            )?;
            Ok(format!("{}\n\n{table}", stats_detail(&snapshot.stats)))
        }
        OutputFormat::Plain => {
            output::render_list(format, &snapshot.series, |p| PointRow::from(p), point_plain)
        }
        _ => output::render_single(format, snapshot, |_| String::new(), |_| String::new()),
    }
}
