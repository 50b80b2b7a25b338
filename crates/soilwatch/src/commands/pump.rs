//! Pump command handlers.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use soilwatch_core::{CommandAck, Controller, PublishOutcome, SensorReading};

use crate::cli::{GlobalOpts, PumpArgs, PumpCommand, PumpSetArgs, PumpWaitArgs};
use crate::error::CliError;
use crate::output;

// ── Views ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct PumpStatus {
    water_pump: bool,
    reported_at: Option<DateTime<Utc>>,
    reading: SensorReading,
}

#[derive(Debug, Serialize)]
struct PumpResult {
    requested: bool,
    message: Option<String>,
    /// Present only with `--wait`.
    confirmed_at: Option<DateTime<Utc>>,
}

fn status_detail(s: &PumpStatus, color: bool) -> String {
    [
        format!("Pump:          {}", output::pump_label(s.water_pump, color)),
        format!(
            "Reported at:   {}",
            s.reported_at.map_or_else(
                || "-".into(),
                |t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
            )
        ),
        format!("Soil moisture: {:.0}", s.reading.soil_moisture),
        format!("Temperature:   {:.1}°C", s.reading.temperature),
        format!("Humidity:      {:.1}%", s.reading.humidity),
    ]
    .join("\n")
}

fn result_detail(r: &PumpResult, color: bool) -> String {
    let target = output::pump_label(r.requested, color);
    let mut lines = vec![format!("Pump command sent: turn {target}")];
    if let Some(ref message) = r.message {
        lines.push(format!("Relay: {message}"));
    }
    if r.confirmed_at.is_some() {
        lines.push(format!("Device reports pump {target}"));
    } else {
        lines.push("The pump state will update once the device reports it.".into());
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: PumpArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(global.color);

    match args.command {
        PumpCommand::Status(PumpWaitArgs { wait_timeout }) => {
            controller.connect().await?;
            let reading = controller
                .wait_for_reading(Duration::from_secs(wait_timeout))
                .await?;

            let status = PumpStatus {
                water_pump: reading.water_pump,
                reported_at: controller.store().last_reading_at(),
                reading,
            };
            let out = output::render_single(
                global.output,
                &status,
                |s| status_detail(s, color),
                |s| s.water_pump.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PumpCommand::Toggle(set) => {
            // Toggling needs the device's own view of the pump first.
            controller.connect().await?;
            controller
                .wait_for_reading(Duration::from_secs(set.wait_timeout))
                .await?;
            let outcome = controller.toggle_pump().await?;
            finish(controller, outcome, &set, global, color).await
        }

        PumpCommand::On(set) => set_pump(controller, true, &set, global, color).await,
        PumpCommand::Off(set) => set_pump(controller, false, &set, global, color).await,
    }
}

async fn set_pump(
    controller: &Controller,
    on: bool,
    set: &PumpSetArgs,
    global: &GlobalOpts,
    color: bool,
) -> Result<(), CliError> {
    if set.wait {
        controller.connect().await?;
    }
    let outcome = controller.set_pump(on).await?;
    finish(controller, outcome, set, global, color).await
}

async fn finish(
    controller: &Controller,
    outcome: PublishOutcome,
    set: &PumpSetArgs,
    global: &GlobalOpts,
    color: bool,
) -> Result<(), CliError> {
    let PublishOutcome::Sent(CommandAck { command, message }) = outcome else {
        return Err(CliError::InFlight);
    };

    let confirmed_at = if set.wait {
        controller
            .wait_for_pump(command.water_pump, Duration::from_secs(set.wait_timeout))
            .await?;
        controller.store().last_reading_at()
    } else {
        None
    };

    let result = PumpResult {
        requested: command.water_pump,
        message,
        confirmed_at,
    };
    let out = output::render_single(
        global.output,
        &result,
        |r| result_detail(r, color),
        |r| r.requested.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
