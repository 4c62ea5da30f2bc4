use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;
use huginn::types::{EstimatorInfoIn, EstimatorInfoInit, EstimatorInfoMiddle, EstimatorInfoOut};
use huginn::{Decode, StateEstimationAdapter, StateEstimationConfig};
use miette::{Context, IntoDiagnostic, Result};
use odal::Config;

/// Runs a recording through the estimators and writes the estimated pose of every cycle.
#[derive(Parser)]
#[clap(name = "replay")]
pub struct Replay {
    /// Recording made on the robot
    input: PathBuf,

    /// Receives one `x y theta timestamp` line per cycle
    output: PathBuf,

    /// Directory containing `state_estimation.toml`
    #[clap(long, default_value = "config")]
    config_dir: PathBuf,

    /// Per-robot overrides applied on top of the main config
    #[clap(long)]
    overlay_dir: Option<PathBuf>,
}

impl Replay {
    pub fn replay(self) -> Result<()> {
        let config = match &self.overlay_dir {
            Some(overlay_dir) => {
                StateEstimationConfig::load_with_optional_overlay(&self.config_dir, overlay_dir)?
            }
            None => StateEstimationConfig::load(&self.config_dir)?,
        };

        let input = File::open(&self.input)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to open `{}`", self.input.display()))?;
        let mut input = BufReader::new(input);
        let init = EstimatorInfoInit::decode(&mut input)
            .wrap_err("failed to read the init record")?;
        tracing::info!(
            player = init.player_number,
            team = init.team_number,
            "replaying recording"
        );

        let output = File::create(&self.output)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to create `{}`", self.output.display()))?;
        let mut output = BufWriter::new(output);

        let mut adapter = StateEstimationAdapter::new(init, &config);
        let cycles = replay_records(&mut adapter, &mut input, &mut output)?;
        output.flush().into_diagnostic()?;

        tracing::info!(cycles, "replay finished");
        Ok(())
    }
}

/// Reads the next `(input, timestamp)` pair, or `None` at the end of the recording.
fn read_record(mut read: impl BufRead) -> huginn::Result<Option<(EstimatorInfoIn, i64)>> {
    if read.fill_buf()?.is_empty() {
        return Ok(None);
    }

    let input = EstimatorInfoIn::decode(&mut read)?;
    let timestamp = i64::decode(&mut read)?;
    Ok(Some((input, timestamp)))
}

/// Feeds every record to `adapter` and writes the resulting pose. Returns the number of cycles.
fn replay_records(
    adapter: &mut StateEstimationAdapter,
    mut read: impl BufRead,
    mut write: impl Write,
) -> huginn::Result<usize> {
    let mut cycles = 0;

    loop {
        let (input, timestamp) = match read_record(&mut read) {
            Ok(Some(record)) => record,
            Ok(None) => break,
            Err(error) if error.is_unexpected_eof() => {
                tracing::warn!(cycles, "recording ends in the middle of a record");
                break;
            }
            Err(error) => return Err(error),
        };

        let mut middle = EstimatorInfoMiddle::default();
        let mut out = EstimatorInfoOut::default();
        adapter.tick(&input, &mut middle, &mut out);

        let pose = out.robot_pos;
        let (x, y, theta) = (pose.x(), pose.y(), pose.theta());
        writeln!(write, "{x} {y} {theta} {timestamp}")?;
        println!("(x,y,theta,timestamp): {x}, {y}, {theta}, {timestamp}");

        cycles += 1;
    }

    Ok(cycles)
}

#[cfg(test)]
mod tests {
    use huginn::Encode;
    use huginn::types::GameState;

    use super::*;

    fn recording(cycles: i64) -> Vec<u8> {
        let mut buffer = Vec::new();
        EstimatorInfoInit::default().encode(&mut buffer).unwrap();

        let input = EstimatorInfoIn {
            state: GameState::Ready,
            ..Default::default()
        };
        for cycle in 0..cycles {
            input.encode(&mut buffer).unwrap();
            (1_000_000 + cycle * 33_000).encode(&mut buffer).unwrap();
        }
        buffer
    }

    fn adapter_for(read: &mut &[u8]) -> StateEstimationAdapter {
        let init = EstimatorInfoInit::decode(read).unwrap();
        StateEstimationAdapter::new(init, &StateEstimationConfig::default())
    }

    #[test]
    fn one_line_per_cycle() {
        let buffer = recording(3);
        let mut read = buffer.as_slice();
        let mut adapter = adapter_for(&mut read);
        let mut output = Vec::new();

        let cycles = replay_records(&mut adapter, read, &mut output).unwrap();

        assert_eq!(cycles, 3);
        let output = String::from_utf8(output).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 3);

        // Player 1 starts on the sideline, facing into the field.
        let fields: Vec<f32> = lines[0]
            .split(' ')
            .map(|field| field.parse().unwrap())
            .collect();
        assert!((fields[0] + 3500.0).abs() < 1e-3);
        assert!((fields[1] - 3000.0).abs() < 1e-3);
        assert!((fields[2] + std::f32::consts::FRAC_PI_2).abs() < 1e-4);
        assert!(lines[2].ends_with(" 1066000"));
    }

    #[test]
    fn truncated_record_ends_the_replay() {
        let mut buffer = recording(2);
        let mut partial = Vec::new();
        EstimatorInfoIn::default().encode(&mut partial).unwrap();
        buffer.extend_from_slice(&partial[..partial.len() / 2]);

        let mut read = buffer.as_slice();
        let mut adapter = adapter_for(&mut read);
        let mut output = Vec::new();

        let cycles = replay_records(&mut adapter, read, &mut output).unwrap();

        assert_eq!(cycles, 2);
    }
}
