use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};

use corsascore_core::report::{render_summary, render_table, write_csv};
use corsascore_core::strava::{StravaClient, StravaConfig, StravaSession, DEFAULT_REDIRECT_URI};
use corsascore_core::{
    load_profile, run_batch, save_profile, telemetry, AthleteParameters, AthleteProfile, BatchReport,
    SessionInput,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "SCORE 2.0 aerobic efficiency for running sessions", long_about = None)]
struct Cli {
    /// Athlete profile (JSON). Defaults are used if the file does not exist.
    #[arg(long, global = true, default_value = "athlete.json")]
    profile: PathBuf,

    #[command(flatten)]
    overrides: ParamOverrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ParamOverrides {
    /// Body weight (kg)
    #[arg(long, global = true)]
    weight: Option<f64>,
    /// Resting heart rate (bpm)
    #[arg(long, global = true)]
    hr_rest: Option<u32>,
    /// Maximum heart rate (bpm)
    #[arg(long, global = true)]
    hr_max: Option<u32>,
    /// Offset subtracted from the efficiency ratio
    #[arg(long, global = true)]
    base_offset: Option<f64>,
}

impl ParamOverrides {
    fn apply(&self, mut p: AthleteParameters) -> AthleteParameters {
        if let Some(w) = self.weight { p.weight_kg = w; }
        if let Some(r) = self.hr_rest { p.hr_rest = r; }
        if let Some(m) = self.hr_max { p.hr_max = m; }
        if let Some(o) = self.base_offset { p.base_offset = o; }
        p
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score device-exported JSON logs
    Score {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Print the Strava authorization URL
    StravaAuthUrl {
        #[command(flatten)]
        creds: StravaCreds,
    },
    /// Fetch recent Strava runs and score them
    Strava {
        /// Authorization code from the redirect
        #[arg(long)]
        code: Option<String>,
        /// Existing access token
        #[arg(long, env = "STRAVA_ACCESS_TOKEN")]
        token: Option<String>,
        /// How many recent activities to look at
        #[arg(long, default_value_t = 50)]
        limit: usize,
        #[command(flatten)]
        creds: StravaCreds,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Manage the athlete profile
    #[command(subcommand)]
    Profile(ProfileCommand),
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    /// Write the current parameters (defaults + overrides) to the profile file
    Init,
    /// Print the effective parameters
    Show,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Write result rows as CSV (`-` for stdout)
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Print Prometheus counters after the run
    #[arg(long)]
    metrics: bool,
}

#[derive(Args, Debug)]
struct StravaCreds {
    #[arg(long, env = "STRAVA_CLIENT_ID")]
    client_id: Option<String>,
    #[arg(long, env = "STRAVA_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,
    #[arg(long, env = "STRAVA_REDIRECT_URI")]
    redirect_uri: Option<String>,
}

impl StravaCreds {
    /// Flags/env first, then the profile's `strava` block.
    fn resolve(&self, profile: &AthleteProfile) -> Result<StravaConfig> {
        let stored = profile.strava.clone();
        let client_id = self
            .client_id
            .clone()
            .or_else(|| stored.as_ref().map(|s| s.client_id.clone()));
        let client_secret = self
            .client_secret
            .clone()
            .or_else(|| stored.as_ref().map(|s| s.client_secret.clone()));
        let redirect_uri = self
            .redirect_uri
            .clone()
            .or_else(|| stored.as_ref().map(|s| s.redirect_uri.clone()))
            .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());

        match (client_id, client_secret) {
            (Some(client_id), Some(client_secret)) => Ok(StravaConfig { client_id, client_secret, redirect_uri }),
            _ => bail!("Strava integration not configured: set STRAVA_CLIENT_ID/STRAVA_CLIENT_SECRET or a `strava` block in the profile"),
        }
    }
}

fn read_inputs(files: &[PathBuf]) -> (Vec<SessionInput>, BatchReport) {
    let mut inputs = Vec::with_capacity(files.len());
    let mut unread = BatchReport::default();
    for path in files {
        let label = file_label(path);
        match fs::read_to_string(path) {
            Ok(json) => inputs.push(SessionInput::DeviceLog { label, json }),
            Err(e) => unread.record_failure(label, e),
        }
    }
    (inputs, unread)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn fetch_strava_inputs(client: &StravaClient, session: &StravaSession, limit: usize) -> Result<(Vec<SessionInput>, BatchReport)> {
    let runs = client
        .list_run_activities(session, limit)
        .context("listing Strava activities")?;
    if runs.is_empty() {
        warn!("no run activities among the last {limit}");
    }

    let mut inputs = Vec::with_capacity(runs.len());
    let mut unfetched = BatchReport::default();
    for activity in runs {
        match client.activity_streams(session, activity.id) {
            Ok(streams) => inputs.push(SessionInput::Activity { activity, streams }),
            Err(e) => unfetched.record_failure(activity.name.clone(), e),
        }
    }
    Ok((inputs, unfetched))
}

fn finish(mut report: BatchReport, extra: BatchReport, out: &OutputArgs) -> Result<()> {
    report.failed.extend(extra.failed);

    // stdout carries nothing but CSV when it is the CSV target
    let csv_to_stdout = out.csv.as_deref().is_some_and(|p| p.as_os_str() == "-");
    let mut text: Box<dyn Write> = if csv_to_stdout { Box::new(io::stderr()) } else { Box::new(io::stdout()) };

    write!(text, "{}", render_table(&report))?;
    match report.summary() {
        Some(summary) => writeln!(text, "\n{}", render_summary(&summary))?,
        None => writeln!(text, "\nNo session could be scored.")?,
    }

    if let Some(path) = &out.csv {
        if csv_to_stdout {
            write_csv(&report.rows, io::stdout()).context("writing CSV to stdout")?;
        } else {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            write_csv(&report.rows, file).with_context(|| format!("writing {}", path.display()))?;
            info!("wrote {} rows to {}", report.rows.len(), path.display());
        }
    }

    if out.metrics {
        if let Some(m) = telemetry::global() {
            write!(text, "{}", m.render())?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut profile = load_profile(&cli.profile)
        .with_context(|| format!("loading profile {}", cli.profile.display()))?;
    profile.params = cli.overrides.apply(profile.params);
    if let Err(msg) = profile.params.validate() {
        bail!("invalid athlete parameters: {msg}");
    }
    let params = profile.params;

    match &cli.command {
        Command::Score { files, out } => {
            let (inputs, unread) = read_inputs(files);
            let report = run_batch(&inputs, &params);
            finish(report, unread, out)
        }
        Command::StravaAuthUrl { creds } => {
            let client = StravaClient::new(creds.resolve(&profile)?);
            println!("{}", client.authorize_url());
            Ok(())
        }
        Command::Strava { code, token, limit, creds, out } => {
            let client = StravaClient::new(creds.resolve(&profile)?);
            let session = match (code, token) {
                (Some(code), _) => client.exchange_code(code).context("Strava token exchange")?,
                (None, Some(token)) => StravaSession::from_token(token.clone()),
                (None, None) => bail!("pass --code (from the authorization redirect) or --token"),
            };
            let (inputs, unfetched) = fetch_strava_inputs(&client, &session, *limit)?;
            let report = run_batch(&inputs, &params);
            finish(report, unfetched, out)
        }
        Command::Profile(ProfileCommand::Init) => {
            save_profile(&profile, &cli.profile)
                .with_context(|| format!("saving profile {}", cli.profile.display()))?;
            println!("Profile written to {}", cli.profile.display());
            Ok(())
        }
        Command::Profile(ProfileCommand::Show) => {
            println!("{}", serde_json::to_string_pretty(&profile.params)?);
            Ok(())
        }
    }
}
