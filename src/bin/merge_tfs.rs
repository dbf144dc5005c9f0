use clap::Parser;
use log::{info, warn};
use mtrs_view::composite::{build_from_session, CompositeError, PeriodBand, Session};
use mtrs_view::tf::ReaderRegistry;
use std::process::ExitCode;
use std::{error::Error, path::PathBuf};

#[derive(Parser, Debug)]
#[command(
    author,
    about = "Merge band-limited MT transfer functions into one period-sorted composite",
    long_about = None,
    version = env!("MTRS_VIEW_VERSION")
)]
struct Cli {
    /// Station tables (period,rho_xy,ph_xy,rho_yx,ph_yx[,tip_zx_amp,tip_zy_amp])
    #[clap(required = true, num_args = 1..)]
    inputs: Vec<PathBuf>,

    /// Period band of one station as LABEL:PMIN:PMAX (repeatable)
    #[clap(long = "band", value_parser = parse_band)]
    bands: Vec<(String, PeriodBand)>,

    /// Leave a station out of the composite (repeatable)
    #[clap(long = "exclude")]
    excluded: Vec<String>,

    /// Output CSV (default: outputs/merged_composite.csv)
    #[clap(short, long, default_value = "outputs/merged_composite.csv")]
    output: PathBuf,

    /// Save the response plot to an HTML file
    #[clap(long)]
    save_plot: Option<PathBuf>,

    /// Open the response plot in a browser
    #[clap(long, action)]
    show_plot: bool,
}

fn parse_band(value: &str) -> Result<(String, PeriodBand), String> {
    let mut parts = value.rsplitn(3, ':');
    let (pmax, pmin, label) = match (parts.next(), parts.next(), parts.next()) {
        (Some(pmax), Some(pmin), Some(label)) if !label.is_empty() => (pmax, pmin, label),
        _ => return Err(format!("expected LABEL:PMIN:PMAX, got {}", value)),
    };
    let pmin: f64 = pmin
        .parse()
        .map_err(|e| format!("invalid PMIN {:?}: {}", pmin, e))?;
    let pmax: f64 = pmax
        .parse()
        .map_err(|e| format!("invalid PMAX {:?}: {}", pmax, e))?;
    Ok((label.to_string(), PeriodBand::new(pmin, pmax)))
}

fn entrypoint() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let registry = ReaderRegistry::with_defaults();
    let (loaded, failures) = registry.read_all(&cli.inputs);
    if !failures.is_empty() {
        warn!("{} input file(s) could not be loaded", failures.len());
    }

    let mut session = Session::new();
    let mut series = Vec::with_capacity(loaded.len());
    for loaded_series in loaded {
        let original = loaded_series.label().to_string();
        let mut candidate = loaded_series;
        let mut copy = 1;
        loop {
            match session.register(&candidate) {
                Ok(()) => break,
                Err(CompositeError::DuplicateLabel(_)) => {
                    copy += 1;
                    candidate = candidate.relabeled(&format!("{}_{}", original, copy));
                }
                Err(e) => return Err(e.into()),
            }
        }
        if copy > 1 {
            warn!(
                "Station {} loaded more than once, registered as {}",
                original,
                candidate.label()
            );
        }
        series.push(candidate);
    }
    for (label, band) in &cli.bands {
        if !session.labels().contains(label) {
            warn!("Band given for unknown station {}", label);
        }
        session.set_band(label, *band);
    }
    for label in &cli.excluded {
        session.deactivate(label);
    }

    let composite = build_from_session(&series, &session);
    info!(
        "{} of {} stations active",
        session.active_labels().len(),
        session.labels().len()
    );
    composite.write_csv(&cli.output)?;
    println!("Wrote {}", cli.output.display());

    if cli.show_plot || cli.save_plot.is_some() {
        let plot = composite.make_response_plot(&series, session.active_labels());
        if let Some(save_path) = &cli.save_plot {
            plot.write_html(save_path);
            println!("Saved plot to {}", save_path.display());
        }
        if cli.show_plot {
            plot.show();
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    match entrypoint() {
        Err(e) => {
            eprintln!("Error: {:?}: {}", e, e);
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}
