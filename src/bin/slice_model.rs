use clap::{Parser, ValueEnum};
use log::info;
use mtrs_view::mesh::RectilinearMesh;
use mtrs_view::xsection::{ColorScale, CrossSectionBuilder};
use std::process::ExitCode;
use std::{error::Error, path::PathBuf};

#[derive(Parser, Debug)]
#[command(
    author,
    about = "Sample a vertical cross-section of a 3D resistivity model",
    long_about = None,
    version = env!("MTRS_VIEW_VERSION")
)]
struct Cli {
    /// Point table with header x,y,z,<field>...
    mesh_path: PathBuf,

    /// Field to sample
    #[clap(short, long)]
    field: String,

    /// First surface point of the section line
    #[clap(
        long,
        num_args = 2,
        value_names = ["X", "Y"],
        allow_negative_numbers = true,
        required = true
    )]
    p1: Vec<f64>,

    /// Second surface point of the section line
    #[clap(
        long,
        num_args = 2,
        value_names = ["X", "Y"],
        allow_negative_numbers = true,
        required = true
    )]
    p2: Vec<f64>,

    /// Top of the section
    #[clap(long, allow_negative_numbers = true)]
    z_top: f64,

    /// Bottom of the section
    #[clap(long, allow_negative_numbers = true)]
    z_bot: f64,

    /// Samples along the vertical axis
    #[clap(long, default_value = "100")]
    ni: usize,

    /// Samples along the section line
    #[clap(long, default_value = "100")]
    nj: usize,

    /// Resampling tolerance (default: half the mesh characteristic length)
    #[clap(long)]
    tolerance: Option<f64>,

    /// Number of 90 degree counter-clockwise rotations applied to the grids
    #[clap(long, default_value = "0")]
    rotate: usize,

    /// Plot against depth below the top of the section instead of elevation
    #[clap(long, action)]
    depth: bool,

    /// Colour scale of the plot
    #[clap(long, default_value = "linear")]
    scale: ScaleKind,

    /// Lower colour limit
    #[clap(long, allow_negative_numbers = true)]
    clim_low: Option<f64>,

    /// Upper colour limit
    #[clap(long, allow_negative_numbers = true)]
    clim_high: Option<f64>,

    /// Output CSV, one row per grid cell
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Save the heat map to an HTML file
    #[clap(long)]
    save_plot: Option<PathBuf>,

    /// Open the heat map in a browser
    #[clap(long, action)]
    show_plot: bool,
}

#[derive(ValueEnum, Clone, Debug, Default)]
enum ScaleKind {
    #[default]
    Linear,
    /// log10 of positive values
    Log,
}

impl From<&ScaleKind> for ColorScale {
    fn from(kind: &ScaleKind) -> Self {
        match kind {
            ScaleKind::Linear => ColorScale::Linear,
            ScaleKind::Log => ColorScale::Log,
        }
    }
}

fn entrypoint() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let mesh = RectilinearMesh::from_csv(&cli.mesh_path)?;
    let p1 = [cli.p1[0], cli.p1[1]];
    let p2 = [cli.p2[0], cli.p2[1]];

    let mut builder = CrossSectionBuilder::default();
    builder.mesh(&mesh);
    builder.p1(&p1);
    builder.p2(&p2);
    builder.z_top(&cli.z_top);
    builder.z_bot(&cli.z_bot);
    builder.field(&cli.field);
    builder.ni(&cli.ni);
    builder.nj(&cli.nj);
    if let Some(tolerance) = &cli.tolerance {
        builder.tolerance(tolerance);
    }
    let section = builder.build()?.rotated(cli.rotate);
    info!(
        "{} of {} cells valid",
        section.valid_count(),
        section.shape().0 * section.shape().1
    );

    if let Some(output_path) = &cli.output {
        section.write_csv(output_path)?;
        println!("Wrote {}", output_path.display());
    }

    if cli.show_plot || cli.save_plot.is_some() {
        let plot = section.make_heatmap_plot(
            ColorScale::from(&cli.scale),
            cli.clim_low,
            cli.clim_high,
            cli.depth,
        )?;
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
