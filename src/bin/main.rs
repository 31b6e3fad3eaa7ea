//! Level Converter CLI
//!
//! Convert level geometry between the Basic and Chunk formats.

use clap::{Parser, Subcommand, ValueEnum};
use level_converter::chunk::codec;
use level_converter::{
    load_level, Attach, Converter, ConverterConfig, GeoEntry, LevelScene, UvPrecision,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "level-converter")]
#[command(author, version, about = "Convert level geometry between Basic and Chunk formats", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a level to the other format
    Convert {
        /// Input level file (prompted for when omitted)
        input: Option<PathBuf>,

        /// Output file path (defaults to the input with the target format's extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Precision of UVs written into chunk strips
        #[arg(long, value_enum, default_value = "normal")]
        uv_precision: UvPrecisionArg,

        /// Convert every entry's attach separately, even when names repeat
        #[arg(long)]
        no_share: bool,

        /// Recompute bounding spheres from the converted vertices
        #[arg(long)]
        recompute_bounds: bool,
    },

    /// Show information about a level
    Info {
        /// Level file
        input: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum UvPrecisionArg {
    /// UVs in 1/255 steps
    Normal,
    /// UVs in 1/1023 steps
    High,
}

impl From<UvPrecisionArg> for UvPrecision {
    fn from(arg: UvPrecisionArg) -> Self {
        match arg {
            UvPrecisionArg::Normal => UvPrecision::Normal,
            UvPrecisionArg::High => UvPrecision::High,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            output,
            uv_precision,
            no_share,
            recompute_bounds,
        } => {
            let input = match input {
                Some(path) => path,
                None => prompt_for_file()?,
            };
            let config = ConverterConfig::default()
                .with_uv_precision(uv_precision.into())
                .with_shared_attaches(!no_share)
                .with_recompute_bounds(recompute_bounds);
            convert_file(&input, output, config)?;
        }
        Commands::Info { input } => {
            show_level_info(&input)?;
        }
    }

    Ok(())
}

fn prompt_for_file() -> Result<PathBuf, Box<dyn std::error::Error>> {
    print!("Enter filename: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let name = line.trim().trim_matches('"');
    if name.is_empty() {
        return Err("no input file given".into());
    }
    Ok(PathBuf::from(name))
}

fn convert_file(
    input_path: &Path,
    output_path: Option<PathBuf>,
    config: ConverterConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading level from {:?}...", input_path);
    let level = load_level(input_path)?;
    println!(
        "  Found {} geometry entries ({:?} format)",
        level.geometry.len(),
        level.format
    );

    println!("Converting with config:");
    println!("  - UV precision: {:?}", config.uv_precision);
    println!("  - Share attaches: {}", config.share_converted_attaches);
    println!("  - Recompute bounds: {}", config.recompute_bounds);

    let converter = Converter::with_config(config);
    let converted = level.convert(&converter)?;

    let output_path =
        output_path.unwrap_or_else(|| converted.format.output_path(input_path));
    converted.save(&output_path)?;
    println!(
        "Exported {} entries ({:?} format) to {:?}",
        converted.geometry.len(),
        converted.format,
        output_path
    );

    Ok(())
}

fn show_level_info(input_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading level from {:?}...", input_path);
    let level = load_level(input_path)?;

    println!("\nLevel Info:");
    println!("  Format: {:?}", level.format);
    println!("  Geometry entries: {}", level.geometry.len());
    println!("  Animations: {}", level.animations.len());

    for (i, entry) in level.geometry.iter().enumerate() {
        print_entry(i, entry)?;
    }

    print_totals(&level);
    Ok(())
}

fn print_entry(index: usize, entry: &GeoEntry) -> Result<(), Box<dyn std::error::Error>> {
    let Some(model) = &entry.model else {
        println!("  [{}] flags {:#010x}, no model", index, entry.surface_flags.bits());
        return Ok(());
    };

    let origin = model.transform.matrix().transform_point3(glam::Vec3::ZERO);
    println!(
        "  [{}] {} flags {:#010x} at ({:.2}, {:.2}, {:.2})",
        index,
        model.name,
        entry.surface_flags.bits(),
        origin.x,
        origin.y,
        origin.z
    );

    match &model.attach {
        Some(Attach::Basic(basic)) => println!(
            "      basic '{}': {} vertices, {} meshes, {} triangles",
            basic.name,
            basic.vertices.len(),
            basic.meshes.len(),
            basic.triangle_count()
        ),
        Some(Attach::Chunk(chunk)) => {
            let vertex_bytes = codec::write_vertex_chunks(&chunk.vertex)?.len();
            let poly_bytes = codec::write_poly_chunks(&chunk.poly)?.len();
            println!(
                "      chunk '{}': {} vertices, {} poly chunks, {} triangles ({} + {} bytes)",
                chunk.name,
                chunk.vertex_count(),
                chunk.poly.len(),
                chunk.triangle_count(),
                vertex_bytes,
                poly_bytes
            );
        }
        None => println!("      no attach"),
    }
    Ok(())
}

fn print_totals(level: &LevelScene) {
    let (basic, chunk) = level
        .geometry
        .iter()
        .filter_map(GeoEntry::attach)
        .fold((0, 0), |(basic, chunk), attach| match attach {
            Attach::Basic(_) => (basic + 1, chunk),
            Attach::Chunk(_) => (basic, chunk + 1),
        });
    println!("\n  Basic attaches: {}", basic);
    println!("  Chunk attaches: {}", chunk);
}
