use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::Parser;
use log::{error, info};

use uwalk_core::prelude::*;

/// Convert a GTFS feed and an OSM extract into a walking graph and
/// trip-event structures for ULTRA / HL-UW preprocessing.
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Directory containing the GTFS feed (stops.txt, trips.txt, stop_times.txt)
    gtfs_folder: PathBuf,
    /// OSM extract of the area, in pbf format
    osm_file: PathBuf,
    /// GeoJSON polygon restricting the OSM pass, or NONE to disable filtering
    polygon_file: String,
    /// Walking speed, in km/h
    walkspeed_km_per_hour: f64,
    /// Output directory for gtfs.json and walking_graph.json
    output_dir: PathBuf,
    /// Output directory for the HL-UW flat files
    hluw_output_dir: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err)
            if matches!(
                err.kind(),
                ErrorKind::MissingRequiredArgument
                    | ErrorKind::DisplayHelp
                    | ErrorKind::DisplayVersion
            ) =>
        {
            // missing arguments print the usage and exit without error
            let _ = err.print();
            std::process::exit(0);
        }
        Err(err) => err.exit(),
    };

    if let Err(err) = run(&args) {
        error!("{err}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), uwalk_core::Error> {
    info!("GTFS FOLDER      = {}", args.gtfs_folder.display());
    info!("OSMFILE          = {}", args.osm_file.display());
    info!("POLYGONFILE      = {}", args.polygon_file);
    info!("WALKSPEED KM/H   = {}", args.walkspeed_km_per_hour);
    info!("OUTPUT_DIR       = {}", args.output_dir.display());
    info!("HL-UW OUTPUT_DIR = {}", args.hluw_output_dir.display());

    fs::create_dir_all(&args.output_dir)?;
    fs::create_dir_all(&args.hluw_output_dir)?;

    let gtfs_data = gtfs_parsed_data_from_feed(&args.gtfs_folder)?;

    info!("Dumping GTFS as json");
    let out_gtfs = BufWriter::new(File::create(args.output_dir.join("gtfs.json"))?);
    serialize_gtfs(&gtfs_data, out_gtfs)?;

    info!("Dumping HL-UW stoptimes");
    let out_stoptimes = BufWriter::new(File::create(args.hluw_output_dir.join("stoptimes.txt"))?);
    serialize_gtfs_hluw(&gtfs_data, out_stoptimes)?;

    check_gtfs_serialization_idempotent(&gtfs_data)?;

    let stops = gtfs_data.walking_stops();
    info!("Getting polygon");
    let polygon = ClipPolygon::load(&args.polygon_file)?;

    info!("Building walking-graph");
    let graph = build_walking_graph(&args.osm_file, polygon, &stops, args.walkspeed_km_per_hour)?;

    info!("Dumping WalkingGraph for HL-UW");
    serialize_walking_graph_hluw(&graph, &args.hluw_output_dir)?;

    info!("Dumping WalkingGraph geojson");
    let out_graph = BufWriter::new(File::create(args.output_dir.join("walking_graph.json"))?);
    serialize_walking_graph(&graph, out_graph)?;

    check_graph_serialization_idempotent(&graph)?;

    info!("All is OK");
    Ok(())
}
